//! Session tuning, loadable from TOML.
//!
//! ```toml
//! timer_tick_ms = 10
//! default_destination = "/dashboard"
//! due_limit = 50
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::Destination;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Timer display cadence in milliseconds.
    pub timer_tick_ms: u64,
    /// Where control returns when the caller gave no destination.
    pub default_destination: String,
    /// Maximum queue length when building a session from due items.
    pub due_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timer_tick_ms: 10,
            default_destination: "/".to_string(),
            due_limit: 50,
        }
    }
}

impl SessionConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read session config {}: {e}", path.display()))
        })?;
        let config: SessionConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("bad session config {}: {e}", path.display()))
        })?;
        config.validate()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SessionConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.timer_tick_ms == 0 {
            return Err(Error::Config("timer_tick_ms must be positive".to_string()));
        }
        Ok(self)
    }

    pub fn timer_tick(&self) -> Duration {
        Duration::from_millis(self.timer_tick_ms)
    }

    pub fn default_destination(&self) -> Destination {
        Destination::new(&self.default_destination)
    }
}
