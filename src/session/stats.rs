//! Session progress and running tally.

use serde::{Deserialize, Serialize};

use crate::model::Grade;

/// Reviews committed during this session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub reviewed: u32,
    /// Reviews graded better than `Again`.
    pub correct: u32,
}

impl SessionStats {
    pub fn record(&mut self, grade: Grade) {
        self.reviewed += 1;
        if grade > Grade::Again {
            self.correct += 1;
        }
    }
}

/// 1-based position within the queue, for the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn percentage(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.current as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.current, self.total)
    }
}
