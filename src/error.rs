//! Error types for mastery-session.

use thiserror::Error;

use crate::session::Phase;

#[derive(Debug, Error)]
pub enum Error {
    #[error("item not found: {0}")]
    NotFound(String),

    #[error("invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("{action} is not available while {phase}")]
    InvalidAction { action: &'static str, phase: Phase },

    #[error("session has already ended")]
    SessionEnded,

    #[error("grade must be between 1 and 4, got {0}")]
    InvalidGrade(u8),

    #[error("star must be between 1 and 5, got {0}")]
    InvalidStar(u8),

    #[error("invalid review payload: {0}")]
    InvalidPayload(String),

    #[error("invalid scheduler state: {0}")]
    InvalidSchedulerState(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
