//! Session orchestration: queue, per-item phases, timing, submission.

pub mod launch;
pub mod machine;
pub mod phase;
pub mod preview;
pub mod stats;

pub use launch::{Launch, LaunchRequest, ReviewQueue};
pub use machine::{StudySession, SubmitOutcome, Update};
pub use phase::Phase;
pub use preview::GradePreview;
pub use stats::{Progress, SessionStats};
