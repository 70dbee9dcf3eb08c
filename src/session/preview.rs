//! Interval preview slots for the grade buttons.

use crate::model::{Grade, IntervalMap};

/// Shown while the preview request is in flight.
pub const LOADING_LABEL: &str = "...";
/// Shown when the preview request failed.
pub const ERROR_LABEL: &str = "?";
/// Shown when the backend returned no interval for a grade.
pub const MISSING_LABEL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GradePreview {
    #[default]
    Loading,
    Ready(IntervalMap),
    Failed,
}

impl GradePreview {
    pub fn label(&self, grade: Grade) -> &str {
        match self {
            GradePreview::Loading => LOADING_LABEL,
            GradePreview::Failed => ERROR_LABEL,
            GradePreview::Ready(intervals) => intervals
                .get(&grade)
                .map(String::as_str)
                .unwrap_or(MISSING_LABEL),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, GradePreview::Ready(_))
    }
}
