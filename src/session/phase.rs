//! Lifecycle phase of the current session position.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Item requested, not yet fetched.
    Loading,
    /// Item shown, timer running, user working on an answer.
    Answering,
    /// Timer frozen, user choosing a grade.
    Grading,
    /// Last item committed. Terminal.
    Completed,
    /// User left the session. Terminal.
    Exited,
}

impl Phase {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, to),
            (Loading, Answering)
                | (Answering, Grading)      // reveal
                | (Grading, Answering)      // back
                | (Grading, Loading)        // committed, next item
                | (Grading, Completed)      // committed, last item
                | (Loading, Exited)
                | (Answering, Exited)
                | (Grading, Exited)
        )
    }

    /// Is this a terminal phase?
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Exited)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Loading => "loading",
            Phase::Answering => "answering",
            Phase::Grading => "grading",
            Phase::Completed => "completed",
            Phase::Exited => "exited",
        };
        write!(f, "{s}")
    }
}
