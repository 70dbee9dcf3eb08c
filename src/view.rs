//! Session view contract.
//!
//! A [`SessionView`] is a read-only snapshot of everything a front end needs
//! to draw the current phase. Front ends never touch session fields; they
//! turn input into an [`Action`] and hand it to [`StudySession::dispatch`].

use std::time::Duration;

use crate::client::SchedulerBackend;
use crate::error::Result;
use crate::model::{Destination, Grade, ReviewItem};
use crate::rating::{DifficultyRating, STARS, StarFill};
use crate::session::{Phase, Progress, StudySession, SubmitOutcome};
use crate::timer::format_elapsed;

/// Everything a user can do to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Reveal,
    Back,
    SelectGrade(Grade),
    ClickStar(u8),
    SetDifficulty(DifficultyRating),
    SetAnswer(String),
    SetErrorLog(String),
    Submit,
    Reload,
    Exit,
}

/// What a dispatched action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Applied,
    Submitted(SubmitOutcome),
    Exited(Destination),
}

/// Keys with a binding in the session view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Backspace,
    Escape,
}

/// One grade button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeSlot {
    pub grade: Grade,
    pub label: &'static str,
    /// Interval preview, or a loading / error placeholder.
    pub interval: String,
    pub selected: bool,
    pub shortcut: char,
}

#[derive(Debug, Clone)]
pub struct SessionView<'a> {
    pub phase: Phase,
    pub progress: Progress,
    pub elapsed: Duration,
    pub item: Option<&'a ReviewItem>,
    pub answer: &'a str,
    pub grades: Vec<GradeSlot>,
    pub pending_grade: Option<Grade>,
    pub submit_enabled: bool,
    pub error_log_visible: bool,
    pub error_log: &'a str,
    pub difficulty: DifficultyRating,
    pub stars: [StarFill; STARS as usize],
    pub load_error: Option<&'a str>,
    pub submit_error: Option<&'a str>,
}

impl SessionView<'_> {
    /// Timer as `MM:SS.CC`.
    pub fn timer_label(&self) -> String {
        format_elapsed(self.elapsed)
    }

    /// Scheduler state badge, e.g. `LEARNING · Step 2`.
    pub fn badge(&self) -> Option<String> {
        let item = self.item?;
        let state = item.scheduler_state.to_string().to_uppercase();
        Some(match item.learning_step() {
            Some(step) => format!("{state} · Step {}", step + 1),
            None => state,
        })
    }

    /// Grade shortcuts are live only while grading.
    pub fn grades_enabled(&self) -> bool {
        self.phase == Phase::Grading
    }
}

/// Map a key press to an action for the current view, if it has a binding.
pub fn key_action(view: &SessionView<'_>, key: Key) -> Option<Action> {
    match (view.phase, key) {
        (phase, Key::Escape) if !phase.is_terminal() => Some(Action::Exit),
        (Phase::Answering, Key::Space) => Some(Action::Reveal),
        (Phase::Grading, Key::Char(c @ '1'..='4')) => {
            let digit = c.to_digit(10)? as u8;
            Grade::try_from(digit).ok().map(Action::SelectGrade)
        }
        (Phase::Grading, Key::Enter) if view.submit_enabled => Some(Action::Submit),
        (Phase::Grading, Key::Backspace) => Some(Action::Back),
        (Phase::Loading, Key::Char('r')) if view.load_error.is_some() => Some(Action::Reload),
        _ => None,
    }
}

impl<B: SchedulerBackend> StudySession<B> {
    /// Snapshot for rendering.
    pub fn view(&self) -> SessionView<'_> {
        let pending = self.pending_grade();
        let grades = Grade::ALL
            .into_iter()
            .map(|grade| GradeSlot {
                grade,
                label: grade.label(),
                interval: self.preview().label(grade).to_string(),
                selected: pending == Some(grade),
                shortcut: char::from(b'0' + grade.value()),
            })
            .collect();

        SessionView {
            phase: self.phase(),
            progress: self.progress(),
            elapsed: self.elapsed(),
            item: self.item(),
            answer: self.answer(),
            grades,
            pending_grade: pending,
            submit_enabled: self.phase() == Phase::Grading && pending.is_some(),
            error_log_visible: pending.is_some_and(Grade::is_failure),
            error_log: self.error_log(),
            difficulty: self.difficulty(),
            stars: self.difficulty().stars(),
            load_error: self.load_error(),
            submit_error: self.submit_error(),
        }
    }

    /// Apply one user action.
    pub async fn dispatch(&mut self, action: Action) -> Result<Dispatched> {
        match action {
            Action::Reveal => self.reveal()?,
            Action::Back => self.back()?,
            Action::SelectGrade(grade) => self.select_grade(grade)?,
            Action::ClickStar(star) => {
                self.click_star(star)?;
            }
            Action::SetDifficulty(rating) => self.set_difficulty(rating)?,
            Action::SetAnswer(text) => self.set_answer(text)?,
            Action::SetErrorLog(text) => self.set_error_log(text)?,
            Action::Reload => self.reload()?,
            Action::Submit => return Ok(Dispatched::Submitted(self.submit().await?)),
            Action::Exit => return Ok(Dispatched::Exited(self.exit())),
        }
        Ok(Dispatched::Applied)
    }
}
