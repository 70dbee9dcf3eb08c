//! Core data model.
//!
//! A review item is a unit of knowledge content (problem or theory) that the
//! external scheduler tracks. The session only reads items and previews, and
//! writes graded reviews; scheduling state is owned by the backend.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rating::DifficultyRating;

// ---------------------------------------------------------------------------
// Item identity
// ---------------------------------------------------------------------------

/// Opaque identifier of a review item. Usually a UUID, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First segment of the id, for compact display.
    pub fn short(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Grade
// ---------------------------------------------------------------------------

/// Recall quality reported by the user, consumed by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Grade {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::Again => "Again",
            Grade::Hard => "Hard",
            Grade::Good => "Good",
            Grade::Easy => "Easy",
        }
    }

    /// `Again` and `Hard` are failures; only they carry an error log.
    pub fn is_failure(self) -> bool {
        matches!(self, Grade::Again | Grade::Hard)
    }
}

impl TryFrom<u8> for Grade {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Grade::Again),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 => Ok(Grade::Easy),
            other => Err(Error::InvalidGrade(other)),
        }
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.value()
    }
}

impl std::str::FromStr for Grade {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::Other(format!("not a grade: {s:?}")))?;
        Grade::try_from(value)
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Scheduler state
// ---------------------------------------------------------------------------

/// Scheduler state of an item, owned by the external scheduling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "StateRepr")]
pub enum SchedulerState {
    New,
    Learning,
    Review,
    Relearning,
}

/// The backend reports state either as a numeric code or as a name.
#[derive(Deserialize)]
#[serde(untagged)]
enum StateRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<StateRepr> for SchedulerState {
    type Error = Error;

    fn try_from(repr: StateRepr) -> Result<Self> {
        match repr {
            StateRepr::Code(0) => Ok(SchedulerState::New),
            StateRepr::Code(1) => Ok(SchedulerState::Learning),
            StateRepr::Code(2) => Ok(SchedulerState::Review),
            StateRepr::Code(3) => Ok(SchedulerState::Relearning),
            StateRepr::Code(n) => Err(Error::InvalidSchedulerState(n.to_string())),
            StateRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "new" => Ok(SchedulerState::New),
                "learning" => Ok(SchedulerState::Learning),
                "review" => Ok(SchedulerState::Review),
                "relearning" => Ok(SchedulerState::Relearning),
                _ => Err(Error::InvalidSchedulerState(name)),
            },
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulerState::New => "new",
            SchedulerState::Learning => "learning",
            SchedulerState::Review => "review",
            SchedulerState::Relearning => "relearning",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Review item
// ---------------------------------------------------------------------------

/// An item as fetched from the scheduler, with its current card state.
///
/// Read-only to the session. The numeric scheduling fields are carried for
/// display only and are never recomputed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Node type in the knowledge base (e.g. "problem", "theory").
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(rename = "card_state")]
    pub scheduler_state: SchedulerState,
    /// Learning step counter, 0-based. Only meaningful while learning.
    #[serde(default)]
    pub current_step: Option<u32>,
    #[serde(default)]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stability: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub lapses: Option<u32>,
}

impl ReviewItem {
    /// Learning step to display, if the item is in `learning`.
    pub fn learning_step(&self) -> Option<u32> {
        match self.scheduler_state {
            SchedulerState::Learning => Some(self.current_step.unwrap_or(0)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Interval preview
// ---------------------------------------------------------------------------

/// Human-readable next interval per grade, e.g. `Good -> "3d"`.
pub type IntervalMap = BTreeMap<Grade, String>;

/// Convert the backend's string-keyed preview map into an [`IntervalMap`].
pub fn interval_map_from_wire(wire: BTreeMap<String, String>) -> Result<IntervalMap> {
    wire.into_iter()
        .map(|(key, label)| Ok((key.parse::<Grade>()?, label)))
        .collect()
}

// ---------------------------------------------------------------------------
// Review submission
// ---------------------------------------------------------------------------

/// Free-form metadata sent with a review, packed into the answer field.
///
/// Serializes exactly as
/// `{ "text", "errorLog", "userDifficultyRating", "submittedAt" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPayload {
    pub text: String,
    pub error_log: String,
    pub user_difficulty_rating: u8,
    #[serde(with = "iso_millis")]
    pub submitted_at: DateTime<Utc>,
}

impl ReviewPayload {
    pub fn validate(&self) -> Result<()> {
        if self.user_difficulty_rating > DifficultyRating::MAX {
            return Err(Error::InvalidPayload(format!(
                "userDifficultyRating {} exceeds {}",
                self.user_difficulty_rating,
                DifficultyRating::MAX
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A graded review, ready for the scheduler's commit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub item_id: ItemId,
    pub grade: Grade,
    pub elapsed_ms: u64,
    pub payload: ReviewPayload,
}

impl ReviewSubmission {
    /// Build a submission, validating the payload at the boundary.
    pub fn new(
        item_id: ItemId,
        grade: Grade,
        elapsed_ms: u64,
        payload: ReviewPayload,
    ) -> Result<Self> {
        payload.validate()?;
        Ok(Self {
            item_id,
            grade,
            elapsed_ms,
            payload,
        })
    }

    /// Retry-stable key: the same submission always yields the same key.
    pub fn idempotency_key(&self) -> String {
        format!(
            "{}:{}",
            self.item_id,
            self.payload
                .submitted_at
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    /// True if `other` carries the same user inputs, ignoring the timestamp.
    pub fn same_inputs(&self, other: &ReviewSubmission) -> bool {
        self.item_id == other.item_id
            && self.grade == other.grade
            && self.elapsed_ms == other.elapsed_ms
            && self.payload.text == other.payload.text
            && self.payload.error_log == other.payload.error_log
            && self.payload.user_difficulty_rating == other.payload.user_difficulty_rating
    }
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Where control returns when the session ends or is exited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(String);

impl Destination {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self("/".to_string())
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A non-blocking, user-visible message (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
