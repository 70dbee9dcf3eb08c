//! Difficulty rating encoder.
//!
//! Five stars drive a 0–10 integer scale with half steps. Clicking star `k`
//! cycles through three values: `2k` (full) → `2k - 2` (below the half) →
//! `2k - 1` (half) → `2k` …

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of stars in the rating control.
pub const STARS: u8 = 5;

/// The user's perceived difficulty of the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DifficultyRating(u8);

impl DifficultyRating {
    pub const MAX: u8 = 2 * STARS;
    pub const DEFAULT: DifficultyRating = DifficultyRating(5);

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(Error::InvalidPayload(format!(
                "difficulty rating {value} exceeds {}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Rating after clicking the `star`-th star (1-indexed).
    pub fn click_star(self, star: u8) -> Result<Self> {
        if !(1..=STARS).contains(&star) {
            return Err(Error::InvalidStar(star));
        }
        let full = star * 2;
        let half = full - 1;

        let next = if self.0 == full {
            half - 1
        } else if self.0 == half {
            full
        } else {
            half
        };
        Ok(Self(next))
    }

    /// How the `star`-th star (1-indexed) is drawn at this rating.
    pub fn fill(self, star: u8) -> StarFill {
        let full = star * 2;
        if self.0 >= full {
            StarFill::Full
        } else if self.0 == full - 1 {
            StarFill::Half
        } else {
            StarFill::Empty
        }
    }

    /// Fill of every star, left to right.
    pub fn stars(self) -> [StarFill; STARS as usize] {
        std::array::from_fn(|i| self.fill(i as u8 + 1))
    }
}

impl Default for DifficultyRating {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for DifficultyRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarFill {
    Empty,
    Half,
    Full,
}
