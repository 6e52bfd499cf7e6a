use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Points awarded for every correct pick.
pub const POINTS_PER_CORRECT: u32 = 50;

/// Difficulty variant of a play-through.
///
/// Every mode fixes the number of images per round, the round cap and
/// whether a per-round countdown runs:
///
/// | Mode   | Images | Rounds    | Timer |
/// |--------|--------|-----------|-------|
/// | Easy   | 3      | unlimited | none  |
/// | Normal | 5      | 5         | none  |
/// | Hard   | 5      | 5         | 30 s  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Easy,
    Normal,
    Hard,
}

impl GameMode {
    /// All modes in menu order.
    pub const ALL: [GameMode; 3] = [GameMode::Easy, GameMode::Normal, GameMode::Hard];

    /// Number of images shown each round (one flagged, the rest distractors).
    pub fn set_size(self) -> usize {
        match self {
            GameMode::Easy => 3,
            GameMode::Normal | GameMode::Hard => 5,
        }
    }

    /// Number of distractor images per round.
    pub fn distractor_count(self) -> usize {
        self.set_size() - 1
    }

    /// Round cap, or `None` when the mode repeats until the first mistake.
    pub fn max_rounds(self) -> Option<u32> {
        match self {
            GameMode::Easy => None,
            GameMode::Normal | GameMode::Hard => Some(5),
        }
    }

    /// Whether a per-round countdown runs in this mode.
    pub fn is_timed(self) -> bool {
        matches!(self, GameMode::Hard)
    }

    /// Lowercase key used in persisted records.
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Easy => "easy",
            GameMode::Normal => "normal",
            GameMode::Hard => "hard",
        }
    }

    /// One-line description for the mode picker.
    pub fn description(self) -> &'static str {
        match self {
            GameMode::Easy => "3 images, no timer. Keep going until you miss.",
            GameMode::Normal => "5 images, 5 rounds, no timer.",
            GameMode::Hard => "5 images, 5 rounds, a countdown every round.",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(GameMode::Easy),
            "normal" => Ok(GameMode::Normal),
            "hard" => Ok(GameMode::Hard),
            other => Err(format!("unknown game mode: {other}")),
        }
    }
}

/// One candidate image of a round.
///
/// `id` is the 1-based position in the current round and is reassigned every
/// round. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundImage {
    pub id: u32,
    pub source_ref: String,
    pub is_target: bool,
}
