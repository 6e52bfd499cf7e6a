//! Data models for the Real or Render game.
//!
//! This module contains the core data structures shared by the stores, the
//! session state machine and the front-end:
//! - [`Settings`]: User preferences persisted under the `game-settings` key
//! - [`LeaderboardEntry`]: One recorded score, persisted under `game-leaderboard`
//! - [`GameMode`]: Difficulty variant with its fixed rules (set size, round cap, timer)
//! - [`RoundImage`]: One candidate image of the current round
//! - [`GameConfig`]: Operator configuration loaded from `Game.yaml`
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: Persisted records derive `Serialize`/`Deserialize` with the
//!   camelCase field names of the stored JSON
//! - **Cloneable**: Snapshots are handed to the front-end by value
//! - **Immutable once recorded**: Leaderboard entries are never edited after creation

pub mod config;
pub mod leaderboard;
pub mod round;
pub mod settings;

pub use config::{GameConfig, TimingConfig};
pub use leaderboard::{LeaderboardEntry, MAX_LEADERBOARD_ENTRIES};
pub use round::{GameMode, POINTS_PER_CORRECT, RoundImage};
pub use settings::{MAX_PLAYER_NAME_CHARS, Settings, Theme};
