// Real or Render - spot the AI-generated image among real photos
//
// This is the library crate containing the game core: settings and leaderboard
// persistence, round sessions, and image set construction.
// The binary crate (main.rs) provides the terminal entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{GameConfig, GameMode, LeaderboardEntry, Settings, Theme, TimingConfig};
pub use services::{FlaggedPool, ImageSetProvider};
pub use state::{RoundSession, SessionDriver, SessionEvent};
pub use storage::{FileStore, KeyValueStore, LeaderboardStore, MemoryStore, SettingsStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Directory holding `Game.yaml`
pub const CONFIG_DIR: &str = "Real or Render Data";
