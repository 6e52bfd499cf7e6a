use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operator configuration from `Game.yaml`.
///
/// Every field has a default so a partial file (or none at all) still yields a
/// playable setup. Environment variables prefixed `REAL_OR_RENDER_` override
/// file values; see [`crate::config::ConfigManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Directory holding the persisted `game-settings` / `game-leaderboard` records
    pub data_dir: Utf8PathBuf,

    /// Byte budget shared by all persisted records, emulating browser storage quota
    pub storage_quota_bytes: Option<u64>,

    /// Directory of flagged (AI-generated) images
    pub flagged_dir: Utf8PathBuf,

    /// Distractor source; `{seed}` is replaced by a random seed per image
    pub distractor_url_template: String,

    /// Fraction of the height trimmed off the bottom by the crop tool
    pub crop_fraction: f64,

    pub log_dir: Utf8PathBuf,

    pub debug_mode: bool,

    pub timing: TimingConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            data_dir: Utf8PathBuf::from("Real or Render Data/storage"),
            storage_quota_bytes: Some(5 * 1024 * 1024),
            flagged_dir: Utf8PathBuf::from("assets/ai-images"),
            distractor_url_template: "https://picsum.photos/seed/{seed}/600/600".to_string(),
            crop_fraction: 0.12,
            log_dir: Utf8PathBuf::from("logs"),
            debug_mode: false,
            timing: TimingConfig::default(),
        }
    }
}

/// Session pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause after a correct pick in easy mode before the next set appears
    pub easy_advance_delay_ms: u64,

    /// Pause after a correct pick in normal and hard mode
    pub advance_delay_ms: u64,

    /// Countdown per hard-mode round
    pub hard_time_limit_secs: u32,

    /// Period of the hard-mode countdown tick
    pub tick_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            easy_advance_delay_ms: 1000,
            advance_delay_ms: 1200,
            hard_time_limit_secs: 30,
            tick_interval_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn advance_delay(&self, mode: super::GameMode) -> Duration {
        match mode {
            super::GameMode::Easy => Duration::from_millis(self.easy_advance_delay_ms),
            _ => Duration::from_millis(self.advance_delay_ms),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
