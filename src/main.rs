//! Real or Render - spot the AI-generated image
//!
//! Main entry point for the terminal game.
//!
//! # Overview
//!
//! This binary wires the library's components together:
//! - Configuration loading ([`ConfigManager`])
//! - Logging infrastructure (daily rotating file)
//! - Tokio async runtime (session timers and the stdin loop)
//! - Persistence ([`FileStore`] behind [`SettingsStore`] and [`LeaderboardStore`])
//! - Terminal controller ([`TerminalController`])
//!
//! # Execution Flow
//!
//! 1. Load `Real or Render Data/Game.yaml` (written with defaults if missing)
//! 2. Initialize logging → `<log_dir>/real-or-render.<date>`
//! 3. Load the flagged image pool (the game refuses to start without one)
//! 4. Create the tokio runtime
//! 5. Run the terminal controller on stdin/stdout until `quit`
//! 6. Log the session metrics and shut the runtime down

use anyhow::{Context, Result};
use real_or_render::logging::{LogOutput, setup_logging};
use real_or_render::services::{FlaggedPool, ImageSetProvider};
use real_or_render::storage::{FileStore, KeyValueStore, LeaderboardStore, SettingsStore};
use real_or_render::ui::TerminalController;
use real_or_render::{APP_NAME, CONFIG_DIR, ConfigManager, Metrics, VERSION};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(CONFIG_DIR)?;
    let config = config_manager.load_game_config()?;

    // Hold the guard until exit so buffered log lines are flushed
    let _log_guard = setup_logging(
        LogOutput::File {
            dir: &config.log_dir,
            prefix: "real-or-render",
        },
        config.debug_mode,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::debug!("Game config: {:?}", config);

    let pool = FlaggedPool::load(&config.flagged_dir).with_context(|| {
        format!(
            "No AI images found in {}; add some (or run crop-flagged) before playing",
            config.flagged_dir
        )
    })?;
    tracing::info!("Loaded {} flagged images from {}", pool.len(), config.flagged_dir);

    let store: Arc<dyn KeyValueStore> =
        Arc::new(FileStore::new(&config.data_dir, config.storage_quota_bytes)?);
    let settings_store = SettingsStore::new(store.clone());
    let leaderboard = Arc::new(LeaderboardStore::new(store));
    let provider = Arc::new(ImageSetProvider::new(pool, config.distractor_url_template.clone()));
    let metrics = Arc::new(Metrics::new());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("real-or-render-worker")
        .build()?;

    let result = runtime.block_on(async {
        let mut controller = TerminalController::new(
            settings_store,
            leaderboard,
            provider,
            config.timing,
            metrics.clone(),
        );
        controller
            .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    });

    metrics.log_summary();

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Application shutdown complete");

    result.inspect_err(|e| tracing::error!("Terminal error: {:#}", e))
}
