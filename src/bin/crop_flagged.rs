//! crop-flagged - trims the bottom strip (watermarks, captions) off flagged images
//!
//! Usage: `crop-flagged [flagged_dir]`
//!
//! Reads `Game.yaml` for the default directory and crop fraction. The fraction
//! can be overridden with `CROP_FRACTION` (or the usual
//! `REAL_OR_RENDER_CROP_FRACTION`). Results land in `<flagged_dir>/_cropped`,
//! which the game prefers when it is non-empty.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use real_or_render::logging::{LogOutput, setup_logging};
use real_or_render::services::crop_bottom;
use real_or_render::{CONFIG_DIR, ConfigManager};

/// Short override name accepted alongside the prefixed config variable.
const CROP_FRACTION_ENV: &str = "CROP_FRACTION";

fn main() -> Result<()> {
    let config = ConfigManager::new(CONFIG_DIR)?.load_game_config()?;
    setup_logging(LogOutput::Console, config.debug_mode)?;

    let fraction = match std::env::var(CROP_FRACTION_ENV) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("{CROP_FRACTION_ENV} is not a number: {raw:?}"))?,
        Err(_) => config.crop_fraction,
    };

    let source_dir = std::env::args()
        .nth(1)
        .map(Utf8PathBuf::from)
        .unwrap_or(config.flagged_dir);

    tracing::info!("Cropping bottom {:.1}% of images in {}", fraction * 100.0, source_dir);
    let report = crop_bottom(&source_dir, fraction)?;

    println!(
        "Cropped {} image(s) into {}",
        report.processed, report.output_dir
    );
    for name in &report.skipped {
        println!("  skipped {name}");
    }

    Ok(())
}
