use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where a binary sends its log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput<'a> {
    /// Daily rolling file `<dir>/<prefix>.<date>`. The game uses this because its
    /// terminal UI owns the screen.
    File { dir: &'a Utf8Path, prefix: &'a str },

    /// Compact lines on stderr, for one-shot tools like `crop-flagged`.
    Console,
}

/// Level used when `RUST_LOG` is unset.
pub fn default_level(debug_mode: bool) -> &'static str {
    if debug_mode { "debug" } else { "info" }
}

/// Install the global tracing subscriber.
///
/// # Returns
/// For [`LogOutput::File`], the appender guard; hold it until exit or buffered
/// lines are lost.
pub fn setup_logging(output: LogOutput<'_>, debug_mode: bool) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug_mode)));

    let (file_layer, guard) = match output {
        LogOutput::File { dir, prefix } => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir))?;
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, prefix));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_names(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        LogOutput::Console => (None, None),
    };

    let console_layer = matches!(output, LogOutput::Console).then(|| {
        fmt::layer()
            .compact()
            .without_time()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging initialized: {:?}, debug={}", output, debug_mode);
    Ok(guard)
}
