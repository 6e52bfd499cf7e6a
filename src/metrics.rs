// Game metrics module
//
// Lightweight counters for how sessions go, logged on shutdown

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide game metrics
///
/// Uses atomic operations so the session driver task and the front-end can
/// record without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Sessions started (retries included)
    pub sessions_started: AtomicU64,

    /// Picks that found the flagged image
    pub correct_picks: AtomicU64,

    /// Picks that hit a distractor
    pub wrong_picks: AtomicU64,

    /// Hard-mode rounds lost to the countdown
    pub timeouts: AtomicU64,

    /// Capped sessions cleared to the end
    pub sessions_completed: AtomicU64,

    /// Scores handed to the leaderboard
    pub scores_recorded: AtomicU64,

    /// Settings saves that failed or had to drop the avatar
    pub settings_save_degraded: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicU64::new(0),
            correct_picks: AtomicU64::new(0),
            wrong_picks: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            scores_recorded: AtomicU64::new(0),
            settings_save_degraded: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_correct_pick(&self) {
        self.correct_picks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wrong_pick(&self) {
        self.wrong_picks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_score_recorded(&self) {
        self.scores_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settings_save_degraded(&self) {
        self.settings_save_degraded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Share of picks that were correct, 0.0 when nothing was picked yet
    pub fn accuracy(&self) -> f64 {
        let correct = self.correct_picks.load(Ordering::Relaxed);
        let total = correct + self.wrong_picks.load(Ordering::Relaxed);
        if total > 0 {
            correct as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Game Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Sessions: {} started, {} completed",
            self.sessions_started.load(Ordering::Relaxed),
            self.sessions_completed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Picks: {} correct, {} wrong, {} timeouts (accuracy {:.0}%)",
            self.correct_picks.load(Ordering::Relaxed),
            self.wrong_picks.load(Ordering::Relaxed),
            self.timeouts.load(Ordering::Relaxed),
            self.accuracy() * 100.0
        );
        tracing::info!(
            "Scores recorded: {}, degraded settings saves: {}",
            self.scores_recorded.load(Ordering::Relaxed),
            self.settings_save_degraded.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
