use super::{KeyValueStore, StorageError};
use crate::models::{GameMode, LeaderboardEntry, MAX_LEADERBOARD_ENTRIES};
use std::sync::Arc;

/// Storage key of the leaderboard record.
pub const LEADERBOARD_KEY: &str = "game-leaderboard";

/// Sink for finished-session scores.
///
/// [`crate::state::RoundSession`] records through this seam so sessions can be
/// exercised without a real store.
#[cfg_attr(test, mockall::automock)]
pub trait ScoreRecorder: Send + Sync {
    /// Record a score. Must not fail loudly: persistence problems are the
    /// implementation's to log.
    fn record_score(&self, mode: GameMode, player_name: &str, score: u32);
}

/// Ranked score history persisted under the `game-leaderboard` key.
///
/// The record is a JSON array kept sorted by descending score and capped at
/// [`MAX_LEADERBOARD_ENTRIES`] across all modes. Every query re-reads storage.
#[derive(Clone)]
pub struct LeaderboardStore {
    store: Arc<dyn KeyValueStore>,
}

impl LeaderboardStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All persisted entries.
    ///
    /// A record that isn't a JSON array reads as empty. Inside an array, each
    /// element is decoded on its own and the unreadable ones are skipped, so
    /// one bad entry never costs the rest of the board.
    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        let raw = match self.store.get(LEADERBOARD_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read leaderboard: {}", e);
                return Vec::new();
            }
        };

        let elements: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(elements) => elements,
            Err(e) => {
                tracing::warn!("Leaderboard record is malformed, treating as empty: {}", e);
                return Vec::new();
            }
        };

        elements
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable leaderboard entry #{}: {}", idx, e);
                    None
                }
            })
            .collect()
    }

    /// Append a score, keep the best [`MAX_LEADERBOARD_ENTRIES`], and persist.
    ///
    /// Returns the storage error so callers that care can count it; the
    /// [`ScoreRecorder`] impl logs and discards it.
    pub fn try_record_score(
        &self,
        mode: GameMode,
        player_name: &str,
        score: u32,
    ) -> Result<(), StorageError> {
        let mut entries = self.entries();
        entries.push(LeaderboardEntry {
            mode,
            player_name: player_name.to_string(),
            score,
            timestamp: chrono::Utc::now().timestamp_millis(),
        });

        // Stable sort: equal scores keep their recording order
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_LEADERBOARD_ENTRIES);

        let json = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());
        self.store.set(LEADERBOARD_KEY, &json)?;

        tracing::info!(
            "Recorded {} points for {:?} in {} mode ({} entries kept)",
            score,
            player_name,
            mode,
            entries.len()
        );
        Ok(())
    }

    /// Best `limit` scores of one mode, highest first.
    pub fn top_scores(&self, mode: GameMode, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<_> = self
            .entries()
            .into_iter()
            .filter(|e| e.mode == mode)
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(limit);
        entries
    }

    /// Delete every entry. Asking the player for confirmation is the caller's job.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(LEADERBOARD_KEY)?;
        tracing::info!("Leaderboard cleared");
        Ok(())
    }
}

impl ScoreRecorder for LeaderboardStore {
    fn record_score(&self, mode: GameMode, player_name: &str, score: u32) {
        if let Err(e) = self.try_record_score(mode, player_name, score) {
            tracing::warn!("Score of {} not recorded: {}", score, e);
        }
    }
}
