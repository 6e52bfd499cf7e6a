//! Integration tests for settings and leaderboard persistence on disk
//!
//! These tests verify:
//! - Records survive reopening the FileStore
//! - Malformed or missing records fall back to defaults / empty lists
//! - The avatar fallback when the storage quota is tight
//! - Leaderboard ordering, filtering and the entry cap

use camino::Utf8PathBuf;
use real_or_render::models::settings::ANONYMOUS_PLAYER;
use real_or_render::storage::{LEADERBOARD_KEY, SETTINGS_KEY, ScoreRecorder};
use real_or_render::{
    FileStore, GameMode, KeyValueStore, LeaderboardStore, Settings, SettingsStore, Theme,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_store(quota: Option<u64>) -> (TempDir, Utf8PathBuf, Arc<dyn KeyValueStore>) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().join("storage")).unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&dir, quota).unwrap());
    (temp_dir, dir, store)
}

#[test]
fn test_settings_persist_across_reopen() {
    let (_temp_dir, dir, store) = create_test_store(None);

    let settings = Settings {
        player_name: "Grace".to_string(),
        master_volume: 0.25,
        music_on: false,
        theme: Theme::Retro,
        ..Settings::default()
    };
    let outcome = SettingsStore::new(store).save(&settings);
    assert!(outcome.saved);
    assert!(!outcome.avatar_dropped);

    let reopened: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&dir, None).unwrap());
    assert_eq!(SettingsStore::new(reopened).load(), settings);
}

#[test]
fn test_settings_missing_and_malformed_yield_defaults() {
    let (_temp_dir, dir, store) = create_test_store(None);
    let settings_store = SettingsStore::new(store);

    assert_eq!(settings_store.load(), Settings::default());

    fs::write(dir.join(format!("{SETTINGS_KEY}.json")), "{not json").unwrap();
    assert_eq!(settings_store.load(), Settings::default());
}

#[test]
fn test_partial_settings_record_merges_defaults() {
    let (_temp_dir, _dir, store) = create_test_store(None);
    store.set(SETTINGS_KEY, r#"{"playerName":"Lin","theme":"dark"}"#).unwrap();

    let loaded = SettingsStore::new(store).load();
    assert_eq!(loaded.player_name, "Lin");
    assert_eq!(loaded.theme, Theme::Dark);
    assert_eq!(loaded.master_volume, 0.5);
    assert!(loaded.music_on);
    assert_eq!(loaded.avatar, None);
}

#[test]
fn test_settings_save_drops_avatar_when_quota_is_tight() {
    let (_temp_dir, _dir, store) = create_test_store(Some(2_000));

    // Small enough to skip recompression, too large for the quota
    let settings = Settings {
        player_name: "Quota".to_string(),
        avatar: Some(format!("data:image/png;base64,{}", "A".repeat(5_000))),
        ..Settings::default()
    };
    let outcome = SettingsStore::new(store.clone()).save(&settings);

    assert!(outcome.saved);
    assert!(outcome.avatar_dropped);
    let stored = outcome.stored.unwrap();
    assert_eq!(stored.avatar, None);
    assert_eq!(stored.player_name, "Quota");
    assert_eq!(SettingsStore::new(store).load(), stored);
}

#[test]
fn test_leaderboard_persists_sorted_entries() {
    let (_temp_dir, dir, store) = create_test_store(None);
    let leaderboard = LeaderboardStore::new(store);

    leaderboard.record_score(GameMode::Normal, "Ada", 100);
    leaderboard.record_score(GameMode::Normal, "Bob", 250);
    leaderboard.record_score(GameMode::Hard, "Cy", 50);
    leaderboard.record_score(GameMode::Normal, "Dee", 100);

    let reopened: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&dir, None).unwrap());
    let leaderboard = LeaderboardStore::new(reopened);

    let names: Vec<_> = leaderboard
        .entries()
        .into_iter()
        .map(|e| (e.player_name, e.score))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Bob".to_string(), 250),
            ("Ada".to_string(), 100),
            ("Dee".to_string(), 100),
            ("Cy".to_string(), 50),
        ]
    );

    let normal = leaderboard.top_scores(GameMode::Normal, 2);
    assert_eq!(normal.len(), 2);
    assert_eq!(normal[0].player_name, "Bob");
    assert_eq!(normal[1].player_name, "Ada");
    assert!(leaderboard.top_scores(GameMode::Easy, 5).is_empty());
}

#[test]
fn test_leaderboard_malformed_record_and_clear() {
    let (_temp_dir, dir, store) = create_test_store(None);
    fs::write(dir.join(format!("{LEADERBOARD_KEY}.json")), "[{\"broken\": ").unwrap();

    let leaderboard = LeaderboardStore::new(store);
    assert!(leaderboard.entries().is_empty());

    leaderboard.record_score(GameMode::Easy, ANONYMOUS_PLAYER, 150);
    assert_eq!(leaderboard.entries().len(), 1);

    leaderboard.clear().unwrap();
    assert!(leaderboard.entries().is_empty());
}

#[test]
fn test_leaderboard_keeps_best_hundred() {
    let (_temp_dir, _dir, store) = create_test_store(None);
    let leaderboard = LeaderboardStore::new(store);

    for score in 1..=120u32 {
        leaderboard.record_score(GameMode::Easy, "Grinder", score * 50);
    }

    let entries = leaderboard.entries();
    assert_eq!(entries.len(), 100);
    assert_eq!(entries[0].score, 120 * 50);
    assert_eq!(entries[99].score, 21 * 50);
}
