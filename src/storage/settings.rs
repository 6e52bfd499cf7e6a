use super::{KeyValueStore, StorageError};
use crate::models::Settings;
use crate::services::avatar::{AVATAR_RECOMPRESS_THRESHOLD, AVATAR_TARGET_BYTES, compress_data_url};
use std::sync::Arc;

/// Storage key of the settings record.
pub const SETTINGS_KEY: &str = "game-settings";

/// Result of [`SettingsStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// Whether any version of the record was persisted
    pub saved: bool,

    /// The record as persisted, `None` when nothing was written
    pub stored: Option<Settings>,

    /// The avatar was removed to make the record fit
    pub avatar_dropped: bool,
}

/// Persists [`Settings`] under the `game-settings` key.
///
/// Loading never fails: a missing or unreadable record yields the defaults.
/// Saving never returns an error either; failures are reported through
/// [`SaveOutcome`].
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the persisted settings merged over the defaults.
    pub fn load(&self) -> Settings {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::info!("No saved settings, using defaults");
                return Settings::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read settings, using defaults: {}", e);
                return Settings::default();
            }
        };

        let stored = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(fields)) => fields,
            Ok(other) => {
                tracing::warn!("Saved settings are not an object ({}), using defaults", other);
                return Settings::default();
            }
            Err(e) => {
                tracing::warn!("Saved settings are malformed, using defaults: {}", e);
                return Settings::default();
            }
        };

        let settings = merge_over_defaults(stored);
        tracing::info!("Loaded settings for player {:?}", settings.player_name);
        settings
    }

    /// Save settings, shrinking or dropping the avatar when needed.
    ///
    /// 1. Normalize name and volume
    /// 2. Recompress an avatar above the size threshold; drop it when it can't
    ///    be brought under the target size
    /// 3. Write; on failure write once more without the avatar
    pub fn save(&self, settings: &Settings) -> SaveOutcome {
        let mut copy = settings.normalized();
        let mut avatar_dropped = false;

        if copy.avatar_len() > AVATAR_RECOMPRESS_THRESHOLD {
            let original_len = copy.avatar_len();
            let compressed = copy
                .avatar
                .as_deref()
                .map(|avatar| compress_data_url(avatar, AVATAR_TARGET_BYTES));

            match compressed {
                Some(Ok(avatar)) if avatar.len() <= AVATAR_TARGET_BYTES => {
                    tracing::info!(
                        "Compressed avatar from {} to {} bytes",
                        original_len,
                        avatar.len()
                    );
                    copy.avatar = Some(avatar);
                }
                Some(Ok(avatar)) => {
                    tracing::warn!(
                        "Avatar still {} bytes at lowest quality, dropping it",
                        avatar.len()
                    );
                    copy.avatar = None;
                    avatar_dropped = true;
                }
                Some(Err(e)) => {
                    tracing::warn!("Avatar could not be compressed, dropping it: {}", e);
                    copy.avatar = None;
                    avatar_dropped = true;
                }
                None => {}
            }
        }

        match self.write(&copy) {
            Ok(()) => {
                return SaveOutcome {
                    saved: true,
                    stored: Some(copy),
                    avatar_dropped,
                };
            }
            Err(e) => tracing::warn!("Failed to save settings, retrying without avatar: {}", e),
        }

        let no_avatar = Settings {
            avatar: None,
            ..copy
        };
        match self.write(&no_avatar) {
            Ok(()) => SaveOutcome {
                saved: true,
                stored: Some(no_avatar),
                avatar_dropped: true,
            },
            Err(e) => {
                tracing::error!("Failed to save settings: {}", e);
                SaveOutcome {
                    saved: false,
                    stored: None,
                    avatar_dropped,
                }
            }
        }
    }

    fn write(&self, settings: &Settings) -> Result<(), StorageError> {
        // Settings only hold strings, floats and bools, so serialization cannot fail
        let json = serde_json::to_string(settings).unwrap_or_default();
        self.store.set(SETTINGS_KEY, &json)?;
        tracing::info!("Saved settings ({} bytes)", json.len());
        Ok(())
    }
}

/// Overlay stored fields on the defaults one key at a time.
///
/// A field whose value doesn't fit its type keeps the default; the other
/// fields still load.
fn merge_over_defaults(stored: serde_json::Map<String, serde_json::Value>) -> Settings {
    let serde_json::Value::Object(mut merged) =
        serde_json::to_value(Settings::default()).unwrap_or_default()
    else {
        return Settings::default();
    };

    for (key, value) in stored {
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value);
        match serde_json::from_value::<Settings>(serde_json::Value::Object(candidate.clone())) {
            Ok(_) => merged = candidate,
            Err(e) => tracing::warn!("Ignoring saved setting {:?}: {}", key, e),
        }
    }

    serde_json::from_value(serde_json::Value::Object(merged)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theme;
    use crate::services::avatar::encode_data_url;
    use crate::storage::MemoryStore;

    fn create_test_store(store: MemoryStore) -> (SettingsStore, Arc<MemoryStore>) {
        let store = Arc::new(store);
        (SettingsStore::new(store.clone()), store)
    }

    #[test]
    fn test_load_missing_returns_defaults() {
        let (settings, _) = create_test_store(MemoryStore::new());
        assert_eq!(settings.load(), Settings::default());
    }

    #[test]
    fn test_load_corrupted_returns_defaults() {
        let (settings, raw) = create_test_store(MemoryStore::new());
        raw.set(SETTINGS_KEY, "{not json").unwrap();
        assert_eq!(settings.load(), Settings::default());

        raw.set(SETTINGS_KEY, "[1, 2, 3]").unwrap();
        assert_eq!(settings.load(), Settings::default());
    }

    #[test]
    fn test_bad_field_keeps_default_for_that_field_only() {
        let (settings, raw) = create_test_store(MemoryStore::new());

        raw.set(SETTINGS_KEY, r#"{"playerName":"Ada","theme":"purple"}"#).unwrap();
        let loaded = settings.load();
        assert_eq!(loaded.player_name, "Ada");
        assert_eq!(loaded.theme, Theme::Neon);

        raw.set(
            SETTINGS_KEY,
            r#"{"playerName":"Ada","masterVolume":"loud","musicOn":false,"theme":"retro","extra":1}"#,
        )
        .unwrap();
        let loaded = settings.load();
        assert_eq!(loaded.player_name, "Ada");
        assert_eq!(loaded.master_volume, 0.5);
        assert!(!loaded.music_on);
        assert!(loaded.sfx_on);
        assert_eq!(loaded.theme, Theme::Retro);
    }

    #[test]
    fn test_save_then_load() {
        let (settings, _) = create_test_store(MemoryStore::new());
        let custom = Settings {
            player_name: "Grace".to_string(),
            theme: Theme::Dark,
            music_on: false,
            ..Settings::default()
        };

        let outcome = settings.save(&custom);
        assert!(outcome.saved);
        assert!(!outcome.avatar_dropped);
        assert_eq!(settings.load(), custom);
    }

    #[test]
    fn test_quota_failure_drops_avatar() {
        let (settings, _) = create_test_store(MemoryStore::with_quota(2_000));
        let custom = Settings {
            avatar: Some(encode_data_url("image/png", &[7u8; 4_000])),
            ..Settings::default()
        };

        let outcome = settings.save(&custom);
        assert!(outcome.saved);
        assert!(outcome.avatar_dropped);
        assert_eq!(outcome.stored.as_ref().unwrap().avatar, None);
        assert_eq!(settings.load().avatar, None);
    }

    #[test]
    fn test_save_reports_failure_without_panicking() {
        let (settings, _) = create_test_store(MemoryStore::with_quota(5));
        let outcome = settings.save(&Settings::default());
        assert!(!outcome.saved);
        assert!(outcome.stored.is_none());
    }

    /// PNG of a gradient with per-pixel noise: large as PNG, small as JPEG.
    fn noisy_png_data_url(width: u32, height: u32) -> String {
        use image::{ImageFormat, RgbImage};
        use rand::{Rng, SeedableRng, rngs::StdRng};
        use std::io::Cursor;

        let mut rng = StdRng::seed_from_u64(7);
        let img = RgbImage::from_fn(width, height, |x, y| {
            let base = ((x + y) % 200) as u8;
            image::Rgb([
                base + rng.gen_range(0..24),
                (y % 200) as u8 + rng.gen_range(0..24),
                (x % 200) as u8 + rng.gen_range(0..24),
            ])
        });
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        encode_data_url("image/png", &bytes)
    }

    #[test]
    fn test_oversized_avatar_is_recompressed_and_kept() {
        let (settings, _) = create_test_store(MemoryStore::new());
        let custom = Settings {
            avatar: Some(noisy_png_data_url(700, 700)),
            ..Settings::default()
        };
        assert!(custom.avatar_len() > AVATAR_RECOMPRESS_THRESHOLD);

        let outcome = settings.save(&custom);
        assert!(outcome.saved);
        assert!(!outcome.avatar_dropped);
        let stored = outcome.stored.unwrap().avatar.unwrap();
        assert!(stored.len() <= AVATAR_TARGET_BYTES);

        let reloaded = settings.load().avatar.unwrap();
        assert!(reloaded.starts_with("data:image/jpeg;base64,"));
        assert_eq!(reloaded, stored);
    }

    #[test]
    fn test_undecodable_oversized_avatar_is_dropped() {
        let (settings, _) = create_test_store(MemoryStore::new());
        let custom = Settings {
            avatar: Some(encode_data_url("image/png", &vec![0u8; 160_000])),
            ..Settings::default()
        };
        assert!(custom.avatar_len() > AVATAR_RECOMPRESS_THRESHOLD);

        let outcome = settings.save(&custom);
        assert!(outcome.saved);
        assert!(outcome.avatar_dropped);
        assert_eq!(settings.load().avatar, None);
    }
}
