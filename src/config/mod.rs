use crate::models::GameConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the operator configuration file inside the config directory.
pub const GAME_CONFIG_FILE: &str = "Game.yaml";

/// Prefix of environment overrides, e.g. `REAL_OR_RENDER_DEBUG_MODE=true` or
/// `REAL_OR_RENDER_TIMING__TICK_INTERVAL_MS=500`.
pub const ENV_PREFIX: &str = "REAL_OR_RENDER";

/// Configuration manager for the game's YAML configuration.
///
/// Values are layered: built-in defaults, then `Game.yaml`, then
/// `REAL_OR_RENDER_*` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    game_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "Real or Render Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            game_config_path: config_dir.join(GAME_CONFIG_FILE),
            config_dir,
        })
    }

    /// Load the game configuration.
    ///
    /// A missing file is written out with the defaults so operators have
    /// something to edit.
    pub fn load_game_config(&self) -> Result<GameConfig> {
        self.load_game_config_with_env(None)
    }

    /// Load the game configuration with an explicit environment map instead of
    /// the process environment.
    pub fn load_game_config_with_env(
        &self,
        env: Option<config::Map<String, String>>,
    ) -> Result<GameConfig> {
        if !self.game_config_path.exists() {
            tracing::warn!(
                "Game config file not found at {}, writing defaults",
                self.game_config_path
            );
            self.save_game_config(&GameConfig::default())?;
        }

        let defaults = Config::try_from(&GameConfig::default())
            .context("Failed to build default game config")?;

        let config: GameConfig = Config::builder()
            .add_source(defaults)
            .add_source(File::new(self.game_config_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read game config: {}", self.game_config_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse game config: {}", self.game_config_path))?;

        tracing::info!("Loaded game config from {}", self.game_config_path);
        Ok(config)
    }

    /// Save the game configuration file.
    pub fn save_game_config(&self, config: &GameConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize game config to YAML")?;

        fs::write(&self.game_config_path, yaml_string)
            .with_context(|| format!("Failed to write game config: {}", self.game_config_path))?;

        tracing::info!("Saved game config to {}", self.game_config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn game_config_path(&self) -> &Utf8Path {
        &self.game_config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    fn no_env() -> Option<config::Map<String, String>> {
        Some(config::Map::new())
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        let config = manager.load_game_config_with_env(no_env()).unwrap();
        assert_eq!(config, GameConfig::default());
        assert!(manager.game_config_path().exists());
    }

    #[test]
    fn test_load_save_game_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = GameConfig::default();
        config.debug_mode = true;
        config.timing.hard_time_limit_secs = 20;
        manager.save_game_config(&config).unwrap();

        let loaded = manager.load_game_config_with_env(no_env()).unwrap();
        assert!(loaded.debug_mode);
        assert_eq!(loaded.timing.hard_time_limit_secs, 20);
    }

    #[test]
    fn test_env_overrides_file() {
        let (manager, _temp_dir) = create_test_config_manager();
        manager.save_game_config(&GameConfig::default()).unwrap();

        let mut env = config::Map::new();
        env.insert("REAL_OR_RENDER_CROP_FRACTION".to_string(), "0.2".to_string());
        env.insert(
            "REAL_OR_RENDER_TIMING__TICK_INTERVAL_MS".to_string(),
            "250".to_string(),
        );

        let loaded = manager.load_game_config_with_env(Some(env)).unwrap();
        assert_eq!(loaded.crop_fraction, 0.2);
        assert_eq!(loaded.timing.tick_interval_ms, 250);
        assert_eq!(loaded.timing.advance_delay_ms, 1200);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.game_config_path(), "timing: [not, a, map]").unwrap();
        assert!(manager.load_game_config_with_env(no_env()).is_err());
    }
}
