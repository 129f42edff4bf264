use crate::{AppConfig, ConfigError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const ORG: &str = "dev";
const AUTHOR: &str = "Beacon";
const APP: &str = "Beacon";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    data_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from(ORG, AUTHOR, APP).ok_or(ConfigError::MissingDirectories)?;
        let config_dir = dirs.config_dir().to_path_buf();
        let data_dir = dirs.data_dir().to_path_buf();

        fs::create_dir_all(&config_dir)?;
        fs::create_dir_all(&data_dir)?;

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            let initial = AppConfig::default();
            let content = toml::to_string_pretty(&initial)?;
            fs::write(&config_path, content)?;
        }

        Ok(Self {
            config_path,
            data_dir,
        })
    }

    /// Load the config file, then let `BEACON_*` environment variables
    /// override the secret-bearing fields so credentials can stay out of
    /// the file entirely.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = fs::read_to_string(&self.config_path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        apply_env_overrides(&mut config);
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(user) = env_value("BEACON_MAIL_USER") {
        config.imap.username = Some(user.clone());
        config.smtp.username = Some(user);
    }
    if let Some(pass) = env_value("BEACON_MAIL_PASS") {
        config.imap.password = Some(pass.clone());
        config.smtp.password = Some(pass);
    }
    if let Some(token) = env_value("BEACON_STORE_TOKEN") {
        config.store.token = Some(token);
    }
    if let Some(user) = env_value("BEACON_LOGIN_USER") {
        config.auth.username = user;
    }
    if let Some(pass) = env_value("BEACON_LOGIN_PASS") {
        config.auth.password = pass;
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
