//! Settings file loading
//!
//! Settings are stored as TOML in `~/.config/rdpdrive/settings.toml` by
//! default. A missing default file is not an error; an explicitly named
//! file that does not exist is.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

use super::settings::ClientSettings;

const SETTINGS_FILE: &str = "settings.toml";

/// Loads and renders client settings files
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Base directory for configuration files
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new `ConfigManager` with the default configuration directory
    ///
    /// # Errors
    ///
    /// Returns an error if the user configuration directory cannot be determined.
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config")))?
            .join("rdpdrive");
        Ok(Self { config_dir })
    }

    /// Creates a new `ConfigManager` with a custom configuration directory
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Loads the default settings file, falling back to defaults when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(&self) -> ConfigResult<ClientSettings> {
        let path = self.settings_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(ClientSettings::default());
        }
        Self::load_from(&path)
    }

    /// Loads settings from an explicit path; `~` and environment variables are expanded
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist, or a read or
    /// parse error otherwise.
    pub fn load_from(path: &Path) -> ConfigResult<ClientSettings> {
        let path = expand_path(path)?;
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        let settings = parse_settings(&content)?;
        tracing::debug!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }
}

/// Parses settings from TOML text
///
/// # Errors
///
/// Returns `ConfigError::Parse` if the text is not valid settings TOML.
pub fn parse_settings(content: &str) -> ConfigResult<ClientSettings> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Renders settings as TOML (the password is never included)
///
/// # Errors
///
/// Returns `ConfigError::Serialize` if serialization fails.
pub fn render_settings(settings: &ClientSettings) -> ConfigResult<String> {
    toml::to_string_pretty(settings).map_err(|e| ConfigError::Serialize(e.to_string()))
}

fn expand_path(path: &Path) -> ConfigResult<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| ConfigError::Parse(format!("Cannot expand path {raw}: {e}")))?;
    Ok(PathBuf::from(expanded.into_owned()))
}
