//! Daemon settings: an optional `aquaria.toml` in the data directory, then
//! environment variable overrides.
//!
//! Every field has a default, so the file may be absent. Command-line flags
//! are applied on top by `main`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Settings file looked up in the data directory.
pub const SETTINGS_FILE: &str = "aquaria.toml";

/// Top-level settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Protocol listener.
    pub server: ServerSettings,
    /// Installation files.
    pub files: FileSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Device actuation.
    pub actuation: ActuationSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Paths of the installation files, relative to the data directory unless
/// absolute.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub config: PathBuf,
    pub schedule: PathBuf,
    /// Waveform log; none when unset.
    pub vcd_log: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActuationSettings {
    /// Track device state without running device helpers.
    pub dry_run: bool,
}

impl Settings {
    /// Load `aquaria.toml` from `dir` (if present), then apply environment
    /// overrides.
    ///
    /// The result is not validated yet; call [`Settings::validate`] once the
    /// command-line flags are applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        let mut settings = Self::from_file(&dir.join(SETTINGS_FILE))?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(SettingsError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(SettingsError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("AQUARIA_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("AQUARIA_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("AQUARIA_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("AQUARIA_VCD_LOG") {
            self.files.vcd_log = Some(PathBuf::from(val));
        }
        if let Some(val) = var("AQUARIA_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Validation`] for a zero port or an empty
    /// file name.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.server.port == 0 {
            return Err(SettingsError::Validation("port must be non-zero".to_string()));
        }
        if self.files.config.as_os_str().is_empty() || self.files.schedule.as_os_str().is_empty() {
            return Err(SettingsError::Validation(
                "config and schedule file names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn config_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.files.config)
    }

    #[must_use]
    pub fn schedule_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.files.schedule)
    }

    #[must_use]
    pub fn vcd_log_path(&self, dir: &Path) -> Option<PathBuf> {
        self.files.vcd_log.as_ref().map(|path| dir.join(path))
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4444,
        }
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config"),
            schedule: PathBuf::from("schedule"),
            vcd_log: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "aquariad=info,aquaria=info".to_string(),
        }
    }
}

/// Settings errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// TOML parse failure.
    #[error("failed to parse settings file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read settings file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid settings: {0}")]
    Validation(String),
}
