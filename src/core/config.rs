//! Configuration module for chksum
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\chksum\config.toml
//! - Linux: ~/.config/chksum/config.toml
//! - macOS: ~/Library/Application Support/chksum/config.toml
//!
//! A `chksum.toml` in the working directory takes precedence over the
//! standard location.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for config directory
const APP_NAME: &str = "chksum";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file looked up in the working directory before the standard location
const LOCAL_CONFIG_FILE_NAME: &str = "chksum.toml";

/// Default file name of the index database
pub const DEFAULT_DATABASE_NAME: &str = "chksum.db";

/// Default file name of the log file
pub const DEFAULT_LOG_FILE: &str = "chksum.log";

/// Default number of bytes read per hashing chunk
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Open the configuration file in the default application.
pub fn open_config_in_editor() -> Result<PathBuf, ConfigError> {
    let config_path = init_config()?;

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", config_path.to_str().unwrap_or("")])
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(&config_path)
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(&config_path)
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Directory holding the running executable.
///
/// This is the default index root: the index lives next to the tool, and every
/// stored path is relative to it.
pub fn discover_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Index location settings
    pub index: IndexConfig,

    /// Hashing settings
    pub hashing: HashingConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Index location configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Root directory of the indexed tree (defaults to the executable's directory)
    pub root: Option<PathBuf>,

    /// File name of the index database inside the root
    pub database_name: String,

    /// Additional file names never indexed
    pub exclude: Vec<String>,
}

/// Hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Algorithm name: sha256, xxh32 or xxh64
    pub algorithm: String,

    /// Bytes read per streaming chunk
    pub buffer_size: usize,

    /// Hashing worker threads (0 = one per hardware thread)
    pub threads: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path (relative paths are placed in the index root)
    pub log_file: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: None,
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            exclude: Vec::new(),
        }
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            algorithm: "sha256".to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            threads: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: true,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Config {
    /// Index root: the explicit override, then the configured root, then the
    /// executable's directory
    pub fn resolve_root(&self, override_root: Option<&Path>) -> PathBuf {
        override_root
            .map(Path::to_path_buf)
            .or_else(|| self.index.root.clone())
            .unwrap_or_else(discover_root)
    }

    /// Absolute location of the log file for the given root
    pub fn log_file_path(&self, root: &Path) -> PathBuf {
        if self.logging.log_file.is_absolute() {
            self.logging.log_file.clone()
        } else {
            root.join(&self.logging.log_file)
        }
    }

    /// File name component of the configured log file
    pub fn log_file_name(&self) -> String {
        self.logging
            .log_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load(&local);
        }

        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        Ok(Self::default())
    }

    pub fn get_active_config_path() -> PathBuf {
        let local = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }

        get_config_path().unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE_NAME))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    FileNotFound(PathBuf),
    ReadError(PathBuf, String),
    ParseError(PathBuf, String),
    SerializeError(String),
    WriteError(PathBuf, String),
    ConfigDirNotFound,
    OpenError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), err)
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), err)
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::OpenError(path, err) => {
                write!(f, "Failed to open config file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert!(config.index.root.is_none());
        assert_eq!(config.index.database_name, "chksum.db");
        assert!(config.index.exclude.is_empty());
        assert_eq!(config.hashing.algorithm, "sha256");
        assert_eq!(config.hashing.buffer_size, 4096);
        assert_eq!(config.hashing.threads, 0);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.log_to_file);
    }

    #[test]
    fn test_example_config_parses_to_defaults() {
        let config: Config = toml::from_str(&Config::generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.index.database_name, defaults.index.database_name);
        assert_eq!(config.hashing.algorithm, defaults.hashing.algorithm);
        assert_eq!(config.hashing.buffer_size, defaults.hashing.buffer_size);
        assert_eq!(config.logging.log_file, defaults.logging.log_file);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [hashing]
            algorithm = "xxh64"
            "#,
        )
        .unwrap();

        assert_eq!(config.hashing.algorithm, "xxh64");
        assert_eq!(config.hashing.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.index.database_name, DEFAULT_DATABASE_NAME);
    }

    #[test]
    fn test_render_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.index.root = Some(PathBuf::from("/srv/media"));
        config.index.exclude = vec!["Thumbs.db".to_string()];
        config.hashing.threads = 4;
        fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.index.root, Some(PathBuf::from("/srv/media")));
        assert_eq!(loaded.index.exclude, vec!["Thumbs.db".to_string()]);
        assert_eq!(loaded.hashing.threads, 4);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/chksum/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[hashing\nalgorithm = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_, _)));
    }

    #[test]
    fn test_resolve_root_precedence() {
        let mut config = Config::default();
        config.index.root = Some(PathBuf::from("/configured"));

        assert_eq!(
            config.resolve_root(Some(Path::new("/override"))),
            PathBuf::from("/override")
        );
        assert_eq!(config.resolve_root(None), PathBuf::from("/configured"));

        config.index.root = None;
        assert_eq!(config.resolve_root(None), discover_root());
    }

    #[test]
    fn test_log_file_path() {
        let config = Config::default();
        assert_eq!(
            config.log_file_path(Path::new("/data")),
            PathBuf::from("/data/chksum.log")
        );
        assert_eq!(config.log_file_name(), "chksum.log");
    }
}
