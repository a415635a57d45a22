//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal; the service logs a warning
//! and continues with defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "VELLUM_ROOT_FOLDER";
/// Environment variable overriding the listen port
pub const ENV_PORT: &str = "VELLUM_PORT";
/// Environment variable overriding the analyzer base URL
pub const ENV_ANALYZER_BASE_URL: &str = "VELLUM_ANALYZER_BASE_URL";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "vellum.db";

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub analyzer_base_url: Option<String>,
    /// Media categories eligible for automated analysis (empty = all)
    pub analyzable_categories: Option<Vec<String>>,
    pub event_capacity: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub port: u16,
    pub analyzer_base_url: String,
    pub event_capacity: usize,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            port: 5810,
            analyzer_base_url: "http://127.0.0.1:8787".to_string(),
            event_capacity: 1000,
            log_level: default_log_level(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub analyzer_base_url: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub port: u16,
    pub analyzer_base_url: String,
    pub analyzable_categories: Vec<String>,
    /// Event bus capacity, never below 1
    pub event_capacity: usize,
    pub log_level: String,
}

impl ServiceConfig {
    /// Resolve configuration from CLI overrides, the environment, an optional
    /// TOML file and compiled defaults
    pub fn resolve(cli: ConfigOverrides, file: Option<TomlConfig>) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let file = file.unwrap_or_default();

        let root_folder = cli
            .root_folder
            .or_else(|| std::env::var(ENV_ROOT_FOLDER).ok().map(PathBuf::from))
            .or(file.root_folder)
            .unwrap_or(defaults.root_folder);

        let env_port = match std::env::var(ENV_PORT) {
            Ok(raw) => match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!("Ignoring invalid {}={}", ENV_PORT, raw);
                    None
                }
            },
            Err(_) => None,
        };
        let port = cli.port.or(env_port).or(file.port).unwrap_or(defaults.port);

        let analyzer_base_url = cli
            .analyzer_base_url
            .or_else(|| std::env::var(ENV_ANALYZER_BASE_URL).ok())
            .or(file.analyzer_base_url)
            .unwrap_or(defaults.analyzer_base_url);

        Self {
            root_folder,
            port,
            analyzer_base_url: analyzer_base_url.trim_end_matches('/').to_string(),
            analyzable_categories: file.analyzable_categories.unwrap_or_default(),
            event_capacity: file.event_capacity.unwrap_or(defaults.event_capacity).max(1),
            log_level: file.logging.level,
        }
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    /// Create the root folder if it does not exist
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Load the platform config file, if any
///
/// Returns `None` when no file exists or it cannot be parsed.
pub fn load_toml_config() -> Option<TomlConfig> {
    let path = match default_config_path() {
        Ok(path) => path,
        Err(_) => return None,
    };

    match read_toml_config(&path) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            None
        }
    }
}

/// Get default configuration file path for the platform
fn default_config_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/vellum/config.toml first, then /etc/vellum/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("vellum").join("config.toml"));
        let system_config = PathBuf::from("/etc/vellum/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("vellum").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/vellum (or /var/lib/vellum for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("vellum"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/vellum"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("vellum"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/vellum"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("vellum"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\vellum"))
    } else {
        PathBuf::from("./vellum_data")
    }
}
