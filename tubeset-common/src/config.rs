//! Configuration loading and root folder resolution
//!
//! Priority for every setting (highest first):
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing or unreadable TOML file never stops startup; it is logged and
//! defaults are used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable overriding the data root
pub const ROOT_FOLDER_ENV: &str = "TUBESET_ROOT_FOLDER";

/// Environment variable overriding the listen address
pub const BIND_ENV: &str = "TUBESET_BIND";

/// Store directory name under the data root
pub const STORE_DIR: &str = "database";

/// Holding area directory name under the data root
pub const HOLDING_DIR: &str = "recyclebin";

/// Temporary upload extraction directory name under the data root
pub const UPLOADS_DIR: &str = "uploads";

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub http_timeout_secs: Option<u64>,
    /// Minimum spacing between requests to the video platform
    pub request_interval_ms: Option<u64>,
    pub max_playlist_pages: Option<usize>,
    pub max_download_mb: Option<u64>,
    pub max_upload_mb: Option<u64>,
    /// Cap on the unpacked size of an uploaded merge package
    pub max_unpacked_mb: Option<u64>,
    /// Path to a BERT `tokenizer.json`
    pub bert_tokenizer: Option<PathBuf>,
    /// Path to a GPT-2 `tokenizer.json`
    pub gpt_tokenizer: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load from an explicit path or the platform default location
    ///
    /// Falls back to defaults (with a warning) when the file is missing or invalid.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => {
                    tracing::warn!("Could not determine config directory, using defaults");
                    return Self::default();
                }
            },
        };

        if !path.exists() {
            if explicit.is_some() {
                tracing::warn!("Config file {} not found, using defaults", path.display());
            } else {
                tracing::debug!("No config file at {}, using defaults", path.display());
            }
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }
}

/// `~/.config/tubeset/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tubeset").join("config.toml"))
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub http_timeout_secs: u64,
    pub request_interval_ms: u64,
    pub max_playlist_pages: usize,
    pub max_download_mb: u64,
    pub max_upload_mb: u64,
    pub max_unpacked_mb: u64,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind_address: "127.0.0.1:5740".to_string(),
            http_timeout_secs: 30,
            request_interval_ms: 250,
            max_playlist_pages: 20,
            max_download_mb: 1024,
            max_upload_mb: 512,
            max_unpacked_mb: 4096,
            log_level: "info".to_string(),
        }
    }
}

/// OS-dependent default data root
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tubeset"))
        .unwrap_or_else(|| PathBuf::from("./tubeset_data"))
}

/// Resolves the data root: CLI → ENV → TOML → default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_value: toml.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            tracing::debug!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                tracing::debug!("Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            tracing::debug!("Root folder from TOML: {}", path.display());
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Data root layout: `database/`, `recyclebin/`, `uploads/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the data root if missing
    ///
    /// Only the root is created; the store itself appears on first ingest or merge.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            Error::Config(format!(
                "Cannot create root folder {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.root.join(STORE_DIR)
    }

    pub fn holding_path(&self) -> PathBuf {
        self.root.join(HOLDING_DIR)
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }
}

/// Fully resolved settings for the app
#[derive(Debug, Clone)]
pub struct Settings {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub http_timeout_secs: u64,
    pub request_interval_ms: u64,
    pub max_playlist_pages: usize,
    pub max_download_mb: u64,
    pub max_upload_mb: u64,
    pub max_unpacked_mb: u64,
    pub bert_tokenizer: Option<PathBuf>,
    pub gpt_tokenizer: Option<PathBuf>,
    pub log_level: String,
}

impl Settings {
    /// Merge CLI overrides, environment, TOML and compiled defaults
    pub fn resolve(
        cli_root: Option<PathBuf>,
        cli_bind: Option<String>,
        toml: &TomlConfig,
    ) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let root_folder = RootFolderResolver::new(cli_root, toml).resolve();

        let bind_address = cli_bind
            .or_else(|| std::env::var(BIND_ENV).ok().filter(|v| !v.trim().is_empty()))
            .or_else(|| toml.bind_address.clone())
            .unwrap_or(defaults.bind_address);

        Self {
            root_folder,
            bind_address,
            http_timeout_secs: toml.http_timeout_secs.unwrap_or(defaults.http_timeout_secs),
            request_interval_ms: toml.request_interval_ms.unwrap_or(defaults.request_interval_ms),
            max_playlist_pages: toml.max_playlist_pages.unwrap_or(defaults.max_playlist_pages),
            max_download_mb: toml.max_download_mb.unwrap_or(defaults.max_download_mb),
            max_upload_mb: toml.max_upload_mb.unwrap_or(defaults.max_upload_mb),
            max_unpacked_mb: toml.max_unpacked_mb.unwrap_or(defaults.max_unpacked_mb),
            bert_tokenizer: toml.bert_tokenizer.clone(),
            gpt_tokenizer: toml.gpt_tokenizer.clone(),
            log_level: toml.logging.level.clone(),
        }
    }
}
