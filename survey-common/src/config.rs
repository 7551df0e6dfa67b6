//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from four places, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default
//!
//! A missing TOML file is never fatal: the service logs a note and starts
//! with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SURVEY_ROOT_FOLDER";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "survey.db";

/// Line-delimited export artifact file name inside the root folder
pub const EXPORT_FILE_NAME: &str = "responses.ndjson";

/// Built-in defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub port: u16,
    pub bind: String,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            log_level: default_log_level(),
        }
    }
}

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional so partial files stay valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding `survey.db` and the export artifact
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP port
    #[serde(default)]
    pub port: Option<u16>,

    /// Bind address (e.g. "127.0.0.1")
    #[serde(default)]
    pub bind: Option<String>,

    /// Directory with the questionnaire frontend (survey.html and assets)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub recommender: RecommenderConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
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

/// External recommendation process settings
///
/// The process is invoked as `<program> <args...> --file <artifact> --limit <top>`
/// and must print exactly one JSON document on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    #[serde(default = "default_recommender_program")]
    pub program: String,

    #[serde(default = "default_recommender_args")]
    pub args: Vec<String>,

    /// Hard ceiling on how long the process may run
    #[serde(default = "default_recommender_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum records written to the regenerated artifact
    #[serde(default = "default_recommender_export_limit")]
    pub export_limit: i64,

    /// Result-count hint passed as `--limit`
    #[serde(default = "default_recommender_top")]
    pub top: u32,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            program: default_recommender_program(),
            args: default_recommender_args(),
            timeout_secs: default_recommender_timeout_secs(),
            export_limit: default_recommender_export_limit(),
            top: default_recommender_top(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_recommender_program() -> String {
    "python3".to_string()
}

fn default_recommender_args() -> Vec<String> {
    vec!["backend/gemini.py".to_string()]
}

fn default_recommender_timeout_secs() -> u64 {
    30
}

fn default_recommender_export_limit() -> i64 {
    500
}

fn default_recommender_top() -> u32 {
    1
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the explicit config file, or fall back to the per-module default
    /// location
    ///
    /// An explicit path that cannot be read is an error. A missing default
    /// file yields `TomlConfig::default()`.
    pub fn load_or_default(explicit: Option<&Path>, module_name: &str) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match config_file_path(module_name) {
            Some(path) if path.exists() => {
                info!("Loading config file: {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                info!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

/// Default config file location: `<config dir>/survey/<module>.toml`
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("survey").join(format!("{}.toml", module_name)))
}

/// Resolves the root folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn with_toml_root(mut self, toml_root: Option<PathBuf>) -> Self {
        self.toml_root = toml_root;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, "Root folder from config file");
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the resolved root folder and names the files kept inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder (and parents) if missing. Idempotent.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn export_path(&self) -> PathBuf {
        self.root_folder.join(EXPORT_FILE_NAME)
    }
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("survey"))
        .unwrap_or_else(|| PathBuf::from("./survey_data"))
}
