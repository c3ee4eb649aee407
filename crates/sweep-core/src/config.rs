//! Configuration management for permit-sweep.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::CandidateRange;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main application configuration.
///
/// This is loaded from `~/.config/permit-sweep/config.toml` (or platform
/// equivalent) unless an explicit path is given. If the default file doesn't
/// exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Identifier range to enumerate
    pub range: RangeConfig,
    /// One-time known-good lookup performed before the sweep
    pub validation: ValidationConfig,
    /// Remote lookup service settings
    pub lookup: LookupConfig,
    /// Durable storage settings
    pub storage: StorageConfig,
    /// Where access tokens come from
    pub tokens: TokenSourceConfig,
    /// Optional on-disk artifacts
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to
    /// defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `SWEEP_DATABASE_PATH`: Override the database file location
    /// - `SWEEP_RANGE_START` / `SWEEP_RANGE_END`: Override range bounds
    /// - `SWEEP_VALIDATION_ID`: Override the known-good validation id
    /// - `SWEEP_TOKEN_SOURCE`: `stdin`, `file` or `tcp`
    /// - `SWEEP_TOKEN_PATH`: Path for the `file` token source
    /// - `SWEEP_TOKEN_LISTEN`: Listen address for the `tcp` token source
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    ///
    /// Numeric overrides that fail to parse are rejected rather than ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SWEEP_DATABASE_PATH") {
            tracing::debug!("Override storage.database_path from env: {}", val);
            self.storage.database_path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("SWEEP_RANGE_START") {
            self.range.start = val
                .parse()
                .map_err(|e| ConfigError::invalid("SWEEP_RANGE_START", format!("{e}")))?;
            tracing::debug!("Override range.start from env: {}", self.range.start);
        }

        if let Some(val) = lookup("SWEEP_RANGE_END") {
            self.range.end = val
                .parse()
                .map_err(|e| ConfigError::invalid("SWEEP_RANGE_END", format!("{e}")))?;
            tracing::debug!("Override range.end from env: {}", self.range.end);
        }

        if let Some(val) = lookup("SWEEP_VALIDATION_ID") {
            tracing::debug!("Override validation.known_good_id from env: {}", val);
            self.validation.known_good_id = val;
        }

        if let Some(val) = lookup("SWEEP_TOKEN_SOURCE") {
            self.tokens.source = val.parse()?;
            tracing::debug!("Override tokens.source from env: {:?}", self.tokens.source);
        }

        if let Some(val) = lookup("SWEEP_TOKEN_PATH") {
            self.tokens.path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("SWEEP_TOKEN_LISTEN") {
            self.tokens.listen_addr = val;
        }

        Ok(())
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        let range = CandidateRange::from_config(&self.range)?;

        range
            .parse(&self.validation.known_good_id)
            .map_err(|e| ConfigError::invalid("validation.known_good_id", e.to_string()))?;

        if self.tokens.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "tokens.queue_capacity",
                "must be at least 1",
            ));
        }

        if self.tokens.source == TokenSourceKind::File && self.tokens.path.is_none() {
            return Err(ConfigError::invalid(
                "tokens.path",
                "required when tokens.source = \"file\"",
            ));
        }

        if self.lookup.timeout_secs == 0 {
            return Err(ConfigError::invalid("lookup.timeout_secs", "must be at least 1"));
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| {
            ConfigError::invalid("config_path", "no parent directory")
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Resolved database path: the configured one, or the XDG data dir.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("permit-sweep.db")),
        }
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/permit-sweep/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/permit-sweep`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("org", "permit-sweep", "permit-sweep").ok_or(ConfigError::NoConfigDir)
}

/// Bounds and rendering of the identifier range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// Fixed prefix prepended to every identifier
    pub prefix: String,
    /// First number to try (inclusive)
    pub start: u64,
    /// Upper bound (exclusive)
    pub end: u64,
    /// Minimum digit count, zero-padded (0 = no padding)
    pub width: usize,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            prefix: "A".to_string(),
            start: 100_000,
            end: 151_000,
            width: 0,
        }
    }
}

/// Known-good lookup used to prove the service and tokens work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Identifier that is known to resolve to a record
    pub known_good_id: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            known_good_id: "A145869".to_string(),
        }
    }
}

/// Remote lookup service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Form endpoint receiving the search POST
    pub search_url: String,
    /// Origin prepended to relative detail links
    pub base_url: String,
    /// Form field carrying the candidate id
    pub permit_field: String,
    /// Form field carrying the access token
    pub token_field: String,
    /// Additional form fields sent with every search
    pub extra_fields: BTreeMap<String, String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// CSS selectors used to read search and detail pages
    pub selectors: SelectorConfig,
}

impl Default for LookupConfig {
    fn default() -> Self {
        let mut extra_fields = BTreeMap::new();
        extra_fields.insert("FirstName".to_string(), String::new());
        extra_fields.insert("LastName".to_string(), String::new());

        Self {
            search_url: "https://cpaquebec.ca/api/sitecore/FindACPA/FindACPAFormSubmit"
                .to_string(),
            base_url: "https://cpaquebec.ca".to_string(),
            permit_field: "PermitNumber".to_string(),
            token_field: "g-recaptcha-response".to_string(),
            extra_fields,
            timeout_secs: 30,
            user_agent: concat!("permit-sweep/", env!("CARGO_PKG_VERSION")).to_string(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// CSS selectors for the search result and detail pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Anchor linking a search hit to its detail page
    pub search_link: String,
    /// Record name on the detail page
    pub name: String,
    /// Company on the detail page
    pub company: String,
    /// Postal address on the detail page
    pub address: String,
    /// Elements holding `Label: value` pairs
    pub labelled_value: String,
    /// Label preceding the phone number
    pub phone_label: String,
    /// Label preceding the permit number
    pub permit_label: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            search_link: ".vcard li.fn a".to_string(),
            name: ".vcard h3".to_string(),
            company: ".vcard li strong".to_string(),
            address: ".vcard .street-address p".to_string(),
            labelled_value: ".vcard li p".to_string(),
            phone_label: "Phone:".to_string(),
            permit_label: "Public accountancy permit number:".to_string(),
        }
    }
}

/// Durable storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; defaults to the XDG data dir
    pub database_path: Option<PathBuf>,
}

/// Transport carrying externally produced tokens into the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSourceKind {
    /// One token per line on standard input
    #[default]
    Stdin,
    /// One token per line from a file or named pipe
    File,
    /// One token per line from any TCP client
    Tcp,
}

impl FromStr for TokenSourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdin" => Ok(Self::Stdin),
            "file" => Ok(Self::File),
            "tcp" => Ok(Self::Tcp),
            other => Err(ConfigError::invalid(
                "tokens.source",
                format!("expected stdin, file or tcp, got '{other}'"),
            )),
        }
    }
}

/// Token source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSourceConfig {
    /// Which transport to read tokens from
    pub source: TokenSourceKind,
    /// File or FIFO path for the `file` source
    pub path: Option<PathBuf>,
    /// Bind address for the `tcp` source
    pub listen_addr: String,
    /// Tokens buffered while an iteration is in flight
    pub queue_capacity: usize,
}

impl Default for TokenSourceConfig {
    fn default() -> Self {
        Self {
            source: TokenSourceKind::Stdin,
            path: None,
            listen_addr: "127.0.0.1:7878".to_string(),
            queue_capacity: 64,
        }
    }
}

/// Optional artifacts written next to the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one JSON file per discovered record
    pub json_dir: Option<PathBuf>,
    /// Directory receiving the body of failed search responses
    pub error_html_dir: Option<PathBuf>,
}
