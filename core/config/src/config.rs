//! Configuration snapshot and its persisted JSON form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

use crate::secret::generate_token_secret;
use muxd_auth::{BLAKE2B_MAC_SUITE, MAX_TOKEN_TTL_SECS};
use muxd_common::{Error, Result, SecretString};

/// Port used when neither the command line nor the wizard picks one.
pub const DEFAULT_PORT: u16 = 8080;

/// File name used when no configuration path is given.
pub const DEFAULT_CONFIG_NAME: &str = "config.json";

/// The only token cipher suite the daemon can sign with.
pub const DEFAULT_TOKEN_CIPHER_SUITE: &str = BLAKE2B_MAC_SUITE;

const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Logging verbosity on the 0..=5 scale used by the command line.
///
/// 0 = panic, 1 = fatal, 2 = error, 3 = warning, 4 = info, 5 = debug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LogLevel(u8);

impl LogLevel {
    pub const MAX: u8 = 5;

    /// Create a log level.
    ///
    /// # Errors
    /// - Level above 5
    pub fn new(level: u8) -> Result<Self> {
        if level > Self::MAX {
            return Err(Error::InvalidInput(format!(
                "Log level must be between 0 and {}, got {}",
                Self::MAX,
                level
            )));
        }
        Ok(Self(level))
    }

    /// Numeric value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Map onto a tracing filter. Panic and fatal collapse into ERROR.
    pub fn level_filter(&self) -> LevelFilter {
        match self.0 {
            0..=2 => LevelFilter::ERROR,
            3 => LevelFilter::WARN,
            4 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogLevel> for u8 {
    fn from(level: LogLevel) -> Self {
        level.0
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::InvalidInput(format!(
                "Unknown log format '{}', expected 'text' or 'json'",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Read-only configuration snapshot.
///
/// Loaded once at startup and shared behind an `Arc`; nothing mutates it
/// after [`Config::load`] returns. Keys are PascalCase on disk, and a file
/// carrying only `Port`, `TokenSecret` and `TokenCipherSuite` is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Listening port.
    pub port: u16,
    /// Secret used to sign bearer tokens.
    pub token_secret: SecretString,
    /// Signing algorithm identifier.
    pub token_cipher_suite: String,
    /// Lifetime of issued tokens, in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// Root directory of the `local` storage provider.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    /// Credentials file of the `json` auth provider.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_token_ttl() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("users.json")
}

impl Config {
    /// Create a fresh configuration with a newly generated token secret.
    pub fn generate(port: u16) -> Self {
        Self {
            port,
            token_secret: SecretString::new(generate_token_secret()),
            token_cipher_suite: DEFAULT_TOKEN_CIPHER_SUITE.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            storage_root: default_storage_root(),
            credentials_file: default_credentials_file(),
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
        }
    }

    /// Check the snapshot for values the daemon cannot run with.
    ///
    /// # Errors
    /// - Port is zero
    /// - Token secret or cipher suite is empty
    /// - Token lifetime is zero or longer than ten years
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("Port must not be 0".to_string()));
        }
        if self.token_secret.is_empty() {
            return Err(Error::Config("TokenSecret must not be empty".to_string()));
        }
        if self.token_cipher_suite.is_empty() {
            return Err(Error::Config(
                "TokenCipherSuite must not be empty".to_string(),
            ));
        }
        if self.token_ttl_secs == 0 {
            return Err(Error::Config("TokenTtlSecs must not be 0".to_string()));
        }
        if self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(Error::Config(format!(
                "TokenTtlSecs must not exceed {}",
                MAX_TOKEN_TTL_SECS
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration file.
    ///
    /// Relative `StorageRoot` and `CredentialsFile` entries are resolved
    /// against the directory holding the file.
    ///
    /// # Errors
    /// - File cannot be read
    /// - Content is not a valid configuration
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await.map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let mut config: Config = serde_json::from_slice(&raw).map_err(|e| {
            Error::Config(format!("Cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.storage_root = resolve(base, &config.storage_root);
        config.credentials_file = resolve(base, &config.credentials_file);

        tracing::debug!(path = %path.display(), port = config.port, "configuration loaded");
        Ok(config)
    }

    /// Persist the configuration as pretty-printed JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Apply command-line overrides; `None` keeps the file's value.
    pub fn with_overrides(
        mut self,
        port: Option<u16>,
        log_level: Option<LogLevel>,
        log_format: Option<LogFormat>,
    ) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
        if let Some(format) = log_format {
            self.log_format = format;
        }
        self
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
