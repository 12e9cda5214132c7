use crate::workflows::allocation::AllocationSettings;
use crate::workflows::sheets::TabNames;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "allocation_output";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub allocation: AllocationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                verbose: false,
            },
            allocation: AllocationConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Forces debug output regardless of `RUST_LOG` and `log_level`.
    pub verbose: bool,
}

/// Input tab names, the per-agent limit and the workbook location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationConfig {
    pub tabs: TabNames,
    pub max_per_agent: Option<NonZeroUsize>,
    pub output: PathBuf,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            tabs: TabNames::default(),
            max_per_agent: None,
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl AllocationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(tab) = non_empty_var("ALLOCATOR_CONTACTS_TAB") {
            config.tabs.contacts = tab;
        }
        if let Some(tab) = non_empty_var("ALLOCATOR_AGENTS_TAB") {
            config.tabs.agents = tab;
        }
        if let Some(tab) = non_empty_var("ALLOCATOR_PRIORITIES_TAB") {
            config.tabs.priorities = tab;
        }
        if let Some(limit) = non_empty_var("ALLOCATOR_MAX_PER_AGENT") {
            config.max_per_agent = Some(parse_limit(&limit)?);
        }
        if let Some(output) = non_empty_var("ALLOCATOR_OUTPUT") {
            config.output = PathBuf::from(output);
        }

        Ok(config)
    }

    /// Applies the values present in a JSON config file on top of the current
    /// ones.
    pub fn merge_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        if let Some(tab) = file.contacts_tab {
            self.tabs.contacts = tab;
        }
        if let Some(tab) = file.agents_tab {
            self.tabs.agents = tab;
        }
        if let Some(tab) = file.priorities_tab {
            self.tabs.priorities = tab;
        }
        if let Some(limit) = file.max_allocations_per_agent {
            self.max_per_agent = Some(parse_limit(&limit.to_string())?);
        }
        if let Some(output) = file.output {
            self.output = output;
        }
        Ok(())
    }

    pub fn settings(&self) -> AllocationSettings {
        AllocationSettings {
            max_per_agent: self.max_per_agent,
        }
    }
}

/// Optional JSON overrides passed with `--config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub contacts_tab: Option<String>,
    #[serde(default, alias = "spamurais_tab")]
    pub agents_tab: Option<String>,
    #[serde(default)]
    pub priorities_tab: Option<String>,
    #[serde(default, alias = "max_allocations_per_spamurai")]
    pub max_allocations_per_agent: Option<u64>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl ConfigFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::ConfigFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Parses a per-agent limit. Zero and non-numeric values are rejected.
pub fn parse_limit(value: &str) -> Result<NonZeroUsize, ConfigError> {
    value
        .trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| ConfigError::InvalidLimit {
            value: value.to_string(),
        })
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidLimit {
        value: String,
    },
    ConfigFile {
        path: PathBuf,
        source: std::io::Error,
    },
    ConfigFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLimit { value } => write!(
                f,
                "max allocations per agent must be a positive integer, got '{}'",
                value
            ),
            ConfigError::ConfigFile { path, .. } => {
                write!(f, "unable to read config file {}", path.display())
            }
            ConfigError::ConfigFormat { path, .. } => {
                write!(f, "config file {} is not valid JSON", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidLimit { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::ConfigFile { source, .. } => Some(source),
            ConfigError::ConfigFormat { source, .. } => Some(source),
        }
    }
}
