use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::report::DEFAULT_REPORT_TTL_SECS;
use crate::wizard::DEFAULT_PERSIST_DEBOUNCE;

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

/// Top-level configuration for the wizard service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub wizard: WizardConfig,
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

        let snapshot_dir = env::var("CCNE_SNAPSHOT_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let persist_debounce = match env::var("CCNE_PERSIST_DEBOUNCE_MS") {
            Ok(raw) => Duration::from_millis(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    variable: "CCNE_PERSIST_DEBOUNCE_MS",
                }
            })?),
            Err(_) => DEFAULT_PERSIST_DEBOUNCE,
        };
        let report_ttl = match env::var("CCNE_REPORT_TTL_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        variable: "CCNE_REPORT_TTL_SECS",
                    })
                }
            },
            Err(_) => Duration::from_secs(DEFAULT_REPORT_TTL_SECS),
        };
        let remote = RemoteReportConfig::from_env();

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            wizard: WizardConfig {
                snapshot_dir,
                persist_debounce,
                report_ttl,
                remote,
            },
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
}

/// Form persistence and report retention.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Directory for form snapshots; `None` keeps them in memory.
    pub snapshot_dir: Option<PathBuf>,
    pub persist_debounce: Duration,
    pub report_ttl: Duration,
    /// Remote document generator; `None` renders the local synopsis.
    pub remote: Option<RemoteReportConfig>,
}

/// Endpoint and bearer key for the remote report generator.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteReportConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl RemoteReportConfig {
    /// Reads `CEREBRAS_API_URL` and `CEREBRAS_API_KEY`; both must be non-blank.
    pub fn from_env() -> Option<Self> {
        let read = |variable: &str| {
            env::var(variable)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Some(Self {
            endpoint: read("CEREBRAS_API_URL")?,
            api_key: read("CEREBRAS_API_KEY")?,
        })
    }
}

impl fmt::Debug for RemoteReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteReportConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a positive whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
