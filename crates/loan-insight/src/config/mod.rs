use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SCORING_URL: &str = "http://localhost:5000";
const DEFAULT_SCORING_TIMEOUT_SECS: u64 = 60;

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

/// Top-level configuration for the analysis worker.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let base_url = env::var("ML_BASE_URL").unwrap_or_else(|_| DEFAULT_SCORING_URL.to_string());
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidScoringUrl { value: base_url });
        }

        let timeout_secs = env::var("ML_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_SCORING_TIMEOUT_SECS.to_string())
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let include_raw_text = parse_flag("ML_INCLUDE_RAW_TEXT", false)?;
        let attach_heatmaps = parse_flag("ATTACH_HEATMAPS", true)?;

        let root = env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage".to_string());
        let pdftotext_bin = env::var("PDFTOTEXT_BIN").unwrap_or_else(|_| "pdftotext".to_string());

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
                include_raw_text,
            },
            storage: StorageConfig {
                root: PathBuf::from(root),
                pdftotext_bin,
                attach_heatmaps,
            },
        })
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name, value: raw }),
        },
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Remote scoring service settings.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub include_raw_text: bool,
}

/// Where storage references resolve locally and how text is pulled out of them.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub pdftotext_bin: String,
    pub attach_heatmaps: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidScoringUrl { value: String },
    InvalidTimeout,
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidScoringUrl { value } => {
                write!(f, "ML_BASE_URL must be an http(s) URL, got '{}'", value)
            }
            ConfigError::InvalidTimeout => {
                write!(f, "ML_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{} must be a boolean flag, got '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
