//! Gateway client configuration
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Main gateway client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub app: AppSettings,
    pub identify: IdentifySettings,
    #[serde(default)]
    pub heartbeat_mode: HeartbeatMode,
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(ConfigError::InvalidValue("APP_ENV", other.to_string())),
        }
    }
}

/// Parameters sent with a fresh Identify handshake (and reused for Resume)
#[derive(Clone, Deserialize)]
pub struct IdentifySettings {
    pub token: String,
    #[serde(default)]
    pub intents: u64,
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

impl fmt::Debug for IdentifySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifySettings")
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("client_name", &self.client_name)
            .finish()
    }
}

/// How heartbeats are scheduled after the hello handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatMode {
    /// Sleep the interval after each completed send; send latency accumulates
    #[default]
    Drift,
    /// Tick on a fixed wall-clock schedule
    FixedRate,
    /// No timer; each heartbeat ACK schedules the next heartbeat
    Triggered,
}

impl HeartbeatMode {
    /// Whether this mode runs a dedicated timer task
    #[must_use]
    pub fn uses_timer(self) -> bool {
        !matches!(self, Self::Triggered)
    }
}

impl FromStr for HeartbeatMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drift" => Ok(Self::Drift),
            "fixed_rate" | "fixed-rate" => Ok(Self::FixedRate),
            "triggered" => Ok(Self::Triggered),
            other => Err(ConfigError::InvalidValue(
                "GATEWAY_HEARTBEAT_MODE",
                other.to_string(),
            )),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "pulse".to_string()
}

fn default_client_name() -> String {
    "pulse".to_string()
}

fn default_outbound_buffer() -> usize {
    100
}

impl GatewayConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .map(|s| s.parse::<Environment>())
                    .transpose()?
                    .unwrap_or_default(),
            },
            identify: IdentifySettings {
                token: lookup("GATEWAY_TOKEN")
                    .filter(|s| !s.trim().is_empty())
                    .ok_or(ConfigError::MissingVar("GATEWAY_TOKEN"))?,
                intents: parse_var::<_, u64>(&lookup, "GATEWAY_INTENTS")?.unwrap_or(0),
                client_name: lookup("GATEWAY_CLIENT_NAME").unwrap_or_else(default_client_name),
            },
            heartbeat_mode: lookup("GATEWAY_HEARTBEAT_MODE")
                .map(|s| s.parse::<HeartbeatMode>())
                .transpose()?
                .unwrap_or_default(),
            outbound_buffer: parse_var::<_, usize>(&lookup, "GATEWAY_OUTBOUND_BUFFER")?
                .filter(|size| *size > 0)
                .unwrap_or_else(default_outbound_buffer),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key, raw.clone()))
        })
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
