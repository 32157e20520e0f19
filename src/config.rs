use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

/// Base URL used when `FLOW_BASE_URL` is unset (local flow backend behind the dev proxy).
pub const DEV_PROXY_BASE_URL: &str = "http://localhost:7860";

/// Per-attempt deadline when `FLOW_TIMEOUT_SECS` is unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 150;

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind host (e.g., 0.0.0.0)
    pub app_host: String,
    /// HTTP bind port (e.g., 8080)
    pub app_port: u16,

    pub flow: FlowConfig,
}

/// Everything the flow client needs. The required values stay optional here so
/// that a half-configured process can still start and report itself as unusable.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Flow backend base URL (e.g., http://localhost:7860)
    pub base_url: Option<Url>,
    /// Flow to execute on every turn
    pub flow_id: Option<String>,
    /// Sent as `x-api-key`
    pub api_key: Option<String>,
    /// Deadline for a single attempt; a retry gets a fresh one
    pub timeout: Duration,
    /// When set, the dev-proxy fallback counts as a configured base URL
    pub dev_mode: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL for {name}: {value}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("Invalid number for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("Invalid bool for {name}: {value}")]
    InvalidBool { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env if present
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let app_host = get("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let app_port = parse_or_default::<u16>("APP_PORT", get("APP_PORT"), 8080)?;

        let base_url = get("FLOW_BASE_URL")
            .map(|raw| parse_base_url("FLOW_BASE_URL", raw))
            .transpose()?;
        let timeout_secs =
            parse_or_default::<u64>("FLOW_TIMEOUT_SECS", get("FLOW_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)?;
        let dev_mode = parse_bool_or_default("FLOW_DEV_MODE", get("FLOW_DEV_MODE"), false)?;

        Ok(Self {
            app_host,
            app_port,
            flow: FlowConfig {
                base_url,
                flow_id: get("FLOW_ID"),
                api_key: get("FLOW_API_KEY"),
                timeout: Duration::from_secs(timeout_secs),
                dev_mode,
            },
        })
    }

    /// `host:port` the HTTP surface listens on.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}

impl FlowConfig {
    /// Names of the required variables that are still missing.
    pub fn missing_vars(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.flow_id.is_none() {
            missing.push("FLOW_ID");
        }
        if self.api_key.is_none() {
            missing.push("FLOW_API_KEY");
        }
        missing
    }

    pub fn is_configured(&self) -> bool {
        (self.base_url.is_some() || self.dev_mode) && self.missing_vars().is_empty()
    }

    /// Configured base URL, or the dev proxy.
    pub fn base_url_or_dev_proxy(&self) -> Result<Url, ConfigError> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => parse_base_url("FLOW_BASE_URL", DEV_PROXY_BASE_URL.to_string()),
        }
    }
}

/* --------------------------- helpers --------------------------- */

fn parse_or_default<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            name: key,
            value: v,
        }),
        None => Ok(default),
    }
}

fn parse_bool_or_default(
    key: &'static str,
    raw: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match raw {
        Some(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Ok(true),
            "0" | "false" | "no" | "n" => Ok(false),
            _ => Err(ConfigError::InvalidBool { name: key, value: v }),
        },
        None => Ok(default),
    }
}

fn parse_base_url(key: &'static str, raw: String) -> Result<Url, ConfigError> {
    match Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => Ok(url),
        _ => Err(ConfigError::InvalidUrl {
            name: key,
            value: raw,
        }),
    }
}
