use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://kaspi.kz/yml/offer-view/offers";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings for the product gateway, read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEnv {
    pub bind_host: String,
    pub port: u16,
    pub upstream_base_url: String,
    pub upstream_timeout_ms: u64,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u64,
    /// Map upstream failures to 404/502/504 instead of a flat 500.
    pub upstream_status_passthrough: bool,
}

impl Default for GatewayEnv {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            upstream_timeout_ms: 10_000,
            rate_limit_window_ms: 15 * 60 * 1000,
            rate_limit_max: 100,
            upstream_status_passthrough: false,
        }
    }
}

impl GatewayEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the settings from an arbitrary key lookup. Unset or empty keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BIND_HOST") {
            env.bind_host = v;
        }
        if let Some(v) = get("UPSTREAM_BASE_URL") {
            env.upstream_base_url = v.trim_end_matches('/').to_string();
        }
        env.port = parse_or("PORT", get("PORT"), env.port)?;
        env.upstream_timeout_ms = parse_or(
            "UPSTREAM_TIMEOUT_MS",
            get("UPSTREAM_TIMEOUT_MS"),
            env.upstream_timeout_ms,
        )?;
        env.rate_limit_window_ms = parse_or(
            "RATE_LIMIT_WINDOW_MS",
            get("RATE_LIMIT_WINDOW_MS"),
            env.rate_limit_window_ms,
        )?;
        env.rate_limit_max = parse_or("RATE_LIMIT_MAX", get("RATE_LIMIT_MAX"), env.rate_limit_max)?;
        if let Some(v) = get("UPSTREAM_STATUS_PASSTHROUGH") {
            env.upstream_status_passthrough = parse_flag("UPSTREAM_STATUS_PASSTHROUGH", &v)?;
        }

        if env.rate_limit_window_ms == 0 {
            return Err(ConfigError::Invalid { key: "RATE_LIMIT_WINDOW_MS", value: "0".into() });
        }
        Ok(env)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: raw.to_string() }),
    }
}
