//! Environment-driven configuration
//!
//! `AppConfig::from_env` reads the process environment (after `.env` has been
//! loaded by `main`). Parsing goes through a lookup function so it can be
//! exercised without touching the real environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::device_client;
use crate::services::inference_client;
use crate::services::lifecycle::{DEFAULT_HISTORY_LIMIT, LifecycleSettings, StopConfirmationPolicy};

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 3000);
const DEFAULT_DEVICE_BASE_URL: &str = "http://192.168.1.100";
const DEFAULT_INFERENCE_BASE_URL: &str = "http://raspberrypi.local:5000";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value {value:?} for {name}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// How the backend talks to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceMode {
    #[default]
    Http,
    /// In-process simulator, for running without hardware
    Simulated,
}

impl FromStr for DeviceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(DeviceMode::Http),
            "simulated" | "sim" => Ok(DeviceMode::Simulated),
            _ => Err("expected http or simulated".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub mode: DeviceMode,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Without a database the service keeps operations in memory
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub device: DeviceConfig,
    pub inference: InferenceConfig,
    pub lifecycle: LifecycleSettings,
    /// Empty means any origin
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        Ok(Self {
            bind_addr: env.parse_or("BIND_ADDR", SocketAddr::from(DEFAULT_BIND_ADDR))?,
            database_url: env.text("DATABASE_URL"),
            run_migrations: env.flag("RUN_MIGRATIONS", true)?,
            device: DeviceConfig {
                mode: env.parse_or("DEVICE_MODE", DeviceMode::Http)?,
                base_url: env
                    .text("DEVICE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_DEVICE_BASE_URL.to_string()),
                timeout: Duration::from_secs(
                    env.parse_or("DEVICE_TIMEOUT_SECS", device_client::DEFAULT_TIMEOUT_SECS)?,
                ),
            },
            inference: InferenceConfig {
                base_url: env
                    .text("INFERENCE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_INFERENCE_BASE_URL.to_string()),
                timeout: Duration::from_secs(
                    env.parse_or("INFERENCE_TIMEOUT_SECS", inference_client::DEFAULT_TIMEOUT_SECS)?,
                ),
                max_retries: env
                    .parse_or("INFERENCE_MAX_RETRIES", inference_client::DEFAULT_MAX_RETRIES)?,
                retry_delay: Duration::from_secs(env.parse_or(
                    "INFERENCE_RETRY_DELAY_SECS",
                    inference_client::DEFAULT_RETRY_DELAY_SECS,
                )?),
            },
            lifecycle: LifecycleSettings {
                history_limit: env.parse_or("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
                stop_policy: env
                    .parse_or("STOP_CONFIRMATION_POLICY", StopConfirmationPolicy::FailOpen)?,
            },
            cors_allowed_origins: env
                .text("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-blank value of `name`
    fn text(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        match self.text(name) {
            None => Ok(default),
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.text(name) {
            None => Ok(default),
            Some(raw) => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError {
                    name,
                    value: raw,
                    reason: "expected a boolean".to_string(),
                }),
            },
        }
    }
}
