//! Server settings read from the environment.
//!
//! # Environment Variables
//!
//! - `API_HOST` / `API_PORT`: bind address (default: `0.0.0.0:8080`)
//! - `GITHUB_APP_ID`: GitHub App id (required)
//! - `GITHUB_APP_PRIVATE_KEY` or `GITHUB_APP_PRIVATE_KEY_PATH`: PEM encoded app key
//! - `GITHUB_API_URL`: API base URL for GitHub Enterprise
//! - `GITHUB_WEBHOOK_SECRET`: webhook secret; signatures are not checked when unset
//! - `BULLDOZER_CONFIG_PATH`: policy file path inside repositories (default: `.bulldozer.yml`)
//! - `BULLDOZER_DEFAULT_CONFIG_PATH`: local fallback policy file
//! - `BULLDOZER_PUSH_RESTRICTION_TOKEN`: token used to merge into push-restricted branches
//! - `BULLDOZER_MAX_CONCURRENT_EVENTS`: notifications processed at once (default: 32)
//! - `BULLDOZER_REFRESH_ON_START`: sweep all pull requests at startup (default: true)
//! - `LOG_FORMAT`: `json` for JSON logs, anything else for text

use bulldozer_core::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;
use thiserror::Error;

use crate::DEFAULT_PORT;

/// Default bound on concurrently processed notifications.
pub const DEFAULT_MAX_CONCURRENT_EVENTS: usize = 32;

/// Errors raised while reading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to read private key from {path}: {reason}")]
    KeyFile { path: String, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub app_id: u64,
    pub private_key: String,
    pub github_api_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub config_path: String,
    pub default_config_path: Option<PathBuf>,
    pub push_restriction_token: Option<String>,
    pub max_concurrent_events: usize,
    pub refresh_on_start: bool,
    pub log_format: LogFormat,
}

impl ServerSettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get("API_PORT") {
            Some(value) => parse_number("API_PORT", &value)?,
            None => DEFAULT_PORT,
        };

        let app_id = get("GITHUB_APP_ID").ok_or(SettingsError::Missing("GITHUB_APP_ID"))?;
        let app_id = parse_number("GITHUB_APP_ID", &app_id)?;

        let private_key = match (get("GITHUB_APP_PRIVATE_KEY"), get("GITHUB_APP_PRIVATE_KEY_PATH")) {
            (Some(key), _) => key,
            (None, Some(path)) => {
                std::fs::read_to_string(&path).map_err(|e| SettingsError::KeyFile {
                    path,
                    reason: e.to_string(),
                })?
            }
            (None, None) => return Err(SettingsError::Missing("GITHUB_APP_PRIVATE_KEY")),
        };

        let github_api_url = get("GITHUB_API_URL");
        if let Some(value) = &github_api_url {
            url::Url::parse(value).map_err(|e| SettingsError::Invalid {
                name: "GITHUB_API_URL",
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }

        let max_concurrent_events = match get("BULLDOZER_MAX_CONCURRENT_EVENTS") {
            Some(value) => parse_number("BULLDOZER_MAX_CONCURRENT_EVENTS", &value)?,
            None => DEFAULT_MAX_CONCURRENT_EVENTS,
        };

        let refresh_on_start = match get("BULLDOZER_REFRESH_ON_START") {
            Some(value) => parse_flag("BULLDOZER_REFRESH_ON_START", &value)?,
            None => true,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            app_id,
            private_key,
            github_api_url,
            webhook_secret: get("GITHUB_WEBHOOK_SECRET"),
            config_path: get("BULLDOZER_CONFIG_PATH")
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
            default_config_path: get("BULLDOZER_DEFAULT_CONFIG_PATH").map(PathBuf::from),
            push_restriction_token: get("BULLDOZER_PUSH_RESTRICTION_TOKEN"),
            max_concurrent_events,
            refresh_on_start,
            log_format,
        })
    }
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| SettingsError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::Invalid {
            name,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
