//! Configuration module for environment variable parsing.
//!
//! Everything except the search filter (a positional argument) comes from
//! the environment. Only the webhook URL is required.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;
use url::Url;

use crate::error::ConfigError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Incoming-webhook URL notifications are posted to
    pub webhook_url: Url,

    /// Display name sent as the `username` of each notification
    pub notify_username: String,

    /// Flat file holding the last processed time
    pub watermark_path: PathBuf,

    /// How far back the first run looks when no watermark exists yet
    pub lookback_hours: u32,

    /// Cached OAuth token JSON for the mailbox API
    pub token_path: PathBuf,

    /// Base URL of the Gmail REST API
    pub gmail_api_base: Url,

    /// Mailbox user id ("me" is the authorized user)
    pub gmail_user_id: String,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let webhook_url = lookup("NOTIFY_WEBHOOK_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("NOTIFY_WEBHOOK_URL".to_string()))?;

        let gmail_api_base = lookup("GMAIL_API_BASE")
            .unwrap_or_else(|| "https://gmail.googleapis.com".to_string());

        Ok(Config {
            webhook_url: parse_http_url("NOTIFY_WEBHOOK_URL", &webhook_url)?,

            notify_username: lookup("NOTIFY_USERNAME").unwrap_or_else(|| "YAMATO".to_string()),

            watermark_path: lookup("WATERMARK_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("time.txt")),

            lookback_hours: parse_number("WATERMARK_LOOKBACK_HOURS", lookup("WATERMARK_LOOKBACK_HOURS"), 200),

            token_path: lookup("GMAIL_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("token.json")),

            gmail_api_base: parse_http_url("GMAIL_API_BASE", &gmail_api_base)?,

            gmail_user_id: lookup("GMAIL_USER_ID").unwrap_or_else(|| "me".to_string()),

            request_timeout_ms: parse_number("REQUEST_TIMEOUT_MS", lookup("REQUEST_TIMEOUT_MS"), 8000),
        })
    }
}

/// Parse a numeric setting, falling back to the default on bad input.
fn parse_number<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy,
{
    let raw = match raw {
        Some(v) => v,
        None => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}

/// Parse an absolute http(s) URL.
fn parse_http_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        key: name.to_string(),
        message: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidValue {
            key: name.to_string(),
            message: format!("unsupported scheme {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[("NOTIFY_WEBHOOK_URL", "https://hooks.example.com/T/B/x")]))
                .unwrap();

        assert_eq!(config.webhook_url.as_str(), "https://hooks.example.com/T/B/x");
        assert_eq!(config.notify_username, "YAMATO");
        assert_eq!(config.watermark_path, PathBuf::from("time.txt"));
        assert_eq!(config.lookback_hours, 200);
        assert_eq!(config.token_path, PathBuf::from("token.json"));
        assert_eq!(config.gmail_api_base.as_str(), "https://gmail.googleapis.com/");
        assert_eq!(config.gmail_user_id, "me");
        assert_eq!(config.request_timeout_ms, 8000);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("NOTIFY_WEBHOOK_URL", "http://localhost:9000/hook"),
            ("NOTIFY_USERNAME", "parcels"),
            ("WATERMARK_PATH", "/var/lib/poller/time.txt"),
            ("WATERMARK_LOOKBACK_HOURS", "48"),
            ("REQUEST_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.notify_username, "parcels");
        assert_eq!(config.watermark_path, PathBuf::from("/var/lib/poller/time.txt"));
        assert_eq!(config.lookback_hours, 48);
        assert_eq!(config.request_timeout_ms, 1500);
    }

    #[test]
    fn test_missing_webhook_url() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "NOTIFY_WEBHOOK_URL"));
    }

    #[test]
    fn test_invalid_webhook_url() {
        let err = Config::from_lookup(lookup_from(&[("NOTIFY_WEBHOOK_URL", "ftp://example.com")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = Config::from_lookup(lookup_from(&[("NOTIFY_WEBHOOK_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_number_falls_back() {
        assert_eq!(parse_number("X", Some("abc".to_string()), 7u32), 7);
        assert_eq!(parse_number("X", Some(" 12 ".to_string()), 7u32), 12);
        assert_eq!(parse_number("X", None, 7u32), 7);
    }
}
