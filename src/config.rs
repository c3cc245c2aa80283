// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. A `.env` file is honored for local
//! development.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Fixed landing page for password reset links.
pub const PASSWORD_RESET_REDIRECT: &str = "https://qrush-reset-password.vercel.app/reset-password";

/// Deep-link scheme registered by the mobile apps.
pub const APP_LINK_SCHEME: &str = "qrush://";

/// Platform the client runs on. Decides the share strategy and export timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn is_web(self) -> bool {
        self == Platform::Web
    }

    /// Value sent in the `X-Client-Info` header.
    pub fn client_info(self) -> &'static str {
        if self.is_web() {
            "qrush-web"
        } else {
            "qrush-mobile"
        }
    }

    /// Symbol export is slower in the browser, so it gets a longer bound.
    pub fn default_export_timeout(self) -> Duration {
        if self.is_web() {
            Duration::from_secs(10)
        } else {
            Duration::from_secs(5)
        }
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "web" => Ok(Platform::Web),
            _ => Err(ConfigError::Invalid("QRUSH_PLATFORM", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend project (auth and REST live under it)
    pub backend_url: String,
    /// Public anon key sent as `apikey`
    pub backend_anon_key: String,
    pub platform: Platform,
    /// Web origin registered for deep links
    pub web_origin: String,
    pub password_reset_redirect: String,
    /// Upper bound for exporting a QR symbol to an image
    pub export_timeout: Duration,
    /// Attempts for persisting a record (including the first one)
    pub persist_max_attempts: u32,
    /// Fixed delay between persistence attempts
    pub persist_backoff: Duration,
    pub http_timeout: Duration,
    /// Override for the session cache file
    pub cache_path: Option<PathBuf>,
    /// Where the headless host saves downloaded QR images
    pub download_dir: PathBuf,
    /// Use the in-process backend instead of the network
    pub offline: bool,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            backend_anon_key: "test_anon_key".to_string(),
            platform: Platform::Android,
            web_origin: "https://qrush.app".to_string(),
            password_reset_redirect: PASSWORD_RESET_REDIRECT.to_string(),
            export_timeout: Duration::from_millis(200),
            persist_max_attempts: 3,
            persist_backoff: Duration::from_millis(1),
            http_timeout: Duration::from_secs(5),
            cache_path: None,
            download_dir: PathBuf::from("downloads"),
            offline: true,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let platform: Platform = match env::var("QRUSH_PLATFORM") {
            Ok(v) => v.parse()?,
            Err(_) => Platform::Android,
        };

        let export_timeout = match env::var("QRUSH_EXPORT_TIMEOUT_SECS") {
            Ok(v) => Duration::from_secs(parse_var("QRUSH_EXPORT_TIMEOUT_SECS", &v)?),
            Err(_) => platform.default_export_timeout(),
        };

        let persist_max_attempts: u32 = optional_var("QRUSH_PERSIST_MAX_ATTEMPTS", 3)?;
        if persist_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "QRUSH_PERSIST_MAX_ATTEMPTS",
                "0".to_string(),
            ));
        }

        Ok(Self {
            backend_url: env::var("QRUSH_BACKEND_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("QRUSH_BACKEND_URL"))?,
            backend_anon_key: env::var("QRUSH_BACKEND_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("QRUSH_BACKEND_ANON_KEY"))?,
            platform,
            web_origin: env::var("QRUSH_WEB_ORIGIN")
                .unwrap_or_else(|_| "https://qrush.app".to_string()),
            password_reset_redirect: env::var("QRUSH_PASSWORD_RESET_REDIRECT")
                .unwrap_or_else(|_| PASSWORD_RESET_REDIRECT.to_string()),
            export_timeout,
            persist_max_attempts,
            persist_backoff: Duration::from_millis(optional_var("QRUSH_PERSIST_BACKOFF_MS", 1000)?),
            http_timeout: Duration::from_secs(optional_var("QRUSH_HTTP_TIMEOUT_SECS", 30)?),
            cache_path: env::var("QRUSH_CACHE_PATH").ok().map(PathBuf::from),
            download_dir: env::var("QRUSH_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("downloads")),
            offline: env::var("QRUSH_OFFLINE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    /// URL prefixes the route table accepts for deep links.
    pub fn link_prefixes(&self) -> Vec<String> {
        vec![APP_LINK_SCHEME.to_string(), self.web_origin.clone()]
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(name, value.to_string()))
}

fn optional_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => parse_var(name, &v),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("QRUSH_BACKEND_URL", "https://example.supabase.co/");
        env::set_var("QRUSH_BACKEND_ANON_KEY", " anon ");
        env::set_var("QRUSH_PLATFORM", "web");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.backend_url, "https://example.supabase.co");
        assert_eq!(config.backend_anon_key, "anon");
        assert_eq!(config.platform, Platform::Web);
        assert_eq!(config.export_timeout, Duration::from_secs(10));
        assert_eq!(config.persist_max_attempts, 3);
        assert_eq!(config.persist_backoff, Duration::from_millis(1000));
        assert_eq!(config.password_reset_redirect, PASSWORD_RESET_REDIRECT);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("iOS".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("android".parse::<Platform>().unwrap(), Platform::Android);
        assert!("windows".parse::<Platform>().is_err());
        assert_eq!(Platform::Web.client_info(), "qrush-web");
        assert_eq!(Platform::Ios.client_info(), "qrush-mobile");
        assert_eq!(
            Platform::Ios.default_export_timeout(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_link_prefixes() {
        let config = Config::test_default();
        assert_eq!(
            config.link_prefixes(),
            vec!["qrush://".to_string(), "https://qrush.app".to_string()]
        );
    }
}
