//! Configuration loader and validator for the barcode scanner client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::auth::{StaticToken, SupabaseAuth, TokenProvider};
use crate::backend::{self, BackendClient};
use crate::lookup::{RetryPolicy, DEFAULT_MAX_RETRIES};

pub const ACCESS_TOKEN_ENV: &str = "FOODSCAN_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    pub backend: Backend,
    pub auth: Auth,
}

/// Retry settings for barcode lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

/// Food backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backend {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Session credentials. Either a ready-made `access_token` or a Supabase
/// email/password sign-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Auth {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_timeout_seconds() -> u64 {
    15
}

impl Default for App {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn filled(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Auth {
    fn has_static_token(&self) -> bool {
        filled(&self.access_token).is_some()
    }

    fn has_supabase(&self) -> bool {
        filled(&self.supabase_url).is_some()
            && filled(&self.anon_key).is_some()
            && filled(&self.email).is_some()
            && filled(&self.password).is_some()
    }
}

impl Config {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.app.max_retries,
            base_delay: Duration::from_millis(self.app.retry_base_delay_ms),
        }
    }

    /// Replace the static token with `$FOODSCAN_ACCESS_TOKEN` when it is set.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.auth.access_token = Some(token);
            }
        }
    }

    /// Static token wins over Supabase sign-in when both are configured.
    pub fn token_provider(
        &self,
        http: reqwest::Client,
    ) -> Result<Arc<dyn TokenProvider>, ConfigError> {
        if let Some(token) = filled(&self.auth.access_token) {
            return Ok(Arc::new(StaticToken::new(token)));
        }
        match (
            filled(&self.auth.supabase_url),
            filled(&self.auth.anon_key),
            filled(&self.auth.email),
            filled(&self.auth.password),
        ) {
            (Some(url), Some(key), Some(email), Some(password)) => {
                let url = parse_base_url(url)
                    .ok_or(ConfigError::Invalid("auth.supabase_url must be a valid URL"))?;
                Ok(Arc::new(SupabaseAuth::new(
                    http,
                    url,
                    key.to_string(),
                    email.to_string(),
                    password.to_string(),
                )))
            }
            _ => Err(ConfigError::Invalid(
                "auth needs access_token or supabase_url, anon_key, email and password",
            )),
        }
    }

    pub fn backend_client(&self) -> Result<BackendClient, ConfigError> {
        let base_url = parse_base_url(&self.backend.base_url)
            .ok_or(ConfigError::Invalid("backend.base_url must be a valid URL"))?;
        let http = backend::http_client(Duration::from_secs(self.backend.timeout_seconds));
        let auth = self.token_provider(http.clone())?;
        Ok(BackendClient::new(http, base_url, auth))
    }
}

/// Parse a base URL, forcing a trailing slash so relative joins append.
fn parse_base_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&with_slash).ok()
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.retry_base_delay_ms == 0 {
        return Err(ConfigError::Invalid("app.retry_base_delay_ms must be > 0"));
    }

    if cfg.backend.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.base_url must be non-empty"));
    }
    if parse_base_url(&cfg.backend.base_url).is_none() {
        return Err(ConfigError::Invalid("backend.base_url must be a valid URL"));
    }
    if cfg.backend.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("backend.timeout_seconds must be > 0"));
    }

    if !cfg.auth.has_static_token() && !cfg.auth.has_supabase() {
        return Err(ConfigError::Invalid(
            "auth needs access_token or supabase_url, anon_key, email and password",
        ));
    }
    if let Some(url) = filled(&cfg.auth.supabase_url) {
        if parse_base_url(url).is_none() {
            return Err(ConfigError::Invalid("auth.supabase_url must be a valid URL"));
        }
    }

    Ok(())
}

/// Example configuration printed by `foodscan example-config`.
pub fn example() -> &'static str {
    r#"app:
  max_retries: 2
  retry_base_delay_ms: 1000

backend:
  base_url: "https://api.example.com/api"
  timeout_seconds: 15

auth:
  supabase_url: "https://YOUR_PROJECT.supabase.co"
  anon_key: "YOUR_SUPABASE_ANON_KEY"
  email: "you@example.com"
  password: "YOUR_PASSWORD"
"#
}
