//! Relay configuration.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` and can be changed with the `-f` flag or the `CHATRELAY_CONFIG`
//! environment variable. A missing file is not an error: every field has a default except the
//! provider API key.
//!
//! ## Loading Priority
//!
//! Sources are merged in this order (later sources override earlier ones):
//!
//! 1. **YAML config file** - base configuration (default: `config.yaml`)
//! 2. **Environment variables** - variables prefixed with `CHATRELAY_` override YAML values
//! 3. **`PORT` and `OPENAI_API_KEY`** - the conventional unprefixed variables map onto `port`
//!    and `provider.api_key`
//!
//! Nested values use double underscores, e.g. `CHATRELAY_PROVIDER__DEFAULT_MODEL=gpt-4o`.
//!
//! ## Example
//!
//! ```yaml
//! port: 3001
//! provider:
//!   base_url: https://api.openai.com/v1
//!   default_model: gpt-4o-mini
//!   request_timeout: 60s
//! uploads:
//!   dir: uploads
//!   max_file_size: 10485760
//! cors:
//!   allowed_origins: ["http://localhost:5173"]
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CHATRELAY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Root relay configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Upstream completion provider
    pub provider: ProviderConfig,
    /// Handling of uploaded files
    pub uploads: UploadConfig,
    /// Browser cross-origin settings; the chat UI is usually served from another origin
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Settings for the OpenAI-compatible completion provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the provider API; `/chat/completions` is appended
    pub base_url: Url,
    /// Bearer credential sent with every provider request
    pub api_key: Option<String>,
    /// Model used when a chat request names none, and always for file analysis
    pub default_model: String,
    /// System instruction placed before every user prompt
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-request timeout. Unset means the HTTP client's default behaviour.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
}

/// Settings for the `/api/upload` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Directory receiving the temporary upload artifacts (created on demand)
    pub dir: PathBuf,
    /// Maximum accepted upload size in bytes
    pub max_file_size: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://chat.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            provider: ProviderConfig::default(),
            uploads: UploadConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/v1").expect("default provider URL is valid"),
            api_key: None,
            default_model: "gpt-4o-mini".to_string(),
            system_prompt: "You are a helpful AI assistant.".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            request_timeout: None,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: None,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.provider.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => anyhow::bail!(
                "Config validation: provider API key is not configured. \
                 Set OPENAI_API_KEY, CHATRELAY_PROVIDER__API_KEY or provider.api_key in the config file."
            ),
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            anyhow::bail!(
                "Config validation: provider temperature ({}) must be between 0 and 2",
                self.provider.temperature
            );
        }

        if self.provider.max_tokens == 0 {
            anyhow::bail!("Config validation: provider max_tokens must be at least 1");
        }

        if self.uploads.max_file_size == 0 {
            anyhow::bail!("Config validation: uploads.max_file_size must be at least 1 byte");
        }

        if self.cors.allowed_origins.is_empty() {
            anyhow::bail!("Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.");
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Prefixed environment variables override file values; the config path itself is not a field
            .merge(Env::prefixed("CHATRELAY_").split("__").ignore(&["config"]))
            .merge(Env::raw().only(&["PORT"]))
            .merge(Env::raw().only(&["OPENAI_API_KEY"]).map(|_| "provider.api_key".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
