//! Configuration loading
//!
//! Resolution priority, highest first:
//! 1. Command-line arguments (host, port, production flag, config path)
//! 2. Environment variables (`APPRAISAL_PASSWORD`, `ANTHROPIC_API_KEY`, ...)
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! Secrets (the shared access password and the Anthropic API key) are only
//! accepted from the environment or the TOML file, never from the command line.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PASSWORD_ENV: &str = "APPRAISAL_PASSWORD";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const CONFIG_DIR_NAME: &str = "appraisal-check";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Contents of the TOML config file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Production mode marks the session cookie `Secure`
    pub production: Option<bool>,
    pub access_password: Option<String>,
    pub anthropic: AnthropicToml,
    pub rate_limit: RateLimitConfig,
    pub uploads: UploadLimits,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicToml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Upstream model endpoint settings
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Per-caller request ceiling for the analysis endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
    /// Maximum number of tracked callers
    pub capacity: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 60,
            capacity: 500,
        }
    }
}

/// Upload size and shape guards
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Per decoded file
    pub max_file_bytes: usize,
    pub max_photos: usize,
    /// Long side, in pixels, images are downscaled to
    pub max_image_dimension: u32,
    pub jpeg_quality: u8,
    /// Whole request body
    pub max_body_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_photos: 30,
            max_image_dimension: 1024,
            jpeg_quality: 85,
            max_body_bytes: 128 * 1024 * 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "appraisal_web=info,appraisal_common=info,tower_http=info".to_string(),
        }
    }
}

/// Values supplied on the command line (or their clap env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub production: bool,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub access_password: String,
    pub anthropic: AnthropicConfig,
    pub rate_limit: RateLimitConfig,
    pub uploads: UploadLimits,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 5730;
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-sonnet-20241022";
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Merge command line, environment and TOML into the final configuration
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> Result<Self> {
        let access_password = resolve_secret(
            "Access password",
            PASSWORD_ENV,
            toml.access_password.as_deref(),
        )?;
        let api_key = resolve_secret("Anthropic API key", API_KEY_ENV, toml.anthropic.api_key.as_deref())?;

        if toml.rate_limit.max_requests == 0 {
            return Err(Error::Config("rate_limit.max_requests must be at least 1".to_string()));
        }
        if toml.rate_limit.capacity == 0 {
            return Err(Error::Config("rate_limit.capacity must be at least 1".to_string()));
        }
        if !(1..=100).contains(&toml.uploads.jpeg_quality) {
            return Err(Error::Config("uploads.jpeg_quality must be within 1..=100".to_string()));
        }

        Ok(Self {
            host: overrides
                .host
                .or(toml.host)
                .unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            port: overrides.port.or(toml.port).unwrap_or(Self::DEFAULT_PORT),
            production: overrides.production || toml.production.unwrap_or(false),
            access_password,
            anthropic: AnthropicConfig {
                api_key,
                base_url: toml
                    .anthropic
                    .base_url
                    .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
                model: toml
                    .anthropic
                    .model
                    .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
                max_tokens: toml.anthropic.max_tokens.unwrap_or(Self::DEFAULT_MAX_TOKENS),
                timeout_secs: toml
                    .anthropic
                    .timeout_secs
                    .unwrap_or(Self::DEFAULT_TIMEOUT_SECS),
            },
            rate_limit: toml.rate_limit,
            uploads: toml.uploads,
            logging: toml.logging,
        })
    }
}

/// Resolve a secret from environment or TOML
///
/// **Priority:** ENV → TOML. Warns when both are set.
pub fn resolve_secret(label: &str, env_var: &str, toml_value: Option<&str>) -> Result<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_secret(v));
    let toml_value = toml_value.filter(|v| is_valid_secret(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment ({}) and TOML config. Using environment.",
            label, env_var
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Ok(value);
    }

    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", label);
        return Ok(value.to_string());
    }

    Err(Error::Config(format!(
        "{} not configured. Set {} or add it to {}",
        label,
        env_var,
        default_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| CONFIG_FILE_NAME.to_string())
    )))
}

/// Secrets must be non-empty and not whitespace only
pub fn is_valid_secret(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Per-user config file location (`~/.config/appraisal-check/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Locate the TOML config file
///
/// An explicit path must exist. Otherwise the per-user file is tried, then
/// `/etc/appraisal-check/config.toml` on Linux. `None` means run on defaults.
pub fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Error::Config(format!("Config file not found: {}", path.display())));
    }

    if let Some(user_config) = default_config_path() {
        if user_config.exists() {
            return Ok(Some(user_config));
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Ok(Some(system_config));
        }
    }

    Ok(None)
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}
