//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.kora/config.json`) and environment.
//! API keys may live in the file but the environment always wins.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const TEXT_API_KEY_ENV: &str = "GEMINI_TEXT_API_KEY";
pub const IMAGE_API_KEY_ENV: &str = "GEMINI_IMAGE_API_KEY";
pub const IMAGE_HOST_API_KEY_ENV: &str = "IMGE_API_KEY";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP gateway bind and port.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Text and image model settings.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Image hosting service (upload + public URL).
    #[serde(default)]
    pub image_host: ImageHostConfig,

    /// Outbound HTTP settings shared by every client.
    #[serde(default)]
    pub http: HttpConfig,

    /// Document extraction limits and truncation notice.
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Optional per-chat conversation memory.
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Gateway bind address and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsConfig {
    /// Gemini REST root (default https://generativelanguage.googleapis.com).
    #[serde(default = "default_models_base_url")]
    pub base_url: String,

    /// Conversational model (default "gemini-1.5-flash").
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Image-analysis model (default "gemini-1.5-pro").
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Overridden by GEMINI_TEXT_API_KEY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_api_key: Option<String>,

    /// Overridden by GEMINI_IMAGE_API_KEY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_api_key: Option<String>,

    #[serde(default)]
    pub generation: GenerationConfig,

    /// Replaces the built-in persona block prepended to every text turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

fn default_models_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_text_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_image_model() -> String {
    "gemini-1.5-pro".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            base_url: default_models_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            text_api_key: None,
            image_api_key: None,
            generation: GenerationConfig::default(),
            persona: None,
        }
    }
}

/// Sampling settings for the text model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.95,
            top_k: 30,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageHostConfig {
    /// Upload service root (default https://im.ge).
    #[serde(default = "default_image_host_base_url")]
    pub base_url: String,

    /// Overridden by IMGE_API_KEY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Skip certificate verification for this host only. Logged as a warning at startup.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_image_host_base_url() -> String {
    "https://im.ge".to_string()
}

impl Default for ImageHostConfig {
    fn default() -> Self {
        Self {
            base_url: default_image_host_base_url(),
            api_key: None,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Per-request timeout for every external call (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// When the "(Truncated to N characters)" notice is appended to extracted documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TruncationNotice {
    /// Always append the ellipsis and notice, even for short documents.
    #[default]
    Always,
    /// Append them only when text was actually cut.
    WhenTruncated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsConfig {
    /// Character cap for extracted text (default 1000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub truncation_notice: TruncationNotice,
}

fn default_max_chars() -> usize {
    1000
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            truncation_notice: TruncationNotice::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationConfig {
    /// Keep per-chat history between messages. Off by default: each message starts a fresh session.
    #[serde(default)]
    pub memory: bool,

    /// Exchanges (user + reply) kept per chat (default 10).
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Chats idle longer than this are forgotten (default 1800).
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

fn default_max_turns() -> usize {
    10
}

fn default_idle_ttl_secs() -> u64 {
    1800
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            memory: false,
            max_turns: default_max_turns(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

/// A required setting is missing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing API key: set {env} or {key} in the config file")]
    MissingKey {
        env: &'static str,
        key: &'static str,
    },
}

/// The three credentials the bot cannot run without.
#[derive(Debug, Clone)]
pub struct ApiKeys {
    pub text_model: String,
    pub image_model: String,
    pub image_host: String,
}

/// Env value if set and non-empty, else the trimmed config value if non-empty.
fn resolve_key(env: &str, configured: Option<&String>) -> Option<String> {
    std::env::var(env)
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            configured
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the text model key: env GEMINI_TEXT_API_KEY overrides config.
pub fn resolve_text_api_key(config: &Config) -> Option<String> {
    resolve_key(TEXT_API_KEY_ENV, config.models.text_api_key.as_ref())
}

/// Resolve the image model key: env GEMINI_IMAGE_API_KEY overrides config.
pub fn resolve_image_api_key(config: &Config) -> Option<String> {
    resolve_key(IMAGE_API_KEY_ENV, config.models.image_api_key.as_ref())
}

/// Resolve the image host key: env IMGE_API_KEY overrides config.
pub fn resolve_image_host_api_key(config: &Config) -> Option<String> {
    resolve_key(IMAGE_HOST_API_KEY_ENV, config.image_host.api_key.as_ref())
}

/// Resolve every API key, failing on the first one that is absent.
pub fn resolve_keys(config: &Config) -> Result<ApiKeys, ConfigError> {
    let text_model = resolve_text_api_key(config).ok_or(ConfigError::MissingKey {
        env: TEXT_API_KEY_ENV,
        key: "models.textApiKey",
    })?;
    let image_model = resolve_image_api_key(config).ok_or(ConfigError::MissingKey {
        env: IMAGE_API_KEY_ENV,
        key: "models.imageApiKey",
    })?;
    let image_host = resolve_image_host_api_key(config).ok_or(ConfigError::MissingKey {
        env: IMAGE_HOST_API_KEY_ENV,
        key: "imageHost.apiKey",
    })?;
    Ok(ApiKeys {
        text_model,
        image_model,
        image_host,
    })
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("KORA_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".kora").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or KORA_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
