//! Environment-backed configuration.
//!
//! Everything except `OPENAI_API_KEY` has a default. Override with `RECALL_*`
//! environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CascadeConfig;
use crate::constants::{
    DEFAULT_CALL_TIMEOUT_MS, DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_TTL_DAYS,
    DEFAULT_MATCH_THRESHOLD, DEFAULT_TOP_K,
};
use crate::embedding::{DEFAULT_EMBEDDING_MODEL, DEFAULT_OPENAI_BASE_URL};
use crate::generation::DEFAULT_CHAT_MODEL;
use crate::vectordb::{DEFAULT_COLLECTION_NAME, DEFAULT_DOCUMENT_PREFIX, DEFAULT_INDEX_NAME};

/// Default Redis URL used when `RECALL_REDIS_URL` is not set.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Qdrant URL used when `RECALL_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

pub const DEFAULT_MONGO_DB: &str = "recall";

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read overrides on top of defaults.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port. Default: `3000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Fast tier and embedding cache.
    pub redis_url: String,
    pub redis_index: String,
    pub redis_prefix: String,

    /// Durable tier.
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,

    /// Durable embedding store; disabled when unset.
    pub mongo_uri: Option<String>,
    pub mongo_db: String,
    pub embedding_ttl_days: u64,

    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub embedding_dim: usize,

    /// Cache hits must score strictly above this. Default: `0.92`.
    pub match_threshold: f32,
    pub top_k: usize,
    pub call_timeout_ms: u64,
    /// Copy durable-tier hits into the fast tier. Default: `true`.
    pub backfill: bool,

    pub slack_bot_token: Option<String>,
    /// Events API signatures are not checked when unset.
    pub slack_signing_secret: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() { "<set>" } else { "<unset>" }
        }

        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("redis_url", &self.redis_url)
            .field("redis_index", &self.redis_index)
            .field("redis_prefix", &self.redis_prefix)
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &redact(&self.qdrant_api_key))
            .field("qdrant_collection", &self.qdrant_collection)
            .field("mongo_uri", &redact(&self.mongo_uri))
            .field("mongo_db", &self.mongo_db)
            .field("embedding_ttl_days", &self.embedding_ttl_days)
            .field("openai_base_url", &self.openai_base_url)
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .field("embedding_dim", &self.embedding_dim)
            .field("match_threshold", &self.match_threshold)
            .field("top_k", &self.top_k)
            .field("call_timeout_ms", &self.call_timeout_ms)
            .field("backfill", &self.backfill)
            .field("slack_bot_token", &redact(&self.slack_bot_token))
            .field("slack_signing_secret", &redact(&self.slack_signing_secret))
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            redis_index: DEFAULT_INDEX_NAME.to_string(),
            redis_prefix: DEFAULT_DOCUMENT_PREFIX.to_string(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            qdrant_api_key: None,
            qdrant_collection: DEFAULT_COLLECTION_NAME.to_string(),
            mongo_uri: None,
            mongo_db: DEFAULT_MONGO_DB.to_string(),
            embedding_ttl_days: DEFAULT_EMBEDDING_TTL_DAYS,
            openai_api_key: String::new(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            backfill: true,
            slack_bot_token: None,
            slack_signing_secret: None,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "RECALL_PORT";
    const ENV_BIND_ADDR: &'static str = "RECALL_BIND_ADDR";
    const ENV_REDIS_URL: &'static str = "RECALL_REDIS_URL";
    const ENV_REDIS_INDEX: &'static str = "RECALL_REDIS_INDEX";
    const ENV_REDIS_PREFIX: &'static str = "RECALL_REDIS_PREFIX";
    const ENV_QDRANT_URL: &'static str = "RECALL_QDRANT_URL";
    const ENV_QDRANT_API_KEY: &'static str = "RECALL_QDRANT_API_KEY";
    const ENV_QDRANT_COLLECTION: &'static str = "RECALL_QDRANT_COLLECTION";
    const ENV_MONGO_URI: &'static str = "RECALL_MONGO_URI";
    const ENV_MONGO_DB: &'static str = "RECALL_MONGO_DB";
    const ENV_EMBEDDING_TTL_DAYS: &'static str = "RECALL_EMBEDDING_TTL_DAYS";
    const ENV_OPENAI_API_KEY: &'static str = "OPENAI_API_KEY";
    const ENV_OPENAI_BASE_URL: &'static str = "RECALL_OPENAI_BASE_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "RECALL_EMBEDDING_MODEL";
    const ENV_CHAT_MODEL: &'static str = "RECALL_CHAT_MODEL";
    const ENV_EMBEDDING_DIM: &'static str = "RECALL_EMBEDDING_DIM";
    const ENV_MATCH_THRESHOLD: &'static str = "RECALL_MATCH_THRESHOLD";
    const ENV_TOP_K: &'static str = "RECALL_TOP_K";
    const ENV_CALL_TIMEOUT_MS: &'static str = "RECALL_CALL_TIMEOUT_MS";
    const ENV_BACKFILL: &'static str = "RECALL_BACKFILL";
    const ENV_SLACK_BOT_TOKEN: &'static str = "SLACK_BOT_TOKEN";
    const ENV_SLACK_SIGNING_SECRET: &'static str = "SLACK_SIGNING_SECRET";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let openai_api_key = Self::parse_optional_string_from_env(Self::ENV_OPENAI_API_KEY)
            .ok_or(ConfigError::MissingEnvVar {
                name: Self::ENV_OPENAI_API_KEY,
            })?;

        Ok(Self {
            port: Self::parse_port_from_env(defaults.port)?,
            bind_addr: Self::parse_bind_addr_from_env(defaults.bind_addr)?,
            redis_url: Self::parse_string_from_env(Self::ENV_REDIS_URL, defaults.redis_url),
            redis_index: Self::parse_string_from_env(Self::ENV_REDIS_INDEX, defaults.redis_index),
            redis_prefix: Self::parse_string_from_env(Self::ENV_REDIS_PREFIX, defaults.redis_prefix),
            qdrant_url: Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url),
            qdrant_api_key: Self::parse_optional_string_from_env(Self::ENV_QDRANT_API_KEY),
            qdrant_collection: Self::parse_string_from_env(
                Self::ENV_QDRANT_COLLECTION,
                defaults.qdrant_collection,
            ),
            mongo_uri: Self::parse_optional_string_from_env(Self::ENV_MONGO_URI),
            mongo_db: Self::parse_string_from_env(Self::ENV_MONGO_DB, defaults.mongo_db),
            embedding_ttl_days: Self::parse_number_from_env(
                Self::ENV_EMBEDDING_TTL_DAYS,
                defaults.embedding_ttl_days,
            )?,
            openai_api_key,
            openai_base_url: Self::parse_string_from_env(
                Self::ENV_OPENAI_BASE_URL,
                defaults.openai_base_url,
            ),
            embedding_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding_model,
            ),
            chat_model: Self::parse_string_from_env(Self::ENV_CHAT_MODEL, defaults.chat_model),
            embedding_dim: Self::parse_number_from_env(
                Self::ENV_EMBEDDING_DIM,
                defaults.embedding_dim,
            )?,
            match_threshold: Self::parse_number_from_env(
                Self::ENV_MATCH_THRESHOLD,
                defaults.match_threshold,
            )?,
            top_k: Self::parse_number_from_env(Self::ENV_TOP_K, defaults.top_k)?,
            call_timeout_ms: Self::parse_number_from_env(
                Self::ENV_CALL_TIMEOUT_MS,
                defaults.call_timeout_ms,
            )?,
            backfill: Self::parse_bool_from_env(Self::ENV_BACKFILL, defaults.backfill)?,
            slack_bot_token: Self::parse_optional_string_from_env(Self::ENV_SLACK_BOT_TOKEN),
            slack_signing_secret: Self::parse_optional_string_from_env(
                Self::ENV_SLACK_SIGNING_SECRET,
            ),
        })
    }

    /// Checks numeric invariants; call once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai_api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                name: Self::ENV_OPENAI_API_KEY,
            });
        }
        if !(-1.0..=1.0).contains(&self.match_threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                value: self.match_threshold,
            });
        }
        if self.embedding_dim == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_EMBEDDING_DIM,
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_TOP_K,
            });
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_CALL_TIMEOUT_MS,
            });
        }
        if self.embedding_ttl_days == 0 {
            return Err(ConfigError::ZeroValue {
                name: Self::ENV_EMBEDDING_TTL_DAYS,
            });
        }
        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn embedding_ttl(&self) -> Duration {
        Duration::from_secs(self.embedding_ttl_days * 24 * 60 * 60)
    }

    pub fn cascade_config(&self) -> CascadeConfig {
        CascadeConfig {
            threshold: self.match_threshold,
            top_k: self.top_k,
            call_timeout: self.call_timeout(),
            backfill: self.backfill,
        }
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_number_from_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
        match Self::parse_optional_string_from_env(name) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { name, value }),
            None => Ok(default),
        }
    }

    fn parse_bool_from_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match Self::parse_optional_string_from_env(name) {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidBool { name, value }),
            },
            None => Ok(default),
        }
    }
}
