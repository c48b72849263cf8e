//! Runtime configuration

use crate::error::CipherError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_MAX_SCRIPT_BYTES: &str = "RYT_CIPHER_MAX_SCRIPT_BYTES";
const ENV_CACHE_TTL: &str = "RYT_CIPHER_CACHE_TTL";
const ENV_CACHE_CAPACITY: &str = "RYT_CIPHER_CACHE_CAPACITY";

/// Limits for script parsing and plan caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    /// Largest player script accepted, in bytes
    pub max_script_bytes: usize,
    /// How long a parsed script stays cached
    #[serde(with = "duration_str")]
    pub cache_ttl: Duration,
    /// Maximum number of cached scripts
    pub cache_capacity: u64,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            max_script_bytes: 8 * 1024 * 1024,
            cache_ttl: Duration::from_secs(600), // 10 minutes
            cache_capacity: 16,
        }
    }
}

impl CipherConfig {
    pub fn with_max_script_bytes(mut self, bytes: usize) -> Self {
        self.max_script_bytes = bytes;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read overrides from `RYT_CIPHER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides supplied by `lookup`, keyed by variable name
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MAX_SCRIPT_BYTES) {
            config.max_script_bytes = value.trim().parse().map_err(|e| {
                CipherError::InvalidConfig(format!("{}={}: {}", ENV_MAX_SCRIPT_BYTES, value, e))
            })?;
        }
        if let Some(value) = lookup(ENV_CACHE_TTL) {
            config.cache_ttl = humantime::parse_duration(value.trim()).map_err(|e| {
                CipherError::InvalidConfig(format!("{}={}: {}", ENV_CACHE_TTL, value, e))
            })?;
        }
        if let Some(value) = lookup(ENV_CACHE_CAPACITY) {
            config.cache_capacity = value.trim().parse().map_err(|e| {
                CipherError::InvalidConfig(format!("{}={}: {}", ENV_CACHE_CAPACITY, value, e))
            })?;
        }

        Ok(config)
    }
}

/// Durations as humantime strings such as `"10m"` or `"1h 30m"`
mod duration_str {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(D::Error::custom)
    }
}
