//! Parsed player scripts cached by player version

use crate::config::CipherConfig;
use crate::platform::cipher::Cipher;
use crate::Result;
use moka::sync::Cache;
use std::sync::Arc;
use tracing::debug;

/// In-memory cache of parsed scripts, keyed by player id (e.g. `"6d1c2f5a"`)
#[derive(Clone)]
pub struct PlayerCache {
    ciphers: Cache<String, Arc<Cipher>>,
    config: CipherConfig,
}

impl PlayerCache {
    /// Create a cache with the default configuration
    pub fn new() -> Self {
        Self::with_config(CipherConfig::default())
    }

    /// Create a cache with configuration
    pub fn with_config(config: CipherConfig) -> Self {
        let ciphers = Cache::builder()
            .time_to_live(config.cache_ttl)
            .max_capacity(config.cache_capacity)
            .build();
        Self { ciphers, config }
    }

    pub fn get(&self, player_id: &str) -> Option<Arc<Cipher>> {
        self.ciphers.get(player_id)
    }

    pub fn insert(&self, player_id: &str, cipher: Cipher) -> Arc<Cipher> {
        let cipher = Arc::new(cipher);
        self.ciphers.insert(player_id.to_string(), Arc::clone(&cipher));
        cipher
    }

    /// Cached cipher for `player_id`, parsing `script` on a miss.
    /// Parse failures are returned and leave the cache untouched.
    pub fn get_or_parse(&self, player_id: &str, script: &str) -> Result<Arc<Cipher>> {
        if let Some(cipher) = self.get(player_id) {
            debug!("Player cache hit for {}", player_id);
            return Ok(cipher);
        }

        debug!("Player cache miss for {}, parsing {} bytes", player_id, script.len());
        let cipher = Cipher::from_script_with_config(script, &self.config)?;
        Ok(self.insert(player_id, cipher))
    }

    /// Drop one player version, e.g. after its plans stopped matching
    pub fn invalidate(&self, player_id: &str) {
        self.ciphers.invalidate(player_id);
    }

    pub fn clear(&self) {
        self.ciphers.invalidate_all();
    }

    pub fn config(&self) -> &CipherConfig {
        &self.config
    }
}

impl Default for PlayerCache {
    fn default() -> Self {
        Self::new()
    }
}
