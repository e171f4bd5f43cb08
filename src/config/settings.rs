use crate::error::{BlockchainError, Result};
use log::LevelFilter;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

static DEFAULT_NODE_ADDR: &str = "127.0.0.1:2001";
static DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable naming an optional TOML settings file
pub const CONFIG_FILE_ENV: &str = "UTXO_CHAIN_CONFIG";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const LOG_LEVEL_KEY: &str = "LOG_LEVEL";
const MINING_KEY: &str = "MINING";

/// Settings file layout; every field optional
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    node_address: Option<String>,
    log_level: Option<String>,
    mining: Option<bool>,
}

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
    file_error: Option<BlockchainError>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults, then the file named by `UTXO_CHAIN_CONFIG`, then environment variables
    pub fn new() -> Config {
        let file = env::var(CONFIG_FILE_ENV).ok();
        Config::load(file.as_deref().map(Path::new), |key: &str| env::var(key).ok())
    }

    /// Like `from_sources`, but an unusable file is skipped and its error kept
    /// for `get_file_error`, since this may run before any logger exists
    pub fn load<F>(file: Option<&Path>, env_lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        match Config::from_sources(file, &env_lookup) {
            Ok(config) => config,
            Err(e) => {
                let mut config =
                    Config::from_sources(None, &env_lookup).unwrap_or_else(|_| Config::defaults());
                config.file_error = Some(e);
                config
            }
        }
    }

    fn defaults() -> Config {
        let mut map = HashMap::new();
        map.insert(String::from(NODE_ADDRESS_KEY), String::from(DEFAULT_NODE_ADDR));
        map.insert(String::from(LOG_LEVEL_KEY), String::from(DEFAULT_LOG_LEVEL));
        map.insert(String::from(MINING_KEY), String::from("false"));
        Config {
            inner: RwLock::new(map),
            file_error: None,
        }
    }

    /// Layers an optional TOML file and an environment lookup over the defaults
    pub fn from_sources<F>(file: Option<&Path>, env_lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config::defaults();
        if let Some(path) = file {
            let settings: FileSettings = toml::from_str(&fs::read_to_string(path)?)?;
            let mut inner = config.write();
            if let Some(addr) = settings.node_address {
                inner.insert(String::from(NODE_ADDRESS_KEY), addr);
            }
            if let Some(level) = settings.log_level {
                inner.insert(String::from(LOG_LEVEL_KEY), level);
            }
            if let Some(mining) = settings.mining {
                inner.insert(String::from(MINING_KEY), mining.to_string());
            }
        }
        {
            let mut inner = config.write();
            for key in [NODE_ADDRESS_KEY, LOG_LEVEL_KEY, MINING_KEY] {
                if let Some(value) = env_lookup(key) {
                    inner.insert(String::from(key), value);
                }
            }
        }
        Ok(config)
    }

    /// Why the settings file was skipped, if it was
    pub fn get_file_error(&self) -> Option<&BlockchainError> {
        self.file_error.as_ref()
    }

    // Settings stay usable even if a writer panicked
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_node_addr(&self) -> String {
        self.read()
            .get(NODE_ADDRESS_KEY)
            .cloned()
            .unwrap_or_else(|| String::from(DEFAULT_NODE_ADDR))
    }

    pub fn set_node_addr(&self, addr: String) {
        self.write().insert(String::from(NODE_ADDRESS_KEY), addr);
    }

    pub fn get_log_level(&self) -> String {
        self.read()
            .get(LOG_LEVEL_KEY)
            .cloned()
            .unwrap_or_else(|| String::from(DEFAULT_LOG_LEVEL))
    }

    /// Parsed log level, `info` when the configured value is not a level name
    pub fn log_level_filter(&self) -> LevelFilter {
        self.get_log_level().parse().unwrap_or(LevelFilter::Info)
    }

    pub fn is_mining(&self) -> bool {
        self.read()
            .get(MINING_KEY)
            .map(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    pub fn set_mining(&self, mining: bool) {
        self.write()
            .insert(String::from(MINING_KEY), mining.to_string());
    }
}
