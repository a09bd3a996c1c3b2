use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no collection addresses configured")]
    NoCollections,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// NFT collection addresses to analyse.
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key - loaded from env OVERLAP_API_KEY
    #[serde(default)]
    pub api_key: String,
    /// Header carrying the API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Holder-list path, `{collection}` is replaced with the address
    #[serde(default = "default_holders_path")]
    pub holders_path: String,
    /// Inventory path, `{account}` is replaced with the wallet
    #[serde(default = "default_inventory_path")]
    pub inventory_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Max in-flight requests per batch (unset = unbounded).
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_base_url() -> String {
    "https://api.nftport.xyz/v0".to_string()
}
fn default_api_key_header() -> String {
    "x-api-key".to_string()
}
fn default_holders_path() -> String {
    "/nfts/{collection}/owners".to_string()
}
fn default_inventory_path() -> String {
    "/accounts/{account}/tokens".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            api_key_header: default_api_key_header(),
            holders_path: default_holders_path(),
            inventory_path: default_inventory_path(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_concurrency: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ApiConfig {
    pub fn holders_url(&self, collection: &str) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.holders_path.replace("{collection}", collection)
        )
    }

    pub fn inventory_url(&self, account: &str) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.inventory_path.replace("{account}", account)
        )
    }

    /// Headers sent with every request. Empty when no key is configured.
    pub fn auth_headers(&self) -> Vec<(String, String)> {
        if self.api_key.is_empty() {
            return Vec::new();
        }
        vec![(self.api_key_header.clone(), self.api_key.clone())]
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn split_collections(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables for secrets.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;

        // Never store the key in the config file
        if let Ok(key) = std::env::var("OVERLAP_API_KEY") {
            config.api.api_key = key;
        }

        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a default config from environment variables only (no file needed).
    pub fn from_env() -> Self {
        Config {
            api: ApiConfig {
                base_url: std::env::var("OVERLAP_API_URL").unwrap_or_else(|_| default_base_url()),
                api_key: std::env::var("OVERLAP_API_KEY").unwrap_or_default(),
                ..ApiConfig::default()
            },
            fetch: FetchConfig::default(),
            collections: std::env::var("OVERLAP_COLLECTIONS")
                .map(|raw| split_collections(&raw))
                .unwrap_or_default(),
            logging: LoggingConfig::default(),
        }
    }

    /// The collection list, or an error when nothing is configured.
    pub fn require_collections(&self) -> Result<&[String], ConfigError> {
        if self.collections.is_empty() {
            return Err(ConfigError::NoCollections);
        }
        Ok(&self.collections)
    }
}
