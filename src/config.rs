use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no API key is stored in the config file.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AI service settings
    pub assistant: AssistantConfig,

    /// Local wallet settings
    pub wallet: WalletConfig,

    /// chaindash home directory
    #[serde(skip)]
    pub home: PathBuf,
}

/// AI service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
    /// How many corrected replies the chat loop follows after a re-prompt
    pub max_corrections: u32,
}

/// Wallet configuration for the bundled development provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub chain_id: u64,
    /// Balance the development provider reports, as a decimal string
    pub dev_balance: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            temperature: 0.3,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 8192,
            request_timeout_secs: 60,
            max_corrections: 1,
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            dev_balance: "1000".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            assistant: AssistantConfig::default(),
            wallet: WalletConfig::default(),
            home: home.join(".chaindash"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.chaindash/config.toml`, falling back to defaults
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let chaindash_home = home.join(".chaindash");

        fs::create_dir_all(&chaindash_home)
            .context("Failed to create .chaindash directory")?;

        let mut config = Self::load_from(&chaindash_home.join("config.toml"))?;
        config.home = chaindash_home;
        Ok(config)
    }

    /// Load configuration from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        if let Some(parent) = path.parent() {
            config.home = parent.to_path_buf();
        }
        Ok(config)
    }

    /// Save configuration to the given path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Check if API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Get API key from config or environment
    pub fn api_key(&self) -> Option<String> {
        self.assistant
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty()))
    }

    /// Update API key
    pub fn set_api_key(&mut self, key: String) {
        self.assistant.api_key = Some(key);
    }

    /// Printable view with the API key masked
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        if let Some(key) = copy.assistant.api_key.as_mut() {
            *key = "********".to_string();
        }
        copy
    }
}
