use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::CheckinError;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BotConfig {
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FilesConfig {
    #[serde(default = "default_private_keys")]
    pub private_keys: String,
    #[serde(default = "default_proxies")]
    pub proxies: String,
    #[serde(default = "default_tokens")]
    pub tokens: String,
}

fn default_private_keys() -> String {
    "pv.txt".to_string()
}

fn default_proxies() -> String {
    "proxy.txt".to_string()
}

fn default_tokens() -> String {
    "tokens.json".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            private_keys: default_private_keys(),
            proxies: default_proxies(),
            tokens: default_tokens(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_wallet_delay")]
    pub wallet_delay_secs: u64,
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
    #[serde(default = "default_countdown_refresh")]
    pub countdown_refresh_secs: u64,
}

fn default_wallet_delay() -> u64 {
    30
}

fn default_cycle_interval() -> u64 {
    24 * 60 * 60
}

fn default_countdown_refresh() -> u64 {
    60
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            wallet_delay_secs: default_wallet_delay(),
            cycle_interval_secs: default_cycle_interval(),
            countdown_refresh_secs: default_countdown_refresh(),
        }
    }
}

impl ScheduleConfig {
    pub fn wallet_delay(&self) -> Duration {
        Duration::from_secs(self.wallet_delay_secs)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    /// Never zero, a zero refresh would spin the countdown.
    pub fn countdown_refresh(&self) -> Duration {
        Duration::from_secs(self.countdown_refresh_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_site_origin")]
    pub site_origin: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_referral_code")]
    pub referral_code: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_use_proxy() -> bool {
    true
}

fn default_api_base_url() -> String {
    "https://api.x.ink".to_string()
}

fn default_site_origin() -> String {
    "https://x.ink".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36".to_string()
}

fn default_referral_code() -> String {
    "TJW3LR".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_probe_url() -> String {
    "https://api.ipify.org?format=json".to_string()
}

fn default_probe_timeout() -> u64 {
    10
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            use_proxy: default_use_proxy(),
            api_base_url: default_api_base_url(),
            site_origin: default_site_origin(),
            user_agent: default_user_agent(),
            referral_code: default_referral_code(),
            request_timeout_secs: default_request_timeout(),
            probe_url: default_probe_url(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl BotConfig {
    pub fn load_or_default(path: &str) -> Self {
        if Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => {
                        info!("Config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        warn!("Error parsing config: {}. Using defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Error reading config: {}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            info!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            if let Err(e) = config.save(path) {
                warn!("Could not write default config: {}", e);
            }
            config
        }
    }

    /// Strict variant for a path the user named explicitly.
    pub fn load(path: &str) -> Result<Self, CheckinError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| CheckinError::Config(format!("cannot read {}: {}", path, e)))?;
        toml::from_str(&s).map_err(|e| CheckinError::Config(format!("cannot parse {}: {}", path, e)))
    }

    pub fn save(&self, path: &str) -> Result<(), CheckinError> {
        let s = toml::to_string_pretty(self).map_err(|e| CheckinError::Config(e.to_string()))?;
        std::fs::write(path, s)?;
        Ok(())
    }
}

/// Non-empty trimmed lines of an input file. A missing file yields an empty list.
pub fn read_lines(path: &str) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_lines(&content),
        Err(e) => {
            warn!("File {} not found or unreadable: {}", path, e);
            Vec::new()
        }
    }
}

pub fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
