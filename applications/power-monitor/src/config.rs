use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Long-polling timeout for getUpdates
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Grid group shown in messages; never used in computation
    #[serde(default = "default_group_label")]
    pub group_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_keep_alive_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_keep_alive_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Defaults to this service's own /health endpoint
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".into()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    10000
}

fn default_group_label() -> String {
    "3.2".into()
}

fn default_true() -> bool {
    true
}

fn default_keep_alive_interval_secs() -> u64 {
    600
}

fn default_keep_alive_initial_delay_secs() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base_url: default_api_base_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            group_label: default_group_label(),
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_keep_alive_interval_secs(),
            initial_delay_secs: default_keep_alive_initial_delay_secs(),
            url: None,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file with environment variable substitution,
    /// then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        // Expand environment variables in the format $(VAR_NAME)
        let expanded = expand_env_vars(&content);

        let mut config: Config = serde_yaml::from_str(&expanded)?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from defaults and environment variables only.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(chat_id) = std::env::var("CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }
        if let Ok(label) = std::env::var("GROUP_LABEL").or_else(|_| std::env::var("DTEK_GROUP")) {
            self.monitor.group_label = label;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("PORT is not a valid port: {}", port)))?;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(AppError::Config("BOT_TOKEN is not set".to_string()));
        }

        if self.telegram.chat_id.trim().is_empty() {
            return Err(AppError::Config("CHAT_ID is not set".to_string()));
        }

        if self.server.port == 0 {
            return Err(AppError::Config("Server port cannot be 0".to_string()));
        }

        if self.notifier.queue_capacity == 0 {
            return Err(AppError::Config(
                "Notifier queue capacity cannot be 0".to_string(),
            ));
        }

        if self.keep_alive.enabled && self.keep_alive.interval_secs == 0 {
            return Err(AppError::Config(
                "Keep-alive interval cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn keep_alive_url(&self) -> String {
        self.keep_alive
            .url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}/health", self.server.port))
    }

    /// Bot token with everything past the first characters hidden, for logs.
    pub fn masked_bot_token(&self) -> String {
        let visible: String = self.telegram.bot_token.chars().take(10).collect();
        format!("{}...", visible)
    }
}

/// Expand environment variables in the format $(VAR_NAME)
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();

    let re = match regex::Regex::new(r"\$\(([A-Z_][A-Z0-9_]*)\)") {
        Ok(re) => re,
        Err(_) => return result,
    };

    for cap in re.captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    result
}
