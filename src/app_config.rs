use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Settings loaded from the JSON config file, each with a default
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Translation service connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Defaults used to fill in translation requests
    #[serde(default)]
    pub defaults: TranslateDefaults,

    /// Cosmetic progress settings
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation service connection settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the service API, including the `/api` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token attached to every request (empty means anonymous)
    #[serde(default = "String::new")]
    pub token: String,

    /// Timeout in seconds for the plain JSON endpoints.
    /// The translation stream has no read timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds, applied to the stream as well
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl ApiConfig {
    // @returns: Token if one is configured
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.token.trim();
        if token.is_empty() { None } else { Some(token) }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Defaults applied when the user leaves request fields out
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslateDefaults {
    /// Target language code (e.g., "ja", "es")
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Model identifier on the service
    #[serde(default = "default_model")]
    pub model: String,

    /// Number of subtitle lines translated in test mode
    #[serde(default = "default_test_limit")]
    pub test_limit: u32,

    /// Models offered when the service cannot list its own
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,
}

impl Default for TranslateDefaults {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            model: default_model(),
            test_limit: default_test_limit(),
            fallback_models: default_fallback_models(),
        }
    }
}

/// Timer-driven display progress shown while the service is silent.
///
/// It only ever raises the displayed percentage; real progress events
/// always win when they are higher.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProgressConfig {
    /// Whether cosmetic progress is shown at all
    #[serde(default)]
    pub enabled: bool,

    /// Percentage points added per tick
    #[serde(default = "default_progress_step")]
    pub step: u8,

    /// Cosmetic progress never goes past this value
    #[serde(default = "default_progress_cap")]
    pub cap: u8,

    /// Milliseconds between ticks
    #[serde(default = "default_progress_interval_ms")]
    pub interval_ms: u64,

    /// Ticking stops after this many seconds
    #[serde(default = "default_progress_max_duration_secs")]
    pub max_duration_secs: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            step: default_progress_step(),
            cap: default_progress_cap(),
            interval_ms: default_progress_interval_ms(),
            max_duration_secs: default_progress_max_duration_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_lang() -> String {
    "ja".to_string()
}

fn default_model() -> String {
    "gemma2:27b".to_string()
}

fn default_test_limit() -> u32 {
    5
}

fn default_fallback_models() -> Vec<String> {
    vec!["gemma2:27b".to_string(), "gemma2:9b".to_string()]
}

fn default_progress_step() -> u8 {
    8
}

fn default_progress_cap() -> u8 {
    90
}

fn default_progress_interval_ms() -> u64 {
    1500
}

fn default_progress_max_duration_secs() -> u64 {
    120
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid service URL: {}", self.api.base_url))?;
        match url.scheme() {
            "http" | "https" => {},
            other => return Err(anyhow!("Unsupported URL scheme '{}' in {}", other, self.api.base_url)),
        }

        if self.api.timeout_secs == 0 {
            return Err(anyhow!("api.timeout_secs must be greater than zero"));
        }
        if self.api.connect_timeout_secs == 0 {
            return Err(anyhow!("api.connect_timeout_secs must be greater than zero"));
        }

        if self.defaults.model.trim().is_empty() {
            return Err(anyhow!("A default model is required"));
        }

        if self.progress.cap > 100 {
            return Err(anyhow!("progress.cap must be at most 100, got {}", self.progress.cap));
        }
        if self.progress.enabled && (self.progress.step == 0 || self.progress.interval_ms == 0) {
            return Err(anyhow!("progress.step and progress.interval_ms must be non-zero when cosmetic progress is enabled"));
        }

        Ok(())
    }

    /// Load the configuration at `path`, writing a default one if it doesn't exist yet
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Load the configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig::default(),
            defaults: TranslateDefaults::default(),
            progress: ProgressConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
