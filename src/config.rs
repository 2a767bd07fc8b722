//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides. The
//! WhatsApp credentials only ever live here, on the server side.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::messaging::{BatchConfig, GraphConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub batch: BatchSettings,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// WhatsApp Cloud API credentials and endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub phone_number_id: String,

    #[serde(default)]
    pub waba_id: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Languages offered when listing approved templates
    #[serde(default = "default_template_languages")]
    pub template_languages: Vec<String>,
}

fn default_api_version() -> String {
    "v19.0".to_string()
}

fn default_graph_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_template_languages() -> Vec<String> {
    vec!["en".to_string(), "en_US".to_string()]
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            phone_number_id: String::new(),
            waba_id: String::new(),
            api_version: default_api_version(),
            graph_url: default_graph_url(),
            request_timeout_ms: default_request_timeout(),
            template_languages: default_template_languages(),
        }
    }
}

impl WhatsAppConfig {
    /// Connection details for the Graph client
    pub fn graph(&self) -> GraphConfig {
        GraphConfig {
            base_url: self.graph_url.clone(),
            api_version: self.api_version.clone(),
            phone_number_id: self.phone_number_id.clone(),
            waba_id: self.waba_id.clone(),
            token: self.token.clone(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Template sent by the relay route
    #[serde(default = "default_relay_template")]
    pub relay_template: String,

    #[serde(default = "default_relay_language")]
    pub relay_language: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_relay_template() -> String {
    "service_notification".to_string()
}

fn default_relay_language() -> String {
    "en".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            relay_template: default_relay_template(),
            relay_language: default_relay_language(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Pacing of broadcasts and campaigns
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_delay")]
    pub delay_ms: u64,
}

fn default_concurrency() -> usize {
    1
}

fn default_delay() -> u64 {
    100
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            delay_ms: default_delay(),
        }
    }
}

impl BatchSettings {
    pub fn runner_config(&self) -> BatchConfig {
        BatchConfig {
            concurrency: self.concurrency.max(1),
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

/// Ledger file location
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: String,

    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
}

fn default_ledger_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("wacrm").join("ledger.json").to_string_lossy().to_string())
        .unwrap_or_else(|| "./wacrm_data/ledger.json".to_string())
}

fn default_max_logs() -> usize {
    20
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            max_logs: default_max_logs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("wacrm").join("config.toml")),
            Some(PathBuf::from("/etc/wacrm/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // WhatsApp credentials
        if let Some(token) = lookup("WHATSAPP_TOKEN") {
            self.whatsapp.token = token;
        }
        if let Some(id) = lookup("PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = id;
        }
        if let Some(id) = lookup("WABA_ID") {
            self.whatsapp.waba_id = id;
        }
        if let Some(version) = lookup("API_VERSION") {
            self.whatsapp.api_version = version;
        }
        if let Some(url) = lookup("WACRM_GRAPH_URL") {
            self.whatsapp.graph_url = url;
        }

        // Server overrides
        if let Some(host) = lookup("WACRM_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Batch overrides
        if let Some(delay) = lookup("WACRM_BATCH_DELAY_MS") {
            if let Ok(d) = delay.parse() {
                self.batch.delay_ms = d;
            }
        }
        if let Some(concurrency) = lookup("WACRM_BATCH_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.batch.concurrency = c;
            }
        }

        // Ledger overrides
        if let Some(path) = lookup("WACRM_LEDGER_PATH") {
            self.ledger.path = path;
        }

        // Logging overrides
        if let Some(level) = lookup("WACRM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("WACRM_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Check that the Graph credentials are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("WHATSAPP_TOKEN", &self.whatsapp.token),
            ("PHONE_NUMBER_ID", &self.whatsapp.phone_number_id),
            ("WABA_ID", &self.whatsapp.waba_id),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing.join(", ")))
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Missing required configuration: {0}")]
    Missing(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# wacrm Configuration
#
# Environment variables override these settings:
# - WHATSAPP_TOKEN, PHONE_NUMBER_ID, WABA_ID, API_VERSION
# - WACRM_GRAPH_URL
# - WACRM_HOST, PORT
# - WACRM_BATCH_DELAY_MS, WACRM_BATCH_CONCURRENCY
# - WACRM_LEDGER_PATH
# - WACRM_LOG_LEVEL, WACRM_LOG_FORMAT

[whatsapp]
# Permanent or system-user access token (required)
token = ""

# Sender phone number ID (required)
phone_number_id = ""

# WhatsApp Business Account ID, used for templates (required)
waba_id = ""

# Graph API version
api_version = "v19.0"

# Graph API base URL
graph_url = "https://graph.facebook.com"

# Per-request timeout (ms)
request_timeout_ms = 10000

# Languages listed as approved templates
template_languages = ["en", "en_US"]

[server]
# API server host
host = "127.0.0.1"

# API server port
port = 4000

# Allowed CORS origins (empty allows any)
cors_origins = []

# Template sent by GET /send-template-ui
relay_template = "service_notification"
relay_language = "en"

[batch]
# Sends in flight at once (1 keeps broadcasts strictly sequential)
concurrency = 1

# Pause between sends (ms)
delay_ms = 100

[ledger]
# JSON file holding leads, logs, inbox and metrics
path = "~/.local/share/wacrm/ledger.json"

# Activity log entries kept
max_logs = 20

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
