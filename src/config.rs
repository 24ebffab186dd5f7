//! Configuration loading and types for taprelay
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/taprelay/config.toml)
//! 3. Environment variables (TAPRELAY_*)
//! 4. CLI arguments (highest priority)

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Taprelay Configuration
#
# Location: ~/.config/taprelay/config.toml
# All settings can be overridden via CLI flags

[backend]
# Base URL of the backend. Reports are posted to <base>/api/notifications.
# Re-read before every send, so `taprelay set-backend` takes effect
# without restarting the daemon.
endpoint_base_url = "http://10.0.2.2:8000"

# connect_timeout_secs = 10
# request_timeout_secs = 30

[target]
# Application identity whose notifications trigger an extraction
app = "family.fomo.app"

[pipeline]
# Delay between opening the app and requesting the tap
app_open_delay_ms = 1500

# Total budget for a session, measured from the app open
session_timeout_ms = 2000

# Absolute screen coordinate of the copy control
tap_x = 216
tap_y = 81

# Clipboard and launcher calls taking longer than this are abandoned
# collaborator_timeout_ms = 1000

[clipboard]
# "auto", "wayland" (wl-clipboard) or "x11" (xclip)
backend = "auto"

[gesture]
# Tap dispatcher. Only "ydotool" is supported.
backend = "ydotool"

# Duration of the tap stroke in milliseconds
# press_ms = 50

[launcher]
# Command used to open a notification's primary action
command = "xdg-open"

# The opener is detached once it has run this long without failing
# grace_ms = 200

[source]
# Where notifications come from:
# - stdin: newline-delimited JSON on standard input
# - http: POST /notifications on the listen address
kind = "stdin"
# listen = "127.0.0.1:8766"

[log]
# "auto" stores entries in the data directory, or give an explicit path
path = "auto"
capacity = 50
"#;

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://10.0.2.2:8000";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,

    #[serde(default)]
    pub gesture: GestureConfig,

    #[serde(default)]
    pub launcher: LauncherConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL; the report path is appended to it
    #[serde(default = "default_backend_url")]
    pub endpoint_base_url: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Which application's notifications are relayed
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_app")]
    pub app: String,
}

/// Extraction session timing and tap location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_app_open_delay")]
    pub app_open_delay_ms: u64,

    #[serde(default = "default_session_timeout")]
    pub session_timeout_ms: u64,

    #[serde(default = "default_tap_x")]
    pub tap_x: i32,

    #[serde(default = "default_tap_y")]
    pub tap_y: i32,

    /// Upper bound on each clipboard or launcher call made by the pipeline
    #[serde(default = "default_collaborator_timeout")]
    pub collaborator_timeout_ms: u64,
}

/// Clipboard backend selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardBackend {
    /// Wayland when WAYLAND_DISPLAY is set, X11 otherwise
    #[default]
    Auto,
    /// wl-clipboard (wl-paste / wl-copy)
    Wayland,
    /// xclip
    X11,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClipboardConfig {
    #[serde(default)]
    pub backend: ClipboardBackend,
}

/// Tap dispatcher selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GestureBackend {
    #[default]
    Ydotool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GestureConfig {
    #[serde(default)]
    pub backend: GestureBackend,

    /// Duration of the tap stroke
    #[serde(default = "default_press_ms")]
    pub press_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LauncherConfig {
    #[serde(default = "default_launcher_command")]
    pub command: String,

    /// How long to watch the opener for an early failure before detaching
    #[serde(default = "default_launcher_grace")]
    pub grace_ms: u64,
}

/// Notification source selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Newline-delimited JSON on stdin
    #[default]
    Stdin,
    /// Local HTTP listener
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Log store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// "auto" or an explicit file path
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Maximum number of entries kept
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_target_app() -> String {
    "family.fomo.app".to_string()
}

fn default_app_open_delay() -> u64 {
    1500
}

fn default_session_timeout() -> u64 {
    2000
}

fn default_tap_x() -> i32 {
    216
}

fn default_tap_y() -> i32 {
    81
}

fn default_press_ms() -> u64 {
    50
}

fn default_launcher_command() -> String {
    "xdg-open".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:8766".to_string()
}

fn default_log_path() -> String {
    "auto".to_string()
}

fn default_log_capacity() -> usize {
    50
}

fn default_collaborator_timeout() -> u64 {
    1000
}

fn default_launcher_grace() -> u64 {
    200
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint_base_url: default_backend_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            app: default_target_app(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            app_open_delay_ms: default_app_open_delay(),
            session_timeout_ms: default_session_timeout(),
            tap_x: default_tap_x(),
            tap_y: default_tap_y(),
            collaborator_timeout_ms: default_collaborator_timeout(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            backend: GestureBackend::default(),
            press_ms: default_press_ms(),
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            command: default_launcher_command(),
            grace_ms: default_launcher_grace(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            listen: default_listen(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            capacity: default_log_capacity(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "taprelay")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (pid)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to /tmp
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("taprelay")
    }

    /// Get the data directory path (for the log store)
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "taprelay")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve the log file path from config
    pub fn resolve_log_path(&self) -> PathBuf {
        match self.log.path.to_lowercase().as_str() {
            "auto" | "" => Self::data_dir().join("logs.json"),
            _ => PathBuf::from(&self.log.path),
        }
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, RelayError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            config = read_config_file(path)?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(url) = std::env::var("TAPRELAY_BACKEND_URL") {
        config.backend.endpoint_base_url = url;
    }
    if let Ok(app) = std::env::var("TAPRELAY_TARGET_APP") {
        config.target.app = app;
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config, RelayError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RelayError::Config(format!("Failed to read config: {}", e)))?;
    toml::from_str(&contents).map_err(|e| RelayError::Config(format!("Invalid config: {}", e)))
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<(), RelayError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| RelayError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| RelayError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, contents)
        .map_err(|e| RelayError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}

/// Process-wide backend endpoint, read before every outbound send.
///
/// When bound to a config file the file is re-read on each access, so edits
/// made by the settings surface (`taprelay set-backend`) are picked up by a
/// running daemon. Readers always get a whole string.
#[derive(Debug, Clone)]
pub struct BackendConfigStore {
    current: Arc<RwLock<String>>,
    file: Option<PathBuf>,
}

impl BackendConfigStore {
    /// In-memory store with no backing file
    pub fn new(endpoint_base_url: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(endpoint_base_url.into())),
            file: None,
        }
    }

    /// Store that reloads from `path` before every read
    pub fn with_file(endpoint_base_url: impl Into<String>, path: PathBuf) -> Self {
        Self {
            current: Arc::new(RwLock::new(endpoint_base_url.into())),
            file: Some(path),
        }
    }

    /// Current base URL, reloaded from the config file when bound to one
    pub fn endpoint_base_url(&self) -> String {
        if let Some(ref path) = self.file {
            self.reload(path);
        }
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn reload(&self, path: &Path) {
        if !path.exists() {
            return;
        }
        match read_config_file(path) {
            Ok(config) => self.replace(config.backend.endpoint_base_url),
            Err(e) => tracing::warn!("Keeping last backend URL, reload failed: {}", e),
        }
    }

    fn replace(&self, url: String) {
        match self.current.write() {
            Ok(mut guard) => *guard = url,
            Err(poisoned) => *poisoned.into_inner() = url,
        }
    }

    /// Update the base URL, persisting it when bound to a config file
    pub fn set_endpoint_base_url(&self, url: &str) -> Result<(), RelayError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RelayError::Config("Backend URL must not be empty".into()));
        }

        if let Some(ref path) = self.file {
            let mut config = if path.exists() {
                read_config_file(path)?
            } else {
                Config::default()
            };
            config.backend.endpoint_base_url = url.to_string();
            save_config(&config, path)?;
        }

        self.replace(url.to_string());
        tracing::info!("Backend URL saved: {}", url);
        Ok(())
    }
}
