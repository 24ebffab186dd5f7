//! Error types for taprelay
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the taprelay application
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification source error: {0}")]
    Source(#[from] SourceError),

    #[error("Gesture error: {0}")]
    Gesture(#[from] GestureError),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Log store error: {0}")]
    LogStore(#[from] LogStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while receiving notifications
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Cannot bind notification listener on {0}: {1}")]
    Bind(String, String),

    #[error("Notification source already started")]
    AlreadyStarted,

    #[error("Malformed notification: {0}")]
    Malformed(String),
}

/// Errors raised when the tap capability cannot be used at all
#[derive(Error, Debug)]
pub enum GestureError {
    #[error("ydotool not found in PATH. Install via your package manager.")]
    YdotoolNotFound,

    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool\n  Enable at boot: systemctl --user enable ydotool")]
    YdotoolNotRunning,

    #[error("Gesture dispatch failed: {0}")]
    DispatchFailed(String),
}

/// Errors related to the system clipboard
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("wl-clipboard not found in PATH. Install wl-clipboard via your package manager.")]
    WlClipboardNotFound,

    #[error("xclip not found in PATH. Install via your package manager.")]
    XclipNotFound,

    #[error("Clipboard access failed: {0}")]
    AccessFailed(String),
}

/// Errors raised while opening the target app from a notification
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Launcher '{0}' not found in PATH")]
    NotFound(String),

    #[error("Launcher exited with error: {0}")]
    Failed(String),
}

/// Errors raised while building or sending a backend report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid backend URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Transport(String),
}

/// Errors related to log persistence
#[derive(Error, Debug)]
pub enum LogStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt log file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
