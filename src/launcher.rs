//! Opening the target app from a notification's primary action
//!
//! The action is whatever the notification carried to bring its app to
//! the foreground (a deep link, a desktop file id...). It is handed to a
//! configurable opener command, `xdg-open` by default.
//!
//! Opening is a dispatch, not a wait: some openers stay in the foreground
//! for as long as the app runs. The opener is watched for a short grace
//! period so immediate failures still surface, then left running and
//! reaped in the background.

use crate::config::LauncherConfig;
use crate::error::LaunchError;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// Trait for app launcher implementations
#[async_trait::async_trait]
pub trait AppLauncher: Send + Sync {
    /// Invoke the notification's primary action
    async fn open(&self, action: &str) -> Result<(), LaunchError>;
}

/// Runs `<command> <action>`
pub struct CommandLauncher {
    command: String,
    grace: Duration,
}

impl CommandLauncher {
    pub fn new(command: impl Into<String>, grace: Duration) -> Self {
        Self {
            command: command.into(),
            grace,
        }
    }
}

async fn stderr_text(child: &mut Child) -> String {
    let mut text = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut text).await;
    }
    text.trim().to_string()
}

#[async_trait::async_trait]
impl AppLauncher for CommandLauncher {
    async fn open(&self, action: &str) -> Result<(), LaunchError> {
        tracing::debug!("Opening target app: {} {}", self.command, action);

        let mut child = Command::new(&self.command)
            .arg(action)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LaunchError::NotFound(self.command.clone())
                } else {
                    LaunchError::Failed(e.to_string())
                }
            })?;

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => {
                let stderr = stderr_text(&mut child).await;
                Err(LaunchError::Failed(if stderr.is_empty() {
                    status.to_string()
                } else {
                    stderr
                }))
            }
            Ok(Err(e)) => Err(LaunchError::Failed(e.to_string())),
            Err(_) => {
                // Still running; the app is being opened
                tracing::debug!("{} still running, detaching", self.command);
                let command = self.command.clone();
                // Dropping the pipe keeps a chatty opener from blocking on stderr
                drop(child.stderr.take());
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if !status.success() => {
                            tracing::debug!("{} exited late: {}", command, status)
                        }
                        Ok(_) => {}
                        Err(e) => tracing::debug!("Failed to reap {}: {}", command, e),
                    }
                });
                Ok(())
            }
        }
    }
}

/// Factory function for the configured launcher
pub fn create_launcher(config: &LauncherConfig) -> Arc<dyn AppLauncher> {
    Arc::new(CommandLauncher::new(
        config.command.clone(),
        Duration::from_millis(config.grace_ms),
    ))
}
