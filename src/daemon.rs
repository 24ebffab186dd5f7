//! Daemon module - wires the source, pipeline and report sink together
//!
//! Owns the process lifecycle: PID file, signal handling, and draining the
//! pipeline when the notification source runs dry.

use crate::clipboard;
use crate::config::{BackendConfigStore, Config};
use crate::error::Result;
use crate::gesture;
use crate::launcher;
use crate::logstore::{LogEntry, LogStore};
use crate::pipeline::{Collaborators, Pipeline, PipelineSettings};
use crate::report::ReportSink;
use crate::source;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;

/// Write PID file for external control via signals
fn write_pid_file() -> Option<PathBuf> {
    let pid_path = Config::runtime_dir().join("pid");

    // Ensure parent directory exists
    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(&pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path)
}

/// Remove PID file on shutdown
fn cleanup_pid_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove PID file: {}", e);
        }
    }
}

/// Echo every new log entry, one line each
fn spawn_entry_feed(mut entries: broadcast::Receiver<LogEntry>) {
    tokio::spawn(async move {
        loop {
            match entries.recv().await {
                Ok(entry) => tracing::info!(
                    "[{}] {} | {} | {} | {}",
                    entry.timestamp,
                    entry.status,
                    entry.extraction_status,
                    if entry.contract_address.is_empty() {
                        "(none)"
                    } else {
                        entry.contract_address.as_str()
                    },
                    entry.notification_text
                ),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("Log feed skipped {} entries", n)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
    backend: BackendConfigStore,
    pid_file_path: Option<PathBuf>,
}

impl Daemon {
    /// Create a new daemon with the given configuration and backend endpoint store
    pub fn new(config: Config, backend: BackendConfigStore) -> Self {
        Self {
            config,
            backend,
            pid_file_path: None,
        }
    }

    /// Run the daemon main loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting taprelay daemon");

        // Write PID file for external control via signals
        self.pid_file_path = write_pid_file();

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            crate::error::RelayError::Config(format!("Failed to set up SIGTERM handler: {}", e))
        })?;

        // Restore persisted history
        let log_path = self.config.resolve_log_path();
        let log = Arc::new(LogStore::open(&log_path, self.config.log.capacity)?);
        tracing::info!("Log store: {:?} ({} entries restored)", log_path, log.len());

        let sink = ReportSink::new(self.backend.clone(), &self.config.backend, log);
        spawn_entry_feed(sink.subscribe());

        let collaborators = Collaborators {
            clipboard: clipboard::create_gateway(&self.config.clipboard),
            gesture: gesture::create_dispatcher(&self.config.gesture),
            launcher: launcher::create_launcher(&self.config.launcher),
            reporter: Arc::new(sink),
        };
        tracing::info!(
            "Target app: {}, backend: {}",
            self.config.target.app,
            self.backend.endpoint_base_url()
        );
        tracing::info!(
            "Using {} and {}",
            collaborators.clipboard.name(),
            collaborators.gesture.name()
        );

        let settings = PipelineSettings::from(&self.config.pipeline);
        let (pipeline, mut pipeline_task) = Pipeline::spawn(settings, collaborators);

        let mut notification_source = source::create_source(&self.config);
        tracing::info!("Notification source: {}", notification_source.name());
        let mut notifications = notification_source.start().await?;

        let mut source_open = true;
        loop {
            tokio::select! {
                received = notifications.recv(), if source_open => {
                    match received {
                        Some(notification) => {
                            if !pipeline.submit(notification) {
                                tracing::error!("Pipeline stopped unexpectedly");
                                break;
                            }
                        }
                        None => {
                            tracing::info!("Notification source closed, finishing up");
                            source_open = false;
                            pipeline.drain();
                        }
                    }
                }

                // Drained (or crashed)
                _ = &mut pipeline_task => {
                    break;
                }

                // Handle graceful shutdown (SIGINT from Ctrl+C)
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                // Handle graceful shutdown (SIGTERM from systemctl stop)
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        // Remove PID file on shutdown
        if let Some(ref path) = self.pid_file_path {
            cleanup_pid_file(path);
        }

        tracing::info!("Daemon stopped");

        Ok(())
    }
}
