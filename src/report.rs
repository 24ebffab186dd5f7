//! Report sink
//!
//! Posts a finalized session to the backend and records the outcome in the
//! log store. Exactly one log entry is written per report, whatever happens
//! on the wire; nothing is retried.
//!
//! Wire format:
//!
//! ```text
//! POST <endpoint_base_url>/api/notifications
//! Content-Type: application/json; charset=utf-8
//!
//! {"message": "<title> <body>", "contractAddress": "<address or empty>"}
//! ```

use crate::config::{BackendConfig, BackendConfigStore};
use crate::error::ReportError;
use crate::logstore::{LogEntry, LogStore};
use crate::session::FinalizedRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Path appended to the backend base URL
pub const NOTIFICATIONS_PATH: &str = "api/notifications";

const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Something that accepts finalized sessions without blocking the caller
pub trait Reporter: Send + Sync {
    fn report(&self, record: FinalizedRecord);
}

/// JSON body sent to the backend
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload<'a> {
    pub message: &'a str,
    pub contract_address: &'a str,
}

/// Build the report URL with exactly one slash between base and path
pub fn endpoint_url(base: &str) -> String {
    format!("{}/{}", base.trim().trim_end_matches('/'), NOTIFICATIONS_PATH)
}

/// How a single report attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// 2xx response
    Delivered { code: u16, body: String },
    /// Any other HTTP response
    Rejected { code: u16, body: String },
    /// The request never completed
    Failed(String),
    /// The request could not be built
    Exception(String),
}

impl ReportOutcome {
    fn from_response(code: u16, body: String) -> Self {
        if (200..300).contains(&code) {
            ReportOutcome::Delivered { code, body }
        } else {
            ReportOutcome::Rejected { code, body }
        }
    }

    /// Status column of the log entry
    pub fn status(&self) -> String {
        match self {
            ReportOutcome::Delivered { code, .. } => format!("SUCCESS ({})", code),
            ReportOutcome::Rejected { code, .. } => format!("ERROR ({})", code),
            ReportOutcome::Failed(_) => "FAILED".to_string(),
            ReportOutcome::Exception(_) => "EXCEPTION".to_string(),
        }
    }

    /// Response column of the log entry
    pub fn response(&self) -> String {
        match self {
            ReportOutcome::Delivered { body, .. } | ReportOutcome::Rejected { body, .. } => {
                body.clone()
            }
            ReportOutcome::Failed(detail) | ReportOutcome::Exception(detail) => {
                format!("Error: {}", detail)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReportOutcome::Delivered { .. })
    }
}

/// Validate the endpoint and serialize the body
fn prepare(base: &str, message: &str, contract_address: &str) -> Result<(String, String), ReportError> {
    let endpoint = endpoint_url(base);
    let parsed = url::Url::parse(&endpoint)
        .map_err(|e| ReportError::InvalidUrl(endpoint.clone(), e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ReportError::InvalidUrl(
            endpoint,
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }

    let body = serde_json::to_string(&ReportPayload {
        message,
        contract_address,
    })?;

    Ok((parsed.into(), body))
}

/// Posts finalized sessions to the backend and logs every outcome
#[derive(Clone)]
pub struct ReportSink {
    backend: BackendConfigStore,
    agent: ureq::Agent,
    log: Arc<LogStore>,
    entries_tx: broadcast::Sender<LogEntry>,
}

impl ReportSink {
    pub fn new(backend: BackendConfigStore, config: &BackendConfig, log: Arc<LogStore>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .timeout_write(Duration::from_secs(config.connect_timeout_secs))
            .timeout_read(Duration::from_secs(config.request_timeout_secs))
            .build();
        let (entries_tx, _) = broadcast::channel(64);

        Self {
            backend,
            agent,
            log,
            entries_tx,
        }
    }

    /// Live feed of appended log entries for a presentation layer
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.entries_tx.subscribe()
    }

    pub fn log_store(&self) -> &Arc<LogStore> {
        &self.log
    }

    /// POST one JSON body, blocking until the backend answers
    fn post(&self, url: &str, body: &str) -> ReportOutcome {
        match self
            .agent
            .post(url)
            .set("Content-Type", CONTENT_TYPE)
            .send_string(body)
        {
            Ok(response) => {
                let code = response.status();
                ReportOutcome::from_response(code, response.into_string().unwrap_or_default())
            }
            Err(ureq::Error::Status(code, response)) => {
                ReportOutcome::from_response(code, response.into_string().unwrap_or_default())
            }
            Err(ureq::Error::Transport(t)) => ReportOutcome::Failed(t.to_string()),
        }
    }

    /// Send a record to the backend currently configured
    pub fn send(&self, record: &FinalizedRecord) -> ReportOutcome {
        // Re-read on every send; the settings surface may have changed it
        let base = self.backend.endpoint_base_url();
        let message = record.message();

        let (url, body) = match prepare(&base, &message, &record.contract_address) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!("Error building report for session #{}: {}", record.epoch, e);
                return ReportOutcome::Exception(e.to_string());
            }
        };

        tracing::debug!("Sending to backend {}: {}", url, body);
        let outcome = self.post(&url, &body);

        match &outcome {
            ReportOutcome::Delivered { code, .. } => {
                tracing::info!("Report #{} delivered ({})", record.epoch, code)
            }
            ReportOutcome::Rejected { code, .. } => {
                tracing::error!("Backend rejected report #{} ({})", record.epoch, code)
            }
            ReportOutcome::Failed(e) => {
                tracing::error!("Failed to send report #{} to backend: {}", record.epoch, e)
            }
            ReportOutcome::Exception(_) => {}
        }

        outcome
    }

    /// Send a record and append exactly one log entry describing the result
    pub fn deliver(&self, record: &FinalizedRecord) -> LogEntry {
        let outcome = self.send(record);
        let entry = LogEntry::now(
            outcome.status(),
            record.message(),
            record.contract_address.clone(),
            record.extraction_status.as_str(),
            outcome.response(),
        );

        if let Err(e) = self.log.append(entry.clone()) {
            tracing::error!("Error saving log entry to persistent storage: {}", e);
        }
        // No subscribers is fine
        let _ = self.entries_tx.send(entry.clone());

        entry
    }

    /// Post a fixed test payload to `base`, without touching the log store
    pub fn test_connection(&self, base: &str) -> ReportOutcome {
        match prepare(base, "TEST This is a test notification", "0xTEST") {
            Ok((url, body)) => self.post(&url, &body),
            Err(e) => ReportOutcome::Exception(e.to_string()),
        }
    }
}

impl Reporter for ReportSink {
    fn report(&self, record: FinalizedRecord) {
        let sink = self.clone();
        // ureq is blocking; keep it off the async workers
        tokio::task::spawn_blocking(move || {
            sink.deliver(&record);
        });
    }
}
