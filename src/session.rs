//! Extraction session state
//!
//! One session per triggering notification:
//! AwaitingAppOpen → AwaitingGestureResult → Finalized
//!
//! Sessions carry a monotonically increasing epoch. Timer firings and
//! gesture results are tagged with the epoch they were issued for, so
//! anything addressed to an older session is recognised as stale.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Monotonic session identifier
pub type Epoch = u64;

/// A notification from the target application, already filtered by app identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNotification {
    pub title: String,
    pub body: String,
    /// Post time in epoch milliseconds
    pub posted_at: i64,
    /// Primary action that opens the target app (deep link, desktop id...)
    pub action: Option<String>,
}

impl TargetNotification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, posted_at: i64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            posted_at,
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// Outcome of the extraction for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionStatus {
    Pending,
    Success,
    EmptyClipboard,
    GestureFailed,
    GestureTimedOut,
    NoActionAvailable,
    DispatchError,
    /// A newer notification took over before this session resolved.
    /// Only set on supersession; never the result of a gesture, timeout or
    /// clipboard read.
    Superseded,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Pending => "Pending",
            ExtractionStatus::Success => "Success",
            ExtractionStatus::EmptyClipboard => "EmptyClipboard",
            ExtractionStatus::GestureFailed => "GestureFailed",
            ExtractionStatus::GestureTimedOut => "GestureTimedOut",
            ExtractionStatus::NoActionAvailable => "NoActionAvailable",
            ExtractionStatus::DispatchError => "DispatchError",
            ExtractionStatus::Superseded => "Superseded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExtractionStatus::Pending)
    }

    /// Classify clipboard text read after a completed tap.
    ///
    /// Returns the status and the contract address to report. Content shape
    /// is not validated here.
    pub fn from_clipboard(text: &str) -> (ExtractionStatus, String) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            (ExtractionStatus::EmptyClipboard, String::new())
        } else {
            (ExtractionStatus::Success, trimmed.to_string())
        }
    }
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a live session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Clipboard cleared, opening the target app
    AwaitingAppOpen,
    /// App opened, tap scheduled, waiting for result or timeout
    AwaitingGestureResult,
    /// Terminal; the record has been handed to the reporter
    Finalized,
}

/// The unit of work for one notification
#[derive(Debug, Clone)]
pub struct ExtractionSession {
    pub epoch: Epoch,
    pub title: String,
    pub body: String,
    pub posted_at: i64,
    pub status: ExtractionStatus,
    pub contract_address: String,
    pub phase: Phase,
    pub started_at: Instant,
}

impl ExtractionSession {
    pub fn new(epoch: Epoch, notification: &TargetNotification) -> Self {
        Self {
            epoch,
            title: notification.title.clone(),
            body: notification.body.clone(),
            posted_at: notification.posted_at,
            status: ExtractionStatus::Pending,
            contract_address: String::new(),
            phase: Phase::AwaitingAppOpen,
            started_at: Instant::now(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Finalized
    }

    /// Move to the terminal phase and produce the record to report.
    ///
    /// Returns None if the session was already finalized, so a session
    /// can never be reported twice.
    pub fn finalize(
        &mut self,
        status: ExtractionStatus,
        contract_address: String,
    ) -> Option<FinalizedRecord> {
        if self.is_finalized() || !status.is_terminal() {
            return None;
        }
        self.phase = Phase::Finalized;
        self.status = status;
        self.contract_address = contract_address;

        Some(FinalizedRecord {
            epoch: self.epoch,
            title: self.title.clone(),
            body: self.body.clone(),
            posted_at: self.posted_at,
            extraction_status: status,
            contract_address: self.contract_address.clone(),
        })
    }
}

impl std::fmt::Display for ExtractionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.phase {
            Phase::AwaitingAppOpen => write!(f, "#{} opening app", self.epoch),
            Phase::AwaitingGestureResult => write!(
                f,
                "#{} awaiting tap ({:.1}s)",
                self.epoch,
                self.started_at.elapsed().as_secs_f32()
            ),
            Phase::Finalized => write!(f, "#{} finalized: {}", self.epoch, self.status),
        }
    }
}

/// Immutable result of a finished session, handed to the report sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedRecord {
    pub epoch: Epoch,
    pub title: String,
    pub body: String,
    pub posted_at: i64,
    pub extraction_status: ExtractionStatus,
    pub contract_address: String,
}

impl FinalizedRecord {
    /// Notification text as sent to the backend: title and body joined by a space
    pub fn message(&self) -> String {
        format!("{} {}", self.title, self.body)
    }
}
