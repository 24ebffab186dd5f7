//! Taprelay: notification-triggered contract address relay
//!
//! This library provides the core functionality for:
//! - Receiving notifications from a host monitor (JSON lines or local HTTP)
//! - Opening the target app and tapping its copy control via ydotool
//! - Reading the copied address via wl-clipboard or xclip
//! - Reporting each outcome to a backend and keeping a bounded local log
//!
//! # Architecture
//!
//! ```text
//!                            ┌─────────────────────────────────────┐
//!                            │              Daemon                 │
//!                            └─────────────────────────────────────┘
//!                                            │
//!                   ┌────────────────────────┼────────────────────────┐
//!                   │                        │                        │
//!                   ▼                        ▼                        ▼
//!          ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!          │ Notification │         │   Backend    │         │  Log Store   │
//!          │    Source    │         │ Config Store │         │ (50 entries) │
//!          └──────────────┘         └──────────────┘         └──────────────┘
//!                   │                        │                        ▲
//!                   │ target notification    │ base URL               │
//!                   ▼                        │                        │
//!          ┌─────────────────────────────────┼──────────────┐         │
//!          │          Extraction Pipeline    │              │         │
//!          │  clear clipboard ─▶ open app ─▶ tap ─▶ read    │         │
//!          │        (epoch-guarded timers, one session)     │         │
//!          └─────────────────────────────────┼──────────────┘         │
//!                                            │ finalized record       │
//!                                            ▼                        │
//!                                   ┌──────────────┐                  │
//!                                   │ Report Sink  │──────────────────┘
//!                                   │    (ureq)    │  one entry per report
//!                                   └──────────────┘
//!                                            │
//!                                            ▼
//!                                POST <base>/api/notifications
//! ```

pub mod cli;
pub mod clipboard;
pub mod config;
pub mod daemon;
pub mod error;
pub mod gesture;
pub mod launcher;
pub mod logstore;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod source;

pub use cli::{Cli, Commands};
pub use config::{BackendConfigStore, Config};
pub use daemon::Daemon;
pub use error::{RelayError, Result};
pub use logstore::{LogEntry, LogStore};
pub use pipeline::{Collaborators, Pipeline, PipelineHandle, PipelineSettings};
pub use report::{ReportSink, Reporter};
pub use session::{ExtractionStatus, FinalizedRecord, TargetNotification};
