//! Notification sources
//!
//! A source delivers notifications posted by the target application. The
//! host-specific part (how notifications are observed) lives outside the
//! process; sources accept a small JSON description of each one:
//!
//! ```json
//! {"app": "family.fomo.app", "title": "FOMO", "body": "New token detected",
//!  "postedAt": 1731384721000, "action": "fomo://token/123"}
//! ```
//!
//! Sources filter by application identity, so the pipeline only ever sees
//! notifications from the configured target app.

pub mod http;
pub mod jsonl;

use crate::config::{Config, SourceKind};
use crate::error::SourceError;
use crate::session::TargetNotification;
use serde::Deserialize;
use tokio::sync::mpsc;

/// Channel depth between a source and the daemon loop
pub(crate) const CHANNEL_CAPACITY: usize = 64;

/// A notification as described by the host, before filtering
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingNotification {
    /// Posting application identity
    pub app: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Epoch milliseconds; defaults to arrival time
    #[serde(default)]
    pub posted_at: Option<i64>,
    #[serde(default)]
    pub action: Option<String>,
}

impl IncomingNotification {
    /// Keep only notifications posted by `target_app`
    pub fn into_target(self, target_app: &str) -> Option<TargetNotification> {
        if self.app != target_app {
            tracing::trace!("Ignoring notification from {}", self.app);
            return None;
        }

        Some(TargetNotification {
            title: self.title,
            body: self.body,
            posted_at: self
                .posted_at
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
            action: self.action.filter(|a| !a.trim().is_empty()),
        })
    }
}

/// Trait for notification source implementations
#[async_trait::async_trait]
pub trait NotificationSource: Send {
    /// Start delivering target notifications.
    /// The channel closes when the source is exhausted.
    async fn start(&mut self) -> Result<mpsc::Receiver<TargetNotification>, SourceError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function for the configured source
pub fn create_source(config: &Config) -> Box<dyn NotificationSource> {
    match config.source.kind {
        SourceKind::Stdin => Box::new(jsonl::JsonLinesSource::stdin(config.target.app.clone())),
        SourceKind::Http => Box::new(http::HttpSource::new(
            config.source.listen.clone(),
            config.target.app.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(app: &str) -> IncomingNotification {
        IncomingNotification {
            app: app.to_string(),
            title: "FOMO".to_string(),
            body: "New token detected".to_string(),
            posted_at: Some(1000),
            action: Some("fomo://open".to_string()),
        }
    }

    #[test]
    fn test_filters_other_apps() {
        assert!(incoming("com.example.chat").into_target("family.fomo.app").is_none());
    }

    #[test]
    fn test_keeps_target_app() {
        let n = incoming("family.fomo.app").into_target("family.fomo.app").unwrap();
        assert_eq!(n.title, "FOMO");
        assert_eq!(n.body, "New token detected");
        assert_eq!(n.posted_at, 1000);
        assert_eq!(n.action.as_deref(), Some("fomo://open"));
    }

    #[test]
    fn test_blank_action_is_no_action() {
        let mut n = incoming("family.fomo.app");
        n.action = Some("  ".to_string());
        assert!(n.into_target("family.fomo.app").unwrap().action.is_none());
    }

    #[test]
    fn test_missing_post_time_uses_now() {
        let mut n = incoming("family.fomo.app");
        n.posted_at = None;
        let before = chrono::Utc::now().timestamp_millis();
        let target = n.into_target("family.fomo.app").unwrap();
        assert!(target.posted_at >= before);
    }

    #[test]
    fn test_factory_names() {
        let mut config = Config::default();
        assert_eq!(create_source(&config).name(), "stdin (json lines)");
        config.source.kind = SourceKind::Http;
        assert_eq!(create_source(&config).name(), "http");
    }
}
