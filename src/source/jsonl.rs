//! Newline-delimited JSON notification source
//!
//! Reads one notification object per line, typically piped in from a host
//! notification monitor. Malformed lines are logged and skipped.

use super::{IncomingNotification, NotificationSource, CHANNEL_CAPACITY};
use crate::error::SourceError;
use crate::session::TargetNotification;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// JSON-lines source over any async reader
pub struct JsonLinesSource {
    reader: Option<Box<dyn AsyncBufRead + Unpin + Send>>,
    target_app: String,
}

impl JsonLinesSource {
    pub fn new(reader: Box<dyn AsyncBufRead + Unpin + Send>, target_app: String) -> Self {
        Self {
            reader: Some(reader),
            target_app,
        }
    }

    /// Read notifications from standard input
    pub fn stdin(target_app: String) -> Self {
        Self::new(Box::new(BufReader::new(tokio::io::stdin())), target_app)
    }
}

/// Parse one line. Blank lines and other apps yield `Ok(None)`.
pub fn parse_line(line: &str, target_app: &str) -> Result<Option<TargetNotification>, SourceError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let incoming: IncomingNotification =
        serde_json::from_str(line).map_err(|e| SourceError::Malformed(e.to_string()))?;
    Ok(incoming.into_target(target_app))
}

#[async_trait::async_trait]
impl NotificationSource for JsonLinesSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<TargetNotification>, SourceError> {
        let reader = self.reader.take().ok_or(SourceError::AlreadyStarted)?;
        let target_app = self.target_app.clone();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Notification input failed: {}", e);
                        break;
                    }
                };

                match parse_line(&line, &target_app) {
                    Ok(Some(notification)) => {
                        if tx.send(notification).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Skipping line: {}", e),
                }
            }
            tracing::debug!("Notification input closed");
        });

        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "stdin (json lines)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "family.fomo.app";

    #[test]
    fn test_parse_line() {
        let line = r#"{"app":"family.fomo.app","title":"FOMO","body":"New token detected","postedAt":1000,"action":"fomo://x"}"#;
        let n = parse_line(line, TARGET).unwrap().unwrap();
        assert_eq!(n.title, "FOMO");
        assert_eq!(n.posted_at, 1000);
        assert_eq!(n.action.as_deref(), Some("fomo://x"));
    }

    #[test]
    fn test_parse_blank_and_foreign() {
        assert!(parse_line("   ", TARGET).unwrap().is_none());
        assert!(parse_line(r#"{"app":"other"}"#, TARGET).unwrap().is_none());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_line("{nope", TARGET),
            Err(SourceError::Malformed(_))
        ));
        // app is required
        assert!(parse_line(r#"{"title":"FOMO"}"#, TARGET).is_err());
    }

    #[tokio::test]
    async fn test_stream_skips_bad_lines() {
        let input = concat!(
            "{\"app\":\"family.fomo.app\",\"title\":\"A\",\"body\":\"one\",\"postedAt\":1}\n",
            "garbage\n",
            "{\"app\":\"com.other\",\"title\":\"B\"}\n",
            "\n",
            "{\"app\":\"family.fomo.app\",\"title\":\"C\",\"body\":\"two\",\"postedAt\":2}\n",
        );
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(BufReader::new(input.as_bytes()));
        let mut source = JsonLinesSource::new(reader, TARGET.to_string());

        let mut rx = source.start().await.unwrap();
        assert_eq!(rx.recv().await.unwrap().title, "A");
        assert_eq!(rx.recv().await.unwrap().title, "C");
        assert!(rx.recv().await.is_none());

        assert!(matches!(source.start().await, Err(SourceError::AlreadyStarted)));
    }
}
