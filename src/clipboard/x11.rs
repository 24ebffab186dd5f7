//! X11 clipboard access
//!
//! Uses xclip against the CLIPBOARD selection.
//! This is the fallback for X11 sessions where wl-clipboard is unavailable.
//!
//! Requires: xclip package installed

use super::ClipboardGateway;
use crate::error::ClipboardError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// xclip based gateway
#[derive(Debug, Default)]
pub struct X11Clipboard;

impl X11Clipboard {
    pub fn new() -> Self {
        Self
    }
}

fn spawn_error(e: std::io::Error) -> ClipboardError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ClipboardError::XclipNotFound
    } else {
        ClipboardError::AccessFailed(e.to_string())
    }
}

#[async_trait::async_trait]
impl ClipboardGateway for X11Clipboard {
    async fn clear(&self) -> Result<(), ClipboardError> {
        // Owning the selection with empty content clears it
        let mut child = Command::new("xclip")
            .args(["-selection", "clipboard", "-i"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(b"")
                .await
                .map_err(|e| ClipboardError::AccessFailed(e.to_string()))?;
            drop(stdin);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ClipboardError::AccessFailed(e.to_string()))?;

        if !status.success() {
            return Err(ClipboardError::AccessFailed(
                "xclip exited with error".to_string(),
            ));
        }
        Ok(())
    }

    async fn read(&self) -> Result<String, ClipboardError> {
        let output = Command::new("xclip")
            .args(["-selection", "clipboard", "-o"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(spawn_error)?;

        // xclip fails when nobody owns the selection
        if !output.status.success() {
            tracing::debug!(
                "xclip -o failed, treating clipboard as empty: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(String::new());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &'static str {
        "clipboard (xclip)"
    }
}
