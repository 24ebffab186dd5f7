//! Wayland clipboard access
//!
//! Uses wl-paste to read and wl-copy --clear to clear the Wayland clipboard.
//!
//! Requires: wl-clipboard package installed

use super::ClipboardGateway;
use crate::error::ClipboardError;
use std::process::Stdio;
use tokio::process::Command;

/// wl-clipboard based gateway
#[derive(Debug, Default)]
pub struct WaylandClipboard;

impl WaylandClipboard {
    pub fn new() -> Self {
        Self
    }
}

fn spawn_error(e: std::io::Error) -> ClipboardError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ClipboardError::WlClipboardNotFound
    } else {
        ClipboardError::AccessFailed(e.to_string())
    }
}

/// wl-paste exits non-zero when there is no selection; that is an empty read
pub(crate) fn is_empty_selection(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("nothing is copied") || stderr.contains("no selection")
}

#[async_trait::async_trait]
impl ClipboardGateway for WaylandClipboard {
    async fn clear(&self) -> Result<(), ClipboardError> {
        let status = Command::new("wl-copy")
            .arg("--clear")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(spawn_error)?;

        if !status.success() {
            return Err(ClipboardError::AccessFailed(
                "wl-copy --clear exited with error".to_string(),
            ));
        }
        Ok(())
    }

    async fn read(&self) -> Result<String, ClipboardError> {
        let output = Command::new("wl-paste")
            .args(["--no-newline", "--type", "text/plain"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_empty_selection(&stderr) {
                return Ok(String::new());
            }
            return Err(ClipboardError::AccessFailed(stderr.trim().to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!("Read {} chars from clipboard via wl-paste", text.len());
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "clipboard (wl-clipboard)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selection_messages() {
        assert!(is_empty_selection("Nothing is copied\n"));
        assert!(is_empty_selection("No selection"));
        assert!(!is_empty_selection("Failed to connect to a Wayland server"));
    }
}
