//! ydotool-based tap simulation
//!
//! Moves the pointer to an absolute position and clicks the left button.
//! This works on all Wayland compositors because ydotool uses the uinput
//! kernel interface.
//!
//! Requires:
//! - ydotool installed
//! - ydotoold daemon running (systemctl --user start ydotool)
//! - User in 'input' group

use super::{GestureDispatcher, GestureOutcome, TapPoint};
use crate::error::GestureError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Left button press, without release
const LEFT_DOWN: &str = "0x40";
/// Left button release
const LEFT_UP: &str = "0x80";

/// ydotool-based tap dispatcher
pub struct YdotoolTap {
    /// How long the button is held
    press: Duration,
}

impl YdotoolTap {
    pub fn new(press_ms: u64) -> Self {
        Self {
            press: Duration::from_millis(press_ms),
        }
    }

    async fn run(args: &[&str]) -> Result<std::process::Output, GestureError> {
        Command::new("ydotool")
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GestureError::YdotoolNotFound
                } else {
                    GestureError::DispatchFailed(e.to_string())
                }
            })
    }
}

/// Map a failed ydotool invocation to a dispatch error
pub(crate) fn classify_failure(stderr: &str) -> GestureError {
    if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon") {
        GestureError::YdotoolNotRunning
    } else {
        GestureError::DispatchFailed(stderr.trim().to_string())
    }
}

#[async_trait::async_trait]
impl GestureDispatcher for YdotoolTap {
    async fn tap(&self, point: TapPoint) -> Result<GestureOutcome, GestureError> {
        tracing::debug!("Tapping at {} via ydotool", point);

        let x = point.x.to_string();
        let y = point.y.to_string();
        let moved = Self::run(&["mousemove", "--absolute", "-x", &x, "-y", &y]).await?;
        if !moved.status.success() {
            // Nothing has been dispatched yet
            return Err(classify_failure(&String::from_utf8_lossy(&moved.stderr)));
        }

        let pressed = Self::run(&["click", LEFT_DOWN]).await?;
        if !pressed.status.success() {
            tracing::warn!(
                "Tap press rejected: {}",
                String::from_utf8_lossy(&pressed.stderr).trim()
            );
            return Ok(GestureOutcome::Cancelled);
        }

        tokio::time::sleep(self.press).await;

        let released = Self::run(&["click", LEFT_UP]).await?;
        if !released.status.success() {
            tracing::warn!(
                "Tap release rejected: {}",
                String::from_utf8_lossy(&released.stderr).trim()
            );
            return Ok(GestureOutcome::Cancelled);
        }

        Ok(GestureOutcome::Completed)
    }

    fn name(&self) -> &'static str {
        "ydotool"
    }
}
