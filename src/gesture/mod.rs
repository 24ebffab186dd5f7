//! Gesture dispatch
//!
//! Asks the host to simulate a tap at a fixed screen coordinate and reports
//! whether the host completed or cancelled it.
//!
//! An `Err` means the capability itself is unavailable (tool missing, input
//! daemon not running); the pipeline treats that as a dispatch error. An
//! `Ok(GestureOutcome::Cancelled)` means the tap was requested but the host
//! did not carry it through.

pub mod ydotool;

use crate::config::{GestureBackend, GestureConfig, PipelineConfig};
use crate::error::GestureError;
use std::sync::Arc;

/// Absolute screen coordinate to tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapPoint {
    pub x: i32,
    pub y: i32,
}

impl TapPoint {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            x: config.tap_x,
            y: config.tap_y,
        }
    }
}

impl std::fmt::Display for TapPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Host-reported result of a dispatched tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Completed,
    Cancelled,
}

/// Trait for tap simulation implementations
#[async_trait::async_trait]
pub trait GestureDispatcher: Send + Sync {
    /// Perform a single tap at `point`
    async fn tap(&self, point: TapPoint) -> Result<GestureOutcome, GestureError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function that returns the configured dispatcher
pub fn create_dispatcher(config: &GestureConfig) -> Arc<dyn GestureDispatcher> {
    match config.backend {
        GestureBackend::Ydotool => Arc::new(ydotool::YdotoolTap::new(config.press_ms)),
    }
}
