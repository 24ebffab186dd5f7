//! Extraction pipeline
//!
//! A single actor owns the live [`ExtractionSession`]. Notification arrival,
//! timer firings and gesture results all arrive as [`Event`]s on one
//! mailbox and are handled one at a time, so no two transitions ever touch
//! the session concurrently.
//!
//! ```text
//!  notification ──▶ clear clipboard ──▶ open app ──┬─ no action ──▶ NoActionAvailable
//!                                                  ├─ open failed ─▶ DispatchError
//!                                                  ▼
//!                                       AwaitingGestureResult
//!                             (tap timer 1500ms, timeout timer 2000ms)
//!                                                  │
//!            ┌──────────────┬──────────────────────┼─────────────────────┐
//!            ▼              ▼                      ▼                     ▼
//!       completed       cancelled           dispatch error            timeout
//!     read clipboard   GestureFailed        DispatchError          GestureTimedOut
//!   Success / EmptyClipboard
//! ```
//!
//! Every timer and gesture task is tagged with the epoch of the session that
//! scheduled it. Events whose epoch is not the live session are dropped, which
//! is how a late gesture result or a timer from a superseded session is kept
//! out of the next session's outcome.
//!
//! Timers are aborted when their session finalizes. A tap already handed to
//! the gesture dispatcher is not: it runs to completion (a press is always
//! followed by its release) and its result is discarded by the epoch check.
//! Clipboard and launcher calls are bounded by `collaborator_timeout` so a
//! hung helper cannot stall the mailbox.

use crate::clipboard::ClipboardGateway;
use crate::config::PipelineConfig;
use crate::gesture::{GestureDispatcher, GestureOutcome, TapPoint};
use crate::launcher::AppLauncher;
use crate::report::Reporter;
use crate::session::{Epoch, ExtractionSession, ExtractionStatus, Phase, TargetNotification};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Timing and tap location for every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Wait between opening the app and requesting the tap
    pub app_open_delay: Duration,
    /// Budget after which a session without a gesture result is finalized
    pub session_timeout: Duration,
    pub tap_point: TapPoint,
    /// Limit on each clipboard or launcher call
    pub collaborator_timeout: Duration,
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            app_open_delay: Duration::from_millis(config.app_open_delay_ms),
            session_timeout: Duration::from_millis(config.session_timeout_ms),
            tap_point: TapPoint::from_config(config),
            collaborator_timeout: Duration::from_millis(config.collaborator_timeout_ms),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// External collaborators the pipeline drives
#[derive(Clone)]
pub struct Collaborators {
    pub clipboard: Arc<dyn ClipboardGateway>,
    pub gesture: Arc<dyn GestureDispatcher>,
    pub launcher: Arc<dyn AppLauncher>,
    pub reporter: Arc<dyn Reporter>,
}

/// Mailbox messages
#[derive(Debug)]
enum Event {
    Notification(TargetNotification),
    TapDue { epoch: Epoch },
    GestureResult {
        epoch: Epoch,
        result: Result<GestureOutcome, String>,
    },
    TimeoutFired { epoch: Epoch },
    /// Stop once the live session (if any) is finalized
    Drain,
}

/// Cloneable entry point used by notification sources
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl PipelineHandle {
    /// Deliver a notification already filtered to the target app.
    ///
    /// Returns false if the pipeline has stopped.
    pub fn submit(&self, notification: TargetNotification) -> bool {
        self.tx.send(Event::Notification(notification)).is_ok()
    }

    /// Ask the pipeline to stop after the live session resolves
    pub fn drain(&self) -> bool {
        self.tx.send(Event::Drain).is_ok()
    }

    /// Notification callback without an openable action
    pub fn on_target_notification(&self, title: &str, body: &str, posted_at: i64) -> bool {
        self.submit(TargetNotification::new(title, body, posted_at))
    }
}

/// The live session plus the timers scheduled on its behalf
struct ActiveSession {
    session: ExtractionSession,
    timers: Vec<JoinHandle<()>>,
}

impl ActiveSession {
    fn cancel_timers(&mut self) {
        for task in self.timers.drain(..) {
            task.abort();
        }
    }
}

/// The session state machine actor
pub struct Pipeline {
    settings: PipelineSettings,
    collaborators: Collaborators,
    rx: mpsc::UnboundedReceiver<Event>,
    /// Weak so that dropping every handle ends the actor
    weak_tx: mpsc::WeakUnboundedSender<Event>,
    next_epoch: Epoch,
    current: Option<ActiveSession>,
    draining: bool,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, collaborators: Collaborators) -> (Self, PipelineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Self {
            settings,
            collaborators,
            rx,
            weak_tx: tx.downgrade(),
            next_epoch: 1,
            current: None,
            draining: false,
        };
        (pipeline, PipelineHandle { tx })
    }

    /// Create the pipeline and run it on a background task
    pub fn spawn(
        settings: PipelineSettings,
        collaborators: Collaborators,
    ) -> (PipelineHandle, JoinHandle<()>) {
        let (pipeline, handle) = Self::new(settings, collaborators);
        let task = tokio::spawn(pipeline.run());
        (handle, task)
    }

    /// Process events until every handle has been dropped, or until a
    /// drain request has let the live session finish
    pub async fn run(mut self) {
        tracing::debug!(
            "Pipeline started (tap at {} after {:?}, timeout {:?})",
            self.settings.tap_point,
            self.settings.app_open_delay,
            self.settings.session_timeout
        );

        while let Some(event) = self.rx.recv().await {
            self.handle(event).await;
            if self.draining && self.current.is_none() {
                break;
            }
        }

        if let Some(mut active) = self.current.take() {
            active.cancel_timers();
            tracing::warn!("Pipeline stopped with session #{} in flight", active.session.epoch);
        }
        tracing::debug!("Pipeline stopped");
    }

    async fn handle(&mut self, event: Event) {
        match event {
            Event::Notification(notification) => self.start_session(notification).await,
            Event::TapDue { epoch } => self.request_tap(epoch),
            Event::GestureResult { epoch, result } => self.gesture_result(epoch, result).await,
            Event::TimeoutFired { epoch } => self.timeout_fired(epoch),
            Event::Drain => {
                if let Some(active) = self.current.as_ref() {
                    tracing::info!("Waiting for session #{} before stopping", active.session.epoch);
                }
                self.draining = true;
            }
        }
    }

    /// True if `epoch` is the session still waiting on a gesture
    fn is_awaiting_gesture(&self, epoch: Epoch) -> bool {
        self.current.as_ref().is_some_and(|active| {
            active.session.epoch == epoch && active.session.phase == Phase::AwaitingGestureResult
        })
    }

    async fn start_session(&mut self, notification: TargetNotification) {
        let epoch = self.next_epoch;
        self.next_epoch += 1;

        // Supersede whatever is still in flight
        if self.current.is_some() {
            tracing::info!("session={} superseded by a newer notification", self.live_epoch());
            self.finish(ExtractionStatus::Superseded, String::new());
        }

        tracing::info!(
            "session={} target notification: {:?} {:?} (posted {})",
            epoch,
            notification.title,
            notification.body,
            notification.posted_at
        );

        self.current = Some(ActiveSession {
            session: ExtractionSession::new(epoch, &notification),
            timers: Vec::new(),
        });

        let limit = self.settings.collaborator_timeout;

        // Best effort: a stale value would otherwise read as a fresh copy
        match within(limit, self.collaborators.clipboard.clear()).await {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                tracing::debug!("session={} clipboard clear failed (ignored): {}", epoch, e)
            }
            None => tracing::warn!("session={} clipboard clear timed out (ignored)", epoch),
        }

        let Some(action) = notification.action else {
            tracing::error!("session={} notification has no action to open the app", epoch);
            self.finish(ExtractionStatus::NoActionAvailable, String::new());
            return;
        };

        tracing::debug!("session={} opening target app", epoch);
        match within(limit, self.collaborators.launcher.open(&action)).await {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                tracing::error!("session={} failed to open notification: {}", epoch, e);
                self.finish(ExtractionStatus::DispatchError, String::new());
                return;
            }
            None => {
                tracing::error!("session={} opening the app timed out after {:?}", epoch, limit);
                self.finish(ExtractionStatus::DispatchError, String::new());
                return;
            }
        }

        let tap_timer = self.schedule(self.settings.app_open_delay, Event::TapDue { epoch });
        let timeout_timer =
            self.schedule(self.settings.session_timeout, Event::TimeoutFired { epoch });

        if let Some(active) = self.current.as_mut() {
            active.session.phase = Phase::AwaitingGestureResult;
            active.timers.push(tap_timer);
            active.timers.push(timeout_timer);
        }
    }

    fn request_tap(&mut self, epoch: Epoch) {
        if !self.is_awaiting_gesture(epoch) {
            tracing::debug!("session={} tap timer is stale, ignoring", epoch);
            return;
        }

        tracing::debug!(
            "session={} requesting tap at {} via {}",
            epoch,
            self.settings.tap_point,
            self.collaborators.gesture.name()
        );

        // Detached: aborting mid-tap could leave the button pressed
        let gesture = Arc::clone(&self.collaborators.gesture);
        let point = self.settings.tap_point;
        let tx = self.weak_tx.clone();
        tokio::spawn(async move {
            let result = gesture.tap(point).await.map_err(|e| e.to_string());
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Event::GestureResult { epoch, result });
            }
        });
    }

    async fn gesture_result(&mut self, epoch: Epoch, result: Result<GestureOutcome, String>) {
        if !self.is_awaiting_gesture(epoch) {
            tracing::debug!("session={} gesture result arrived late, ignoring", epoch);
            return;
        }

        match result {
            Ok(GestureOutcome::Completed) => {
                tracing::debug!("session={} tap completed, reading clipboard", epoch);
                // Stop the timeout before the read; the read happens inside this
                // transition so no other event can interleave with it
                if let Some(active) = self.current.as_mut() {
                    active.cancel_timers();
                }

                let limit = self.settings.collaborator_timeout;
                let text = match within(limit, self.collaborators.clipboard.read()).await {
                    Some(Ok(text)) => text,
                    Some(Err(e)) => {
                        tracing::warn!("session={} clipboard read failed: {}", epoch, e);
                        String::new()
                    }
                    None => {
                        tracing::warn!("session={} clipboard read timed out", epoch);
                        String::new()
                    }
                };

                let (status, address) = ExtractionStatus::from_clipboard(&text);
                if status == ExtractionStatus::EmptyClipboard {
                    tracing::warn!("session={} clipboard was empty after tap", epoch);
                } else {
                    tracing::info!("session={} contract address from clipboard: {}", epoch, address);
                }
                self.finish(status, address);
            }
            Ok(GestureOutcome::Cancelled) => {
                tracing::error!("session={} tap was cancelled by the host", epoch);
                self.finish(ExtractionStatus::GestureFailed, String::new());
            }
            Err(e) => {
                tracing::error!("session={} failed to dispatch tap: {}", epoch, e);
                self.finish(ExtractionStatus::DispatchError, String::new());
            }
        }
    }

    fn timeout_fired(&mut self, epoch: Epoch) {
        if !self.is_awaiting_gesture(epoch) {
            tracing::debug!("session={} timeout is stale, ignoring", epoch);
            return;
        }
        tracing::warn!("session={} timeout reached, reporting without contract address", epoch);
        self.finish(ExtractionStatus::GestureTimedOut, String::new());
    }

    fn live_epoch(&self) -> Epoch {
        self.current.as_ref().map(|a| a.session.epoch).unwrap_or_default()
    }

    /// Finalize the live session and hand it to the reporter exactly once
    fn finish(&mut self, status: ExtractionStatus, contract_address: String) {
        let Some(mut active) = self.current.take() else {
            return;
        };
        active.cancel_timers();

        if let Some(record) = active.session.finalize(status, contract_address) {
            tracing::info!(
                "session={} finalized: {} ({:.1}s)",
                record.epoch,
                record.extraction_status,
                active.session.started_at.elapsed().as_secs_f32()
            );
            self.collaborators.reporter.report(record);
        }
    }

    /// Send `event` to our own mailbox after `delay`
    fn schedule(&self, delay: Duration, event: Event) -> JoinHandle<()> {
        let tx = self.weak_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(event);
            }
        })
    }
}

/// Await `fut` for at most `limit`; None when it ran out of time
async fn within<F: Future>(limit: Duration, fut: F) -> Option<F::Output> {
    tokio::time::timeout(limit, fut).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = PipelineConfig {
            app_open_delay_ms: 1200,
            session_timeout_ms: 3000,
            tap_x: 10,
            tap_y: 20,
            collaborator_timeout_ms: 750,
        };
        let settings = PipelineSettings::from(&config);
        assert_eq!(settings.app_open_delay, Duration::from_millis(1200));
        assert_eq!(settings.session_timeout, Duration::from_millis(3000));
        assert_eq!(settings.tap_point, TapPoint { x: 10, y: 20 });
        assert_eq!(settings.collaborator_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.app_open_delay, Duration::from_millis(1500));
        assert_eq!(settings.session_timeout, Duration::from_millis(2000));
        assert_eq!(settings.collaborator_timeout, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_bounds_slow_futures() {
        let slow = tokio::time::sleep(Duration::from_secs(5));
        assert!(within(Duration::from_millis(100), slow).await.is_none());
        assert_eq!(within(Duration::from_millis(100), async { 7 }).await, Some(7));
    }
}
