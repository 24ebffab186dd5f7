//! Pipeline integration tests with in-process collaborators
//!
//! Time is paused, so the 1500ms tap delay and 2000ms session timeout run
//! deterministically and instantly.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use taprelay::clipboard::ClipboardGateway;
use taprelay::error::{ClipboardError, GestureError, LaunchError};
use taprelay::gesture::{GestureDispatcher, GestureOutcome, TapPoint};
use taprelay::launcher::AppLauncher;
use taprelay::pipeline::{Collaborators, Pipeline, PipelineHandle, PipelineSettings};
use taprelay::report::Reporter;
use taprelay::session::{ExtractionStatus, FinalizedRecord, TargetNotification};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Default)]
struct FakeClipboard {
    text: Mutex<String>,
    clears: Mutex<usize>,
    /// Reads never return
    hang_reads: bool,
}

impl FakeClipboard {
    fn with_text(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_string()),
            ..Default::default()
        }
    }

    fn hanging_reads() -> Self {
        Self {
            hang_reads: true,
            ..Default::default()
        }
    }

    fn set(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ClipboardGateway for FakeClipboard {
    async fn clear(&self) -> Result<(), ClipboardError> {
        self.set("");
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }

    async fn read(&self) -> Result<String, ClipboardError> {
        if self.hang_reads {
            std::future::pending::<()>().await;
        }
        Ok(self.text.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "fake clipboard"
    }
}

/// What the fake host does when asked to tap
#[derive(Clone)]
enum TapBehavior {
    /// Complete after `delay`, optionally copying text first
    Complete { delay: Duration, copies: Option<String> },
    /// The nth tap copies `copies[n]` after `delay`
    CompleteEach { delay: Duration, copies: Vec<String> },
    /// Press, hold, release, copying nothing
    PressRelease { hold: Duration },
    Cancel,
    Fail,
}

struct FakeGesture {
    clipboard: Arc<FakeClipboard>,
    behavior: TapBehavior,
    taps: Mutex<Vec<(Instant, TapPoint)>>,
    strokes: Mutex<Vec<&'static str>>,
}

impl FakeGesture {
    fn new(clipboard: Arc<FakeClipboard>, behavior: TapBehavior) -> Self {
        Self {
            clipboard,
            behavior,
            taps: Mutex::new(Vec::new()),
            strokes: Mutex::new(Vec::new()),
        }
    }

    fn strokes(&self) -> Vec<&'static str> {
        self.strokes.lock().unwrap().clone()
    }

    fn taps(&self) -> Vec<(Instant, TapPoint)> {
        self.taps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GestureDispatcher for FakeGesture {
    async fn tap(&self, point: TapPoint) -> Result<GestureOutcome, GestureError> {
        let nth = {
            let mut taps = self.taps.lock().unwrap();
            taps.push((Instant::now(), point));
            taps.len() - 1
        };
        match &self.behavior {
            TapBehavior::CompleteEach { delay, copies } => {
                tokio::time::sleep(*delay).await;
                if let Some(text) = copies.get(nth) {
                    self.clipboard.set(text);
                }
                Ok(GestureOutcome::Completed)
            }
            TapBehavior::PressRelease { hold } => {
                self.strokes.lock().unwrap().push("press");
                tokio::time::sleep(*hold).await;
                self.strokes.lock().unwrap().push("release");
                Ok(GestureOutcome::Completed)
            }
            TapBehavior::Complete { delay, copies } => {
                tokio::time::sleep(*delay).await;
                if let Some(text) = copies {
                    self.clipboard.set(text);
                }
                Ok(GestureOutcome::Completed)
            }
            TapBehavior::Cancel => Ok(GestureOutcome::Cancelled),
            TapBehavior::Fail => Err(GestureError::DispatchFailed("no tap capability".into())),
        }
    }

    fn name(&self) -> &'static str {
        "fake gesture"
    }
}

#[derive(Default)]
struct FakeLauncher {
    fail: bool,
    /// Only the first open hangs
    hang_first: bool,
    opened: Mutex<Vec<String>>,
}

impl FakeLauncher {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn hanging_once() -> Self {
        Self {
            hang_first: true,
            ..Default::default()
        }
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AppLauncher for FakeLauncher {
    async fn open(&self, action: &str) -> Result<(), LaunchError> {
        let first = {
            let mut opened = self.opened.lock().unwrap();
            opened.push(action.to_string());
            opened.len() == 1
        };
        if self.hang_first && first {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(LaunchError::Failed("activity not found".into()));
        }
        Ok(())
    }
}

struct RecordingReporter {
    tx: mpsc::UnboundedSender<FinalizedRecord>,
}

impl Reporter for RecordingReporter {
    fn report(&self, record: FinalizedRecord) {
        let _ = self.tx.send(record);
    }
}

struct Harness {
    handle: PipelineHandle,
    task: JoinHandle<()>,
    reports: mpsc::UnboundedReceiver<FinalizedRecord>,
    clipboard: Arc<FakeClipboard>,
    gesture: Arc<FakeGesture>,
    launcher: Arc<FakeLauncher>,
}

impl Harness {
    fn start(clipboard: FakeClipboard, behavior: TapBehavior, launcher: FakeLauncher) -> Self {
        let clipboard = Arc::new(clipboard);
        let gesture = Arc::new(FakeGesture::new(Arc::clone(&clipboard), behavior));
        let launcher = Arc::new(launcher);
        let (tx, reports) = mpsc::unbounded_channel();

        let collaborators = Collaborators {
            clipboard: clipboard.clone(),
            gesture: gesture.clone(),
            launcher: launcher.clone(),
            reporter: Arc::new(RecordingReporter { tx }),
        };
        let (handle, task) = Pipeline::spawn(PipelineSettings::default(), collaborators);

        Self {
            handle,
            task,
            reports,
            clipboard,
            gesture,
            launcher,
        }
    }

    async fn next_report(&mut self) -> FinalizedRecord {
        self.reports.recv().await.expect("pipeline stopped")
    }

    /// Let every pending timer run, then assert nothing else was reported
    async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(self.reports.try_recv().is_err(), "unexpected extra report");
    }
}

fn copies(text: &str) -> TapBehavior {
    TapBehavior::Complete {
        delay: Duration::from_millis(100),
        copies: Some(text.to_string()),
    }
}

fn notification() -> TargetNotification {
    TargetNotification::new("FOMO", "New token detected", 1_731_384_721_000)
        .with_action("fomo://token/123")
}

#[tokio::test(start_paused = true)]
async fn test_successful_extraction() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("0xDEADBEEF"),
        FakeLauncher::default(),
    );
    let started = Instant::now();

    assert!(h.handle.submit(notification()));
    let record = h.next_report().await;

    assert_eq!(record.extraction_status, ExtractionStatus::Success);
    assert_eq!(record.contract_address, "0xDEADBEEF");
    assert_eq!(record.message(), "FOMO New token detected");
    assert_eq!(record.posted_at, 1_731_384_721_000);

    assert_eq!(h.launcher.opened(), vec!["fomo://token/123".to_string()]);
    let taps = h.gesture.taps();
    assert_eq!(taps.len(), 1);
    assert!(taps[0].0 - started >= Duration::from_millis(1500));
    assert_eq!(taps[0].1, TapPoint { x: 216, y: 81 });

    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_stale_clipboard_is_cleared_first() {
    // Tap completes but copies nothing; the old value must not be reported
    let mut h = Harness::start(
        FakeClipboard::with_text("0xSTALE"),
        TapBehavior::Complete {
            delay: Duration::from_millis(10),
            copies: None,
        },
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;

    assert_eq!(h.clipboard.clears(), 1);
    assert_eq!(record.extraction_status, ExtractionStatus::EmptyClipboard);
    assert_eq!(record.contract_address, "");
}

#[tokio::test(start_paused = true)]
async fn test_whitespace_clipboard_is_empty() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("  \n\t"),
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;
    assert_eq!(record.extraction_status, ExtractionStatus::EmptyClipboard);
    assert_eq!(record.contract_address, "");
}

#[tokio::test(start_paused = true)]
async fn test_clipboard_text_is_trimmed() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("  0xABC123\n"),
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;
    assert_eq!(record.extraction_status, ExtractionStatus::Success);
    assert_eq!(record.contract_address, "0xABC123");
}

#[tokio::test(start_paused = true)]
async fn test_slow_gesture_times_out() {
    // Tap at 1500ms, result at 2500ms; timeout at 2000ms wins
    let mut h = Harness::start(
        FakeClipboard::default(),
        TapBehavior::Complete {
            delay: Duration::from_millis(1000),
            copies: Some("0xLATE".into()),
        },
        FakeLauncher::default(),
    );
    let started = Instant::now();

    h.handle.submit(notification());
    let record = h.next_report().await;

    assert_eq!(record.extraction_status, ExtractionStatus::GestureTimedOut);
    assert_eq!(record.contract_address, "");
    assert!(Instant::now() - started >= Duration::from_millis(2000));

    // The late result must not produce a second report
    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_gesture() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        TapBehavior::Cancel,
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;
    assert_eq!(record.extraction_status, ExtractionStatus::GestureFailed);
    assert_eq!(record.contract_address, "");
    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_gesture_dispatch_failure() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        TapBehavior::Fail,
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;
    assert_eq!(record.extraction_status, ExtractionStatus::DispatchError);
    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_action_available() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("0xDEADBEEF"),
        FakeLauncher::default(),
    );
    let started = Instant::now();

    assert!(h.handle.on_target_notification("FOMO", "New token detected", 1000));
    let record = h.next_report().await;

    assert_eq!(record.extraction_status, ExtractionStatus::NoActionAvailable);
    assert_eq!(record.contract_address, "");
    // Finalized immediately, no timers involved
    assert_eq!(Instant::now() - started, Duration::ZERO);
    assert!(h.launcher.opened().is_empty());

    h.assert_quiet().await;
    assert!(h.gesture.taps().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_launch_failure() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("0xDEADBEEF"),
        FakeLauncher::failing(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;

    assert_eq!(record.extraction_status, ExtractionStatus::DispatchError);
    assert_eq!(record.contract_address, "");
    h.assert_quiet().await;
    assert!(h.gesture.taps().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_newer_notification_supersedes() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("0xSECOND"),
        FakeLauncher::default(),
    );
    let started = Instant::now();

    h.handle.submit(TargetNotification::new("FOMO", "first", 1).with_action("fomo://1"));
    tokio::time::sleep(Duration::from_millis(500)).await;
    h.handle.submit(TargetNotification::new("FOMO", "second", 2).with_action("fomo://2"));

    let first = h.next_report().await;
    assert_eq!(first.message(), "FOMO first");
    assert_eq!(first.extraction_status, ExtractionStatus::Superseded);
    assert_eq!(first.contract_address, "");

    let second = h.next_report().await;
    assert_eq!(second.message(), "FOMO second");
    assert_eq!(second.extraction_status, ExtractionStatus::Success);
    assert_eq!(second.contract_address, "0xSECOND");
    assert!(second.epoch > first.epoch);

    h.assert_quiet().await;

    // Only the second session's tap timer ever fired
    let taps = h.gesture.taps();
    assert_eq!(taps.len(), 1);
    assert!(taps[0].0 - started >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_late_tap_of_superseded_session_is_discarded() {
    // First tap starts at 1500ms and copies at 1800ms; the second
    // notification arrives at 1600ms while that tap is in flight
    let mut h = Harness::start(
        FakeClipboard::default(),
        TapBehavior::CompleteEach {
            delay: Duration::from_millis(300),
            copies: vec!["0xFIRST".into(), "0xSECOND".into()],
        },
        FakeLauncher::default(),
    );

    h.handle.submit(TargetNotification::new("FOMO", "first", 1).with_action("fomo://1"));
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(h.gesture.taps().len(), 1);
    h.handle.submit(TargetNotification::new("FOMO", "second", 2).with_action("fomo://2"));

    let first = h.next_report().await;
    assert_eq!(first.message(), "FOMO first");
    assert_eq!(first.extraction_status, ExtractionStatus::Superseded);
    assert_eq!(first.contract_address, "");

    let second = h.next_report().await;
    assert_eq!(second.message(), "FOMO second");
    assert_eq!(second.extraction_status, ExtractionStatus::Success);
    assert_eq!(second.contract_address, "0xSECOND");

    // The first tap's Completed result never produced a report of its own
    h.assert_quiet().await;
    assert_eq!(h.gesture.taps().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_mid_press_still_releases() {
    // Pressed at 1500ms, released at 2500ms; the session times out at 2000ms
    let mut h = Harness::start(
        FakeClipboard::default(),
        TapBehavior::PressRelease {
            hold: Duration::from_millis(1000),
        },
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;
    assert_eq!(record.extraction_status, ExtractionStatus::GestureTimedOut);
    assert_eq!(h.gesture.strokes(), vec!["press"]);

    h.assert_quiet().await;
    assert_eq!(h.gesture.strokes(), vec!["press", "release"]);
}

#[tokio::test(start_paused = true)]
async fn test_hung_launcher_does_not_stall_pipeline() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("0xNEXT"),
        FakeLauncher::hanging_once(),
    );
    let started = Instant::now();

    h.handle.submit(TargetNotification::new("FOMO", "first", 1).with_action("fomo://1"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.handle.submit(TargetNotification::new("FOMO", "second", 2).with_action("fomo://2"));

    let first = h.next_report().await;
    assert_eq!(first.message(), "FOMO first");
    assert_eq!(first.extraction_status, ExtractionStatus::DispatchError);
    assert!(Instant::now() - started <= Duration::from_millis(1000));

    let second = h.next_report().await;
    assert_eq!(second.extraction_status, ExtractionStatus::Success);
    assert_eq!(second.contract_address, "0xNEXT");
    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_hung_clipboard_read_is_empty() {
    let mut h = Harness::start(
        FakeClipboard::hanging_reads(),
        copies("0xUNREAD"),
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;
    assert_eq!(record.extraction_status, ExtractionStatus::EmptyClipboard);
    assert_eq!(record.contract_address, "");
    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_result_at_timeout_boundary_reports_once() {
    // Tap at 1500ms + 500ms = result at exactly the 2000ms timeout
    let mut h = Harness::start(
        FakeClipboard::default(),
        TapBehavior::Complete {
            delay: Duration::from_millis(500),
            copies: Some("0xEDGE".into()),
        },
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    let record = h.next_report().await;
    assert!(matches!(
        record.extraction_status,
        ExtractionStatus::Success | ExtractionStatus::GestureTimedOut
    ));
    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_sessions_in_sequence() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("0xSAME"),
        FakeLauncher::default(),
    );

    for n in 0..3 {
        h.handle.submit(TargetNotification::new("FOMO", format!("#{}", n), n).with_action("fomo://x"));
        let record = h.next_report().await;
        assert_eq!(record.extraction_status, ExtractionStatus::Success);
        assert_eq!(record.message(), format!("FOMO #{}", n));
    }

    assert_eq!(h.clipboard.clears(), 3);
    assert_eq!(h.gesture.taps().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_drain_waits_for_live_session() {
    let mut h = Harness::start(
        FakeClipboard::default(),
        copies("0xDRAINED"),
        FakeLauncher::default(),
    );

    h.handle.submit(notification());
    assert!(h.handle.drain());

    let record = h.next_report().await;
    assert_eq!(record.contract_address, "0xDRAINED");

    tokio::time::timeout(Duration::from_secs(1), &mut h.task)
        .await
        .expect("pipeline should stop after draining")
        .unwrap();
    assert!(!h.handle.submit(notification()));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handles_stops_pipeline() {
    let h = Harness::start(
        FakeClipboard::default(),
        copies("0xDEADBEEF"),
        FakeLauncher::default(),
    );

    let Harness { handle, task, .. } = h;
    drop(handle);
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("pipeline should stop")
        .unwrap();
}
