mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{as_ref, pending, Call, Script, ScriptedBackend, WAIT};
use lumen::transfer::{STATUS_CANCELLED, STATUS_DONE, STATUS_PREPARING, STATUS_UNSUPPORTED};
use lumen::{BackendKind, TransferOrchestrator, TransferPhase, TransferState};
use tokio::runtime::Handle;
use tokio::time::timeout;

use BackendKind::{DeviceProtocol, Local};

fn orchestrator() -> TransferOrchestrator {
    TransferOrchestrator::new(Handle::current())
}

async fn wait_idle(orch: &TransferOrchestrator) -> TransferState {
    timeout(WAIT, orch.wait_idle()).await.expect("transfer did not finish")
}

async fn wait_for_status(orch: &TransferOrchestrator, status: &str) -> TransferState {
    let mut rx = orch.subscribe();
    let state = timeout(WAIT, rx.wait_for(|s| s.status == status))
        .await
        .expect("status never published")
        .expect("state channel closed")
        .clone();
    state
}

#[tokio::test(flavor = "multi_thread")]
async fn idle_before_any_transfer() {
    let orch = orchestrator();
    let s = orch.state();
    assert!(!s.is_transferring);
    assert_eq!(s.progress, 0.0);
    assert_eq!(s.phase, TransferPhase::Idle);
    assert!(s.filename.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_photo_to_device_ends_done() {
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::Succeed(vec![0.25, 0.5, 1.0]));
    let orch = orchestrator();

    orch.start_transfer(
        pending("photo.jpg", "/Users/z/photo.jpg", 204800, &local),
        as_ref(&device),
        "mtp://DCIM",
    );
    assert_eq!(orch.state().filename, "photo.jpg");

    let end = wait_idle(&orch).await;
    assert!(!end.is_transferring);
    assert_eq!(end.progress, 1.0);
    assert_eq!(end.status, STATUS_DONE);
    assert_eq!(end.filename, "photo.jpg");
    assert_eq!(end.phase, TransferPhase::Done);
    assert!(end.transfer_speed.is_empty() && end.time_remaining.is_empty());

    assert_eq!(
        device.calls(),
        vec![Call::Upload {
            source: PathBuf::from("/Users/z/photo.jpg"),
            dest_dir: "mtp://DCIM".into(),
        }]
    );
    assert!(local.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn start_publishes_preparing_synchronously() {
    let release = Arc::new(AtomicBool::new(false));
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::Hold(vec![], release.clone()));
    let orch = orchestrator();

    orch.start_transfer(pending("clip.mp4", "mtp://clip.mp4", 1, &device), as_ref(&local), "/tmp/in");
    let s = orch.state();
    assert!(s.is_transferring);
    assert!(orch.is_transferring());
    assert_eq!(s.progress, 0.0);
    assert!(s.status == STATUS_PREPARING || s.status.starts_with("step"));

    release.store(true, Ordering::SeqCst);
    wait_idle(&orch).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn second_start_is_ignored_while_busy() {
    let release = Arc::new(AtomicBool::new(false));
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let busy = ScriptedBackend::new(DeviceProtocol, Script::Hold(vec![0.5], release.clone()));
    let other = ScriptedBackend::new(DeviceProtocol, Script::Succeed(vec![1.0]));
    let orch = orchestrator();

    orch.start_transfer(pending("a.bin", "/data/a.bin", 10, &local), as_ref(&busy), "mtp://x");
    wait_for_status(&orch, "step 1").await;

    orch.start_transfer(pending("b.bin", "/data/b.bin", 10, &local), as_ref(&other), "mtp://y");
    let s = orch.state();
    assert_eq!(s.filename, "a.bin");
    assert_eq!(s.progress, 0.5);

    release.store(true, Ordering::SeqCst);
    let end = wait_idle(&orch).await;
    assert_eq!(end.filename, "a.bin");
    assert_eq!(end.phase, TransferPhase::Done);
    assert!(other.calls().is_empty(), "second request must never reach a backend");
    assert_eq!(busy.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn progress_never_moves_backwards() {
    let release = Arc::new(AtomicBool::new(false));
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::Hold(vec![0.6, 0.3], release.clone()));
    let orch = orchestrator();

    orch.start_transfer(pending("v.mov", "/v.mov", 100, &local), as_ref(&device), "mtp://Movies");
    let s = wait_for_status(&orch, "step 2").await;
    assert_eq!(s.progress, 0.6);
    assert_eq!(s.phase, TransferPhase::Transferring);

    release.store(true, Ordering::SeqCst);
    assert_eq!(wait_idle(&orch).await.progress, 1.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn observed_progress_is_monotonic_and_in_range() {
    let steps: Vec<f64> = (0..=50).map(|i| i as f64 / 50.0).chain([1.7, -0.4]).collect();
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::Succeed(steps));
    let orch = orchestrator();

    let mut rx = orch.subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let s = rx.borrow_and_update().clone();
            seen.push(s.clone());
            if s.phase.is_terminal() {
                return seen;
            }
            if rx.changed().await.is_err() {
                return seen;
            }
        }
    });

    orch.start_transfer(pending("a.raw", "/a.raw", 1, &local), as_ref(&device), "mtp://");
    let seen = timeout(WAIT, watcher).await.unwrap().unwrap();

    let active: Vec<f64> = seen.iter().filter(|s| s.is_transferring).map(|s| s.progress).collect();
    assert!(active.windows(2).all(|w| w[0] <= w[1]), "{active:?}");
    assert!(active.iter().all(|p| (0.0..=1.0).contains(p)));
    let last = seen.last().unwrap();
    assert_eq!(last.phase, TransferPhase::Done);
    assert_eq!(last.progress, 1.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn backend_error_surfaces_message() {
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::Fail("disk full"));
    let orch = orchestrator();

    orch.start_transfer(pending("big.iso", "/big.iso", 1 << 30, &local), as_ref(&device), "mtp://");
    let end = wait_idle(&orch).await;
    assert!(!end.is_transferring);
    assert_eq!(end.status, "Error: disk full");
    assert_eq!(end.phase, TransferPhase::Error);
    assert_eq!(end.progress, 0.0);
    assert_eq!(end.filename, "big.iso");
}

#[tokio::test(flavor = "multi_thread")]
async fn backend_reported_cancel_is_an_error() {
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::AbortOnItsOwn);
    let orch = orchestrator();

    orch.start_transfer(pending("clip.mp4", "/clip.mp4", 4096, &local), as_ref(&device), "mtp://Movies");
    let end = wait_idle(&orch).await;
    assert!(!end.is_transferring);
    assert_eq!(end.phase, TransferPhase::Error);
    assert_eq!(end.status, "Error: Operation cancelled by user");
    assert_ne!(end.status, STATUS_CANCELLED);
    assert_eq!(end.progress, 0.0);
    assert_eq!(end.filename, "clip.mp4");
}

#[tokio::test(flavor = "multi_thread")]
async fn new_transfer_allowed_after_failure() {
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let failing = ScriptedBackend::new(DeviceProtocol, Script::Fail("device disconnected"));
    let working = ScriptedBackend::new(DeviceProtocol, Script::Succeed(vec![1.0]));
    let orch = orchestrator();

    orch.start_transfer(pending("a", "/a", 1, &local), as_ref(&failing), "mtp://");
    assert_eq!(wait_idle(&orch).await.phase, TransferPhase::Error);

    orch.start_transfer(pending("b", "/b", 1, &local), as_ref(&working), "mtp://");
    let end = wait_idle(&orch).await;
    assert_eq!(end.filename, "b");
    assert_eq!(end.status, STATUS_DONE);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_wins_over_late_progress_and_completion() {
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::IgnoreCancel);
    let orch = orchestrator();

    orch.start_transfer(pending("slow.bin", "/slow.bin", 1, &local), as_ref(&device), "mtp://");
    wait_for_status(&orch, "working").await;

    orch.cancel();
    let s = orch.state();
    assert!(!s.is_transferring);
    assert_eq!(s.status, STATUS_CANCELLED);
    assert_eq!(s.phase, TransferPhase::Cancelled);

    // The worker reports 0.9 and returns Ok after noticing the token.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let s = orch.state();
    assert_eq!(s.status, STATUS_CANCELLED);
    assert_eq!(s.progress, 0.0);
    assert!(!s.is_transferring);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_is_idempotent_and_noop_when_idle() {
    let orch = orchestrator();
    orch.cancel();
    assert_eq!(orch.state(), TransferState::default());

    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::Succeed(vec![1.0]));
    orch.start_transfer(pending("a", "/a", 1, &local), as_ref(&device), "mtp://");
    let done = wait_idle(&orch).await;
    orch.cancel();
    orch.cancel();
    assert_eq!(orch.state(), done, "cancel after completion must not change the state");
}

#[tokio::test(flavor = "multi_thread")]
async fn device_to_device_is_unsupported_and_touches_nothing() {
    let a = ScriptedBackend::new(DeviceProtocol, Script::Succeed(vec![1.0]));
    let b = ScriptedBackend::new(DeviceProtocol, Script::Succeed(vec![1.0]));
    let orch = orchestrator().with_unsupported_delay(Duration::from_millis(50));

    orch.start_transfer(pending("img.png", "mtp://img.png", 5, &a), as_ref(&b), "mtp://Backup");
    let during = orch.state();
    assert!(during.is_transferring);

    let end = wait_idle(&orch).await;
    assert!(!end.is_transferring);
    assert_eq!(end.status, STATUS_UNSUPPORTED);
    assert_eq!(end.phase, TransferPhase::Unsupported);
    assert_eq!(end.progress, 0.0);
    assert!(a.calls().is_empty());
    assert!(b.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unsupported_placeholder_can_be_cancelled() {
    let a = ScriptedBackend::new(DeviceProtocol, Script::Succeed(vec![]));
    let b = ScriptedBackend::new(DeviceProtocol, Script::Succeed(vec![]));
    let orch = orchestrator().with_unsupported_delay(Duration::from_secs(60));

    orch.start_transfer(pending("x", "mtp://x", 1, &a), as_ref(&b), "mtp://y");
    wait_for_status(&orch, STATUS_UNSUPPORTED).await;
    orch.cancel();

    let end = wait_idle(&orch).await;
    assert_eq!(end.phase, TransferPhase::Cancelled);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orch.state().phase, TransferPhase::Cancelled);
}

#[tokio::test(flavor = "multi_thread")]
async fn clones_share_one_slot() {
    let release = Arc::new(AtomicBool::new(false));
    let local = ScriptedBackend::new(Local, Script::Succeed(vec![]));
    let device = ScriptedBackend::new(DeviceProtocol, Script::Hold(vec![0.1], release.clone()));
    let orch = orchestrator();
    let other = orch.clone();

    orch.start_transfer(pending("a", "/a", 1, &local), as_ref(&device), "mtp://");
    assert!(other.is_transferring());
    other.cancel();
    assert_eq!(orch.state().phase, TransferPhase::Cancelled);
    release.store(true, Ordering::SeqCst);
}
