//! Single-flight transfer orchestration.
//!
//! All state changes go through one `watch` sender, whose modify closures are
//! serialized; observers only ever see whole snapshots. The in-flight
//! cancellation token is only touched from inside those closures, so the
//! busy check, the token swap and the published state always move together.
//!
//! Notes:
//! - Backend I/O runs on the runtime's blocking pool.
//! - Progress arriving after `cancel()` is discarded: every update is checked
//!   against the flight's token inside the serialized closure.
//! - No timeouts: a hung backend keeps the slot busy until it returns or is cancelled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::direction::Plan;
use super::item::{BackendRef, PendingTransfer};
use super::backend::Progress;
use super::state::{
    TransferPhase, TransferState, STATUS_CANCELLED, STATUS_DONE, STATUS_UNSUPPORTED,
};
use crate::errors::TransferError;

/// How long the device-to-device placeholder stays busy before finishing.
pub const DEFAULT_UNSUPPORTED_DELAY: Duration = Duration::from_secs(2);

enum Outcome {
    Done,
    Unsupported,
    Failed(TransferError),
}

struct Shared {
    state: watch::Sender<TransferState>,
    flight: Mutex<Option<CancellationToken>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// Apply a backend progress report unless the flight was cancelled.
    fn apply_progress(&self, token: &CancellationToken, p: Progress) {
        let applied = self.state.send_if_modified(|s| {
            if token.is_cancelled() || !s.is_transferring {
                return false;
            }
            if p.fraction.is_finite() {
                // Never move backwards within one flight.
                s.progress = s.progress.max(p.fraction.clamp(0.0, 1.0));
            }
            s.status = p.status;
            if let Some(speed) = p.speed {
                s.transfer_speed = speed;
            }
            if let Some(eta) = p.time_remaining {
                s.time_remaining = eta;
            }
            s.phase = TransferPhase::Transferring;
            true
        });
        if !applied {
            trace!("Discarded stale progress update");
        }
    }

    /// Replace the status text only (placeholder paths that report no progress).
    fn set_status(&self, token: &CancellationToken, status: &str) {
        self.state.send_if_modified(|s| {
            if token.is_cancelled() || !s.is_transferring {
                return false;
            }
            s.status = status.to_string();
            true
        });
    }

    fn finish(&self, token: &CancellationToken, filename: &str, outcome: Outcome) {
        let mut phase = TransferPhase::Idle;
        let applied = self.state.send_if_modified(|s| {
            if token.is_cancelled() {
                return false;
            }
            lock(&self.flight).take();
            match &outcome {
                Outcome::Done => s.finish(TransferPhase::Done, STATUS_DONE),
                Outcome::Unsupported => s.finish(TransferPhase::Unsupported, STATUS_UNSUPPORTED),
                Outcome::Failed(e) => s.finish(TransferPhase::Error, format!("Error: {e}")),
            }
            phase = s.phase;
            true
        });

        if !applied {
            debug!(file = filename, "Transfer finished after cancellation; result ignored");
            return;
        }
        match outcome {
            Outcome::Failed(e) if phase == TransferPhase::Error => {
                error!(file = filename, code = e.code(), error = %e, "Transfer failed")
            }
            Outcome::Unsupported => warn!(file = filename, "Device-to-device transfer is not supported"),
            _ => info!(file = filename, %phase, "Transfer finished"),
        }
    }
}

/// Runs at most one transfer at a time and publishes its state.
///
/// Cloning is cheap; clones share the same slot and state.
#[derive(Clone)]
pub struct TransferOrchestrator {
    shared: Arc<Shared>,
    runtime: Handle,
    unsupported_delay: Duration,
}

impl TransferOrchestrator {
    /// Create an orchestrator that spawns its work on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        let (state, _) = watch::channel(TransferState::default());
        Self {
            shared: Arc::new(Shared {
                state,
                flight: Mutex::new(None),
            }),
            runtime,
            unsupported_delay: DEFAULT_UNSUPPORTED_DELAY,
        }
    }

    pub fn with_unsupported_delay(mut self, delay: Duration) -> Self {
        self.unsupported_delay = delay;
        self
    }

    /// Current snapshot.
    pub fn state(&self) -> TransferState {
        self.shared.state.borrow().clone()
    }

    pub fn is_transferring(&self) -> bool {
        self.shared.state.borrow().is_transferring
    }

    /// Receiver that observes every published snapshot (latest value wins).
    pub fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.shared.state.subscribe()
    }

    /// Resolve with the first snapshot where no transfer is active.
    pub async fn wait_idle(&self) -> TransferState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.is_transferring).await {
            Ok(s) => s.clone(),
            // The sender lives as long as `self`; a closed channel cannot happen here.
            Err(_) => self.state(),
        }
    }

    /// Start moving `pending` into `dest_path` on `dest`.
    ///
    /// Fire-and-forget: the outcome is only visible through the published state.
    /// Ignored while another transfer is active.
    pub fn start_transfer(&self, pending: PendingTransfer, dest: BackendRef, dest_path: impl Into<String>) {
        let dest_path = dest_path.into();
        let (item, source) = pending.into_parts();
        let token = CancellationToken::new();

        let accepted = self.shared.state.send_if_modified(|s| {
            if s.is_transferring {
                return false;
            }
            *s = TransferState::preparing(item.name());
            *lock(&self.shared.flight) = Some(token.clone());
            true
        });
        if !accepted {
            debug!(file = item.name(), "Transfer already in progress; request ignored");
            return;
        }

        info!(
            file = item.name(),
            source = %source.kind(),
            dest = %dest.kind(),
            dest_path = %dest_path,
            size = item.size(),
            "Transfer started"
        );

        let plan = Plan::build(&item, source, dest, &dest_path);
        let shared = Arc::clone(&self.shared);
        let delay = self.unsupported_delay;
        let filename = item.name().to_string();
        self.runtime.spawn(async move {
            let outcome = run_plan(plan, &shared, &token, delay).await;
            shared.finish(&token, &filename, outcome);
        });
    }

    /// Cancel the active transfer, if any. Idempotent.
    ///
    /// The published state flips to "Cancelled" immediately; the backend notices
    /// the token at its next checkpoint.
    pub fn cancel(&self) {
        let cancelled = self.shared.state.send_if_modified(|s| {
            let Some(token) = lock(&self.shared.flight).take() else {
                return false;
            };
            token.cancel();
            s.finish(TransferPhase::Cancelled, STATUS_CANCELLED);
            true
        });
        if cancelled {
            info!("Transfer cancelled by user");
        } else {
            debug!("Cancel requested with no active transfer");
        }
    }
}

async fn run_plan(
    plan: Plan,
    shared: &Arc<Shared>,
    token: &CancellationToken,
    unsupported_delay: Duration,
) -> Outcome {
    if let Plan::Unsupported { .. } = plan {
        shared.set_status(token, STATUS_UNSUPPORTED);
        return tokio::select! {
            _ = tokio::time::sleep(unsupported_delay) => Outcome::Unsupported,
            _ = token.cancelled() => Outcome::Failed(TransferError::Cancelled),
        };
    }

    let worker_shared = Arc::clone(shared);
    let worker_token = token.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let mut sink = |p: Progress| worker_shared.apply_progress(&worker_token, p);
        plan.execute(&mut sink, &worker_token)
    })
    .await;

    match joined {
        Ok(Ok(())) => Outcome::Done,
        Ok(Err(e)) => Outcome::Failed(e),
        Err(join_err) => Outcome::Failed(TransferError::backend(format!(
            "transfer worker stopped unexpectedly: {join_err}"
        ))),
    }
}
