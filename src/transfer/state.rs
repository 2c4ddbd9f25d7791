//! Observable transfer snapshot and its phase machine.

use std::fmt;

pub const STATUS_PREPARING: &str = "Preparing...";
pub const STATUS_DONE: &str = "Done";
pub const STATUS_CANCELLED: &str = "Cancelled";
pub const STATUS_UNSUPPORTED: &str = "Direct device-to-device transfer not supported";

/// Lifecycle of the (single) transfer slot.
///
/// `Idle -> Preparing -> Transferring -> {Done, Error, Cancelled}`; the
/// device-to-device placeholder ends in `Unsupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPhase {
    #[default]
    Idle,
    Preparing,
    Transferring,
    Done,
    Error,
    Cancelled,
    Unsupported,
}

impl TransferPhase {
    /// True exactly while `TransferState::is_transferring` is set.
    pub fn is_active(self) -> bool {
        matches!(self, TransferPhase::Preparing | TransferPhase::Transferring)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferPhase::Done
                | TransferPhase::Error
                | TransferPhase::Cancelled
                | TransferPhase::Unsupported
        )
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferPhase::Idle => "idle",
            TransferPhase::Preparing => "preparing",
            TransferPhase::Transferring => "transferring",
            TransferPhase::Done => "done",
            TransferPhase::Error => "error",
            TransferPhase::Cancelled => "cancelled",
            TransferPhase::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Snapshot published to observers.
///
/// Invariant: when `is_transferring` is false, `progress` is 0.0 or 1.0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransferState {
    pub is_transferring: bool,
    pub progress: f64,
    pub status: String,
    pub filename: String,
    pub transfer_speed: String,
    pub time_remaining: String,
    pub phase: TransferPhase,
}

impl TransferState {
    pub(crate) fn preparing(filename: &str) -> Self {
        Self {
            is_transferring: true,
            progress: 0.0,
            status: STATUS_PREPARING.to_string(),
            filename: filename.to_string(),
            transfer_speed: String::new(),
            time_remaining: String::new(),
            phase: TransferPhase::Preparing,
        }
    }

    /// Move into a terminal phase, restoring the idle progress invariant.
    pub(crate) fn finish(&mut self, phase: TransferPhase, status: impl Into<String>) {
        self.is_transferring = false;
        self.progress = if phase == TransferPhase::Done { 1.0 } else { 0.0 };
        self.status = status.into();
        self.transfer_speed.clear();
        self.time_remaining.clear();
        self.phase = phase;
    }
}
