//! Transfer orchestration core: backend contract, values, state and the orchestrator.

pub mod backend;
pub mod direction;
pub mod item;
pub mod orchestrator;
pub mod rate;
pub mod state;

pub use backend::{Progress, ProgressSink, StorageBackend};
pub use direction::Direction;
pub use item::{BackendKind, BackendRef, FileItem, PendingTransfer};
pub use orchestrator::{TransferOrchestrator, DEFAULT_UNSUPPORTED_DELAY};
pub use rate::RateMeter;
pub use state::{
    TransferPhase, TransferState, STATUS_CANCELLED, STATUS_DONE, STATUS_PREPARING,
    STATUS_UNSUPPORTED,
};
