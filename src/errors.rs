//! Typed error definitions for lumen.
//! Provides a small set of well-known transfer failure modes for better logs and tests.

use std::path::PathBuf;
use thiserror::Error;

use crate::transfer::BackendKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Read/write failure inside a backend; the message is shown to the user verbatim.
    #[error("{0}")]
    BackendIo(String),

    #[error("Transfer from {from} to {to} is not supported")]
    UnsupportedDirection { from: BackendKind, to: BackendKind },

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Insufficient disk space for destination {dest}: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        required: u64,
        available: u64,
        dest: PathBuf,
    },
}

impl TransferError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            TransferError::BackendIo(_) => 10,
            TransferError::UnsupportedDirection { .. } => 20,
            TransferError::Cancelled => 30,
            TransferError::NotFound(_) => 40,
            TransferError::InvalidPath(_) => 41,
            TransferError::InsufficientSpace { .. } => 50,
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        TransferError::BackendIo(msg.into())
    }
}
