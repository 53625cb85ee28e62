// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client-specific error types.

use agency_protocol::{FrameError, WinnerListError};
use thiserror::Error;

/// Errors raised by a record source. Exhaustion is not an error.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Backing file could not be opened or read
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV row could not be parsed into a record
    #[error("malformed record: {0}")]
    Csv(#[from] csv::Error),

    /// A field required to build a record is not set
    #[error("missing record field: {0}")]
    MissingField(&'static str),
}

/// Client identifier outside the single-byte range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientIdError {
    #[error("client id {0} is out of range (0-255)")]
    OutOfRange(i64),

    #[error("client id {0:?} is not an integer")]
    NotANumber(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Fatal errors that abort a transfer.
///
/// Cancellation is reported as an outcome, never through this type.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Reading the next record failed
    #[error("source read failure: {0}")]
    Source(#[from] SourceError),

    /// Writing to the collector failed
    #[error("transport write failure: {0}")]
    TransportWrite(#[source] FrameError),

    /// Reading from the collector failed or the connection closed
    #[error("transport read failure: {0}")]
    TransportRead(#[source] FrameError),

    /// The collector sent data that breaks the protocol
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl From<FrameError> for TransferError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Truncated { .. } => TransferError::Protocol(err.to_string()),
            e if e.is_write() => TransferError::TransportWrite(e),
            e => TransferError::TransportRead(e),
        }
    }
}

impl From<WinnerListError> for TransferError {
    fn from(err: WinnerListError) -> Self {
        TransferError::Protocol(err.to_string())
    }
}

/// Type alias for transfer results.
pub type Result<T> = std::result::Result<T, TransferError>;
