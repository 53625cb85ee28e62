// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Agency Client - streams records to a collector in size-bounded batches.
//!
//! The client pulls records from a [`RecordSource`], groups them with a
//! [`BatchAssembler`] and drives one [`Transfer`] over a connected stream:
//! the client id byte, one length-prefixed frame per batch (each answered by
//! a single acknowledgment byte), the zero-length done frame, and finally the
//! winner list returned by the collector.
//!
//! # Quick Start
//!
//! ```ignore
//! use agency_client::{BatchAssembler, ClientConfig, Transfer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::from_env()?;
//!     let stream = tokio::net::TcpStream::connect(&config.server_address).await?;
//!
//!     let assembler = BatchAssembler::new(config.open_source()?, config.batch_limits);
//!     let cancel = CancellationToken::new();
//!
//!     let outcome = Transfer::new(stream, assembler, config.client_id, cancel)
//!         .run()
//!         .await?;
//!     println!("{} winners", outcome.report().winner_count());
//!     Ok(())
//! }
//! ```
//!
//! # Cancellation
//!
//! Cancelling the token stops the transfer before the next batch is sent, or
//! while an acknowledgment is outstanding. The transfer then ends with
//! [`TransferOutcome::Cancelled`]; the connection is shut down either way.
//!
//! # Configuration
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CLI_ID` | required, 0-255 |
//! | `CLI_SERVER_ADDRESS` | `127.0.0.1:12345` |
//! | `CLI_BATCH_MAX_AMOUNT` | `100` |
//! | `CLI_BATCH_MAX_BYTES` | `8192` |
//! | `CLI_DATA_FILE` | unset (one record from `NOMBRE`, `APELLIDO`, `DOCUMENTO`, `NACIMIENTO`, `NUMERO`) |
//! | `CLI_CONNECT_TIMEOUT_MS` | `10000` |

pub mod batch;
pub mod config;
pub mod error;
pub mod source;
pub mod transfer;
pub mod types;

// Serializes tests that modify environment variables
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

// Main types
pub use batch::{Batch, BatchAssembler, BatchLimits};
pub use config::ClientConfig;
pub use error::{ClientIdError, ConfigError, Result, SourceError, TransferError};
pub use source::{CsvSource, EnvSource, MemorySource, RecordSource};
pub use transfer::Transfer;
pub use types::{ClientId, TransferOutcome, TransferReport, TransferState};

// Re-export the record type so callers need not depend on the protocol crate
pub use agency_protocol::Record;
