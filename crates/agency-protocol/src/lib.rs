// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Agency Protocol - length-prefixed framing over TCP
//!
//! This crate provides the wire protocol spoken between an agency client and
//! the collector it streams records to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    agency-protocol                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session: id byte, batches + acks, done marker, winners     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Encoding: `,`-delimited, `;`-terminated records            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Framing: u16 big-endian length prefix (short-I/O safe)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Session
//!
//! ```text
//! client                                   collector
//!   │ ── id (1 byte) ──────────────────────────▶ │
//!   │ ── frame: len(2) + records ──────────────▶ │
//!   │ ◀───────────────────────────── ack (1 byte) │   (per batch)
//!   │ ── frame: 00 00 (done) ──────────────────▶ │
//!   │ ◀──────────────── frame: len(2) + winners │
//!   │ ── '0' (1 byte) ─────────────────────────▶ │
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use agency_protocol::{FramedStream, Record, encode_batch};
//!
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:12345").await?;
//! let mut framed = FramedStream::new(stream);
//!
//! framed.write_byte(1).await?;
//! framed.send(encode_batch(&[Record::new("Ana", "Pérez", "123", "1990-01-01", "42")])).await?;
//! let ack = framed.read_byte().await?;
//! framed.write_done().await?;
//! let winners = framed.read_frame().await?;
//! ```

pub mod frame;
pub mod record;
pub mod server;
pub mod winners;

// Re-export main types
pub use frame::{
    ACK_OK, ACK_REJECTED, Frame, FrameError, FramedStream, MAX_FRAME_SIZE, RESULT_ACK,
};
pub use record::{Record, RecordError, batch_wire_len, decode_batch, encode_batch};
pub use server::{BatchSink, CollectorServer, MemorySink, ServerError, SessionSummary, serve_session};
pub use winners::{WINNER_RECORD_WIDTH, WinnerList, WinnerListError};
