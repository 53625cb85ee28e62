// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Collector side of the transfer protocol.
//!
//! A session reads the client id byte, then batch frames until the
//! zero-length frame, acknowledging each one. It answers with the winner list
//! for that client and waits for the client's final acknowledgment.

use std::collections::HashMap;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument, warn};

use crate::frame::{ACK_OK, ACK_REJECTED, Frame, FrameError, FramedStream, RESULT_ACK};
use crate::record::{Record, decode_batch};
use crate::winners::WinnerList;

/// Errors that can occur while serving a session
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listener I/O: bind, accept or local address lookup
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("unexpected final acknowledgment: {0:#04x}")]
    UnexpectedAck(u8),
}

/// Storage backend for the batches a collector receives
pub trait BatchSink {
    /// Store a decoded batch. An error rejects the batch and is logged.
    fn store(&mut self, client_id: u8, records: Vec<Record>) -> Result<(), String>;

    /// Winner documents for `client_id`, sent once the client has finished
    fn winners(&mut self, client_id: u8) -> Vec<u32>;
}

/// In-memory sink; a record wins when its number equals the winning number.
#[derive(Debug, Default)]
pub struct MemorySink {
    winning_number: String,
    records: HashMap<u8, Vec<Record>>,
}

impl MemorySink {
    pub fn new(winning_number: impl Into<String>) -> Self {
        Self {
            winning_number: winning_number.into(),
            records: HashMap::new(),
        }
    }

    /// Records stored for `client_id`, in arrival order
    pub fn records(&self, client_id: u8) -> &[Record] {
        self.records
            .get(&client_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl BatchSink for MemorySink {
    fn store(&mut self, client_id: u8, records: Vec<Record>) -> Result<(), String> {
        self.records.entry(client_id).or_default().extend(records);
        Ok(())
    }

    fn winners(&mut self, client_id: u8) -> Vec<u32> {
        self.records(client_id)
            .iter()
            .filter(|r| r.number == self.winning_number)
            .filter_map(|r| r.document.parse().ok())
            .collect()
    }
}

/// Counters for one served session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub client_id: u8,
    pub batches: usize,
    pub records: usize,
    pub rejected: usize,
    pub winners: usize,
}

/// Serve one client session on `stream`
#[instrument(skip_all)]
pub async fn serve_session<S, K>(
    stream: &mut FramedStream<S>,
    sink: &mut K,
) -> Result<SessionSummary, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    K: BatchSink,
{
    let client_id = stream.read_byte().await?;
    let mut summary = SessionSummary {
        client_id,
        ..Default::default()
    };
    debug!(client_id, "session started");

    loop {
        let frame = stream.read_frame().await?;
        if frame.is_done() {
            break;
        }

        summary.batches += 1;
        let stored = decode_batch(&frame.payload)
            .map_err(|e| e.to_string())
            .and_then(|records| {
                let count = records.len();
                sink.store(client_id, records).map(|()| count)
            });

        match stored {
            Ok(count) => {
                summary.records += count;
                info!(action = "batch_received", result = "success", client_id, count);
                stream.write_byte(ACK_OK).await?;
            }
            Err(reason) => {
                summary.rejected += 1;
                error!(action = "batch_received", result = "fail", client_id, %reason);
                stream.write_byte(ACK_REJECTED).await?;
            }
        }
    }

    let winners = WinnerList::from_documents(&sink.winners(client_id));
    summary.winners = winners.len();
    stream.write_frame(&Frame::new(winners.payload().clone())?).await?;

    let ack = stream.read_byte().await?;
    if ack != RESULT_ACK {
        return Err(ServerError::UnexpectedAck(ack));
    }

    info!(
        action = "session_closed",
        result = "success",
        client_id,
        batches = summary.batches,
        records = summary.records,
        winners = summary.winners
    );
    Ok(summary)
}

/// TCP collector serving one session at a time
pub struct CollectorServer {
    listener: TcpListener,
}

impl CollectorServer {
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "collector bound");
        Ok(Self { listener })
    }

    /// Get the local address the server is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next client connection
    pub async fn accept(&self) -> Result<(FramedStream<TcpStream>, SocketAddr), ServerError> {
        let (stream, addr) = self.listener.accept().await?;
        debug!(%addr, "accepted connection");
        Ok((FramedStream::new(stream), addr))
    }

    /// Serve `sessions` sessions sequentially. A failed session is logged and
    /// does not stop the server.
    pub async fn run<K: BatchSink>(
        &self,
        sink: &mut K,
        sessions: usize,
    ) -> Result<Vec<SessionSummary>, ServerError> {
        let mut summaries = Vec::with_capacity(sessions);
        for _ in 0..sessions {
            let (mut stream, addr) = self.accept().await?;
            match serve_session(&mut stream, sink).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!(%addr, error = %e, "session failed"),
            }
            let _ = stream.shutdown().await;
        }
        Ok(summaries)
    }
}
