// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transfer orchestration.
//!
//! A [`Transfer`] owns one connected stream and one batch assembler and drives
//! the whole exchange:
//!
//! ```text
//! Connecting → SendingId → SendingBatches ⇄ AwaitingAck → SendingDone
//!            → ReceivingResult → Closed
//!                              ↘ Cancelled (from SendingBatches / AwaitingAck)
//! ```
//!
//! The acknowledgment read is raced against the cancellation token, so a
//! shutdown request is honoured even while the collector is slow to answer.
//! The stream is shut down on every exit path and the source is dropped with
//! the transfer.

use agency_protocol::{ACK_OK, FramedStream, RESULT_ACK, WinnerList};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::batch::{Batch, BatchAssembler};
use crate::error::Result;
use crate::source::RecordSource;
use crate::types::{ClientId, TransferOutcome, TransferReport, TransferState};

/// One end-to-end exchange with the collector
pub struct Transfer<S, R> {
    stream: FramedStream<S>,
    assembler: BatchAssembler<R>,
    client_id: ClientId,
    cancel: CancellationToken,
    state: TransferState,
    report: TransferReport,
}

impl<S, R> Transfer<S, R>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: RecordSource,
{
    /// Create a transfer over an established connection
    pub fn new(
        stream: S,
        assembler: BatchAssembler<R>,
        client_id: ClientId,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            stream: FramedStream::new(stream),
            assembler,
            client_id,
            cancel,
            state: TransferState::Connecting,
            report: TransferReport::default(),
        }
    }

    /// Current state of the exchange.
    ///
    /// After [`run`](Self::run) returns this is `Closed` on completion,
    /// `Cancelled` on cancellation, or the state the transfer failed in.
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Run the exchange to completion, cancellation or the first fatal error.
    ///
    /// The stream is shut down before returning; a transfer runs once.
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    pub async fn run(&mut self) -> Result<TransferOutcome> {
        let result = self.exchange().await;

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "connection shutdown failed");
        }

        match &result {
            Ok(TransferOutcome::Completed(report)) => info!(
                action = "transfer",
                result = "success",
                batches = report.batches_sent,
                records = report.records_sent,
                winners = report.winner_count()
            ),
            Ok(TransferOutcome::Cancelled(report)) => info!(
                action = "transfer",
                result = "cancelled",
                batches = report.batches_sent,
                records = report.records_sent
            ),
            Err(e) => error!(
                action = "transfer",
                result = "fail",
                state = %self.state,
                error = %e
            ),
        }
        result
    }

    async fn exchange(&mut self) -> Result<TransferOutcome> {
        self.transition(TransferState::SendingId);
        self.stream.write_byte(self.client_id.as_byte()).await?;

        self.transition(TransferState::SendingBatches);
        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            let batch = self.assembler.next_batch()?;
            if batch.is_empty() {
                break;
            }

            self.send_batch(&batch).await?;

            self.transition(TransferState::AwaitingAck);
            let ack = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                ack = self.stream.read_byte() => Some(ack),
            };
            let Some(ack) = ack else {
                return Ok(self.cancelled());
            };
            self.record_ack(&batch, ack?);

            if batch.exhausted {
                break;
            }
            self.transition(TransferState::SendingBatches);
        }

        self.transition(TransferState::SendingDone);
        self.stream.write_done().await?;

        self.transition(TransferState::ReceivingResult);
        let frame = self.stream.read_frame().await?;
        let winners = WinnerList::from_payload(frame.payload)?;
        self.stream.write_byte(RESULT_ACK).await?;
        info!(
            action = "winners_query",
            result = "success",
            count = winners.len()
        );

        self.report.winners = winners.documents().collect();
        self.transition(TransferState::Closed);
        Ok(TransferOutcome::Completed(std::mem::take(&mut self.report)))
    }

    async fn send_batch(&mut self, batch: &Batch) -> Result<()> {
        let payload = batch.payload();
        let bytes = payload.len();
        if let Err(e) = self.stream.send(payload).await {
            error!(action = "batch_sent", result = "fail", count = batch.len(), error = %e);
            return Err(e.into());
        }
        debug!(count = batch.len(), bytes, "batch sent");
        Ok(())
    }

    fn record_ack(&mut self, batch: &Batch, ack: u8) {
        self.report.batches_sent += 1;
        self.report.records_sent += batch.len();
        if ack == ACK_OK {
            info!(action = "batch_sent", result = "success", count = batch.len());
        } else {
            self.report.rejected_batches += 1;
            warn!(
                action = "batch_sent",
                result = "rejected",
                count = batch.len(),
                ack
            );
        }
    }

    fn cancelled(&mut self) -> TransferOutcome {
        info!(action = "shutdown", result = "in_progress", state = %self.state);
        self.transition(TransferState::Cancelled);
        TransferOutcome::Cancelled(std::mem::take(&mut self.report))
    }

    fn transition(&mut self, next: TransferState) {
        debug!(from = %self.state, to = %next, "transfer state");
        self.state = next;
    }
}
