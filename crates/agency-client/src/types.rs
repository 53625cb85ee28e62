// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transfer types: client identifier, states and outcomes.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientIdError;

/// Client identifier, sent as a single byte at session start.
///
/// Construction validates the `[0, 255]` range, so an invalid id is rejected
/// before any connection is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u8);

impl ClientId {
    pub fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for ClientId {
    type Error = ClientIdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| ClientIdError::OutOfRange(value))
    }
}

impl FromStr for ClientId {
    type Err = ClientIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ClientIdError::NotANumber(s.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transfer state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Connecting,
    SendingId,
    SendingBatches,
    AwaitingAck,
    SendingDone,
    ReceivingResult,
    Closed,
    Cancelled,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Closed | TransferState::Cancelled)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferState::Connecting => "connecting",
            TransferState::SendingId => "sending_id",
            TransferState::SendingBatches => "sending_batches",
            TransferState::AwaitingAck => "awaiting_ack",
            TransferState::SendingDone => "sending_done",
            TransferState::ReceivingResult => "receiving_result",
            TransferState::Closed => "closed",
            TransferState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Progress counters of a transfer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Batches acknowledged by the collector
    pub batches_sent: usize,
    /// Records in acknowledged batches
    pub records_sent: usize,
    /// Acknowledgments other than the collector's OK byte
    pub rejected_batches: usize,
    /// Winner documents returned by the collector (empty until the result is read)
    pub winners: Vec<u32>,
}

impl TransferReport {
    pub fn winner_count(&self) -> usize {
        self.winners.len()
    }
}

/// How a transfer ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// All batches sent and the winner list received
    Completed(TransferReport),
    /// Shutdown was requested before the transfer finished
    Cancelled(TransferReport),
}

impl TransferOutcome {
    pub fn report(&self) -> &TransferReport {
        match self {
            TransferOutcome::Completed(report) | TransferOutcome::Cancelled(report) => report,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferOutcome::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_range() {
        assert_eq!(ClientId::try_from(0).unwrap().as_byte(), 0);
        assert_eq!(ClientId::try_from(255).unwrap().as_byte(), 255);
        assert_eq!(
            ClientId::try_from(300).unwrap_err(),
            ClientIdError::OutOfRange(300)
        );
        assert_eq!(
            ClientId::try_from(-1).unwrap_err(),
            ClientIdError::OutOfRange(-1)
        );
    }

    #[test]
    fn test_client_id_from_str() {
        assert_eq!("7".parse::<ClientId>().unwrap(), ClientId::new(7));
        assert_eq!(" 12 ".parse::<ClientId>().unwrap(), ClientId::new(12));
        assert_eq!(
            "300".parse::<ClientId>().unwrap_err(),
            ClientIdError::OutOfRange(300)
        );
        assert!(matches!(
            "agency-1".parse::<ClientId>(),
            Err(ClientIdError::NotANumber(_))
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Closed.is_terminal());
        assert!(TransferState::Cancelled.is_terminal());
        assert!(!TransferState::AwaitingAck.is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TransferState::AwaitingAck.to_string(), "awaiting_ack");
        assert_eq!(TransferState::ReceivingResult.to_string(), "receiving_result");
    }

    #[test]
    fn test_outcome_report() {
        let report = TransferReport {
            batches_sent: 2,
            records_sent: 5,
            rejected_batches: 0,
            winners: vec![1, 2],
        };
        let outcome = TransferOutcome::Completed(report.clone());
        assert_eq!(outcome.report(), &report);
        assert_eq!(outcome.report().winner_count(), 2);
        assert!(!outcome.is_cancelled());
        assert!(TransferOutcome::Cancelled(TransferReport::default()).is_cancelled());
    }
}
