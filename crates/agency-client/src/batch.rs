// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Batch assembly.
//!
//! Records are pulled from a [`RecordSource`] and grouped into batches bounded
//! by a record count and by the wire size of the batch payload. A record that
//! would overflow the current batch is held back as carry-over and seeds the
//! next batch; records are never split or reordered.

use agency_protocol::{MAX_FRAME_SIZE, Record, batch_wire_len, encode_batch};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{ConfigError, SourceError};
use crate::source::RecordSource;

/// Default maximum number of records per batch
pub const DEFAULT_MAX_RECORDS: usize = 100;

/// Default maximum payload bytes per batch
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 8192;

/// Size bounds for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    max_records: usize,
    max_payload_bytes: usize,
}

impl BatchLimits {
    /// Both limits must be positive and the payload must fit in one frame.
    pub fn new(max_records: usize, max_payload_bytes: usize) -> Result<Self, ConfigError> {
        if max_records == 0 {
            return Err(ConfigError::Invalid(
                "max_records",
                "must be at least 1".to_string(),
            ));
        }
        if max_payload_bytes == 0 || max_payload_bytes > MAX_FRAME_SIZE {
            return Err(ConfigError::Invalid(
                "max_payload_bytes",
                format!("must be between 1 and {MAX_FRAME_SIZE}"),
            ));
        }
        Ok(Self {
            max_records,
            max_payload_bytes,
        })
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// Records for one transmission unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub records: Vec<Record>,
    /// The source reported exhaustion while this batch was assembled
    pub exhausted: bool,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Payload bytes this batch occupies on the wire
    pub fn wire_len(&self) -> usize {
        batch_wire_len(&self.records)
    }

    /// Wire payload: encoded records with the last separator stripped
    pub fn payload(&self) -> Bytes {
        encode_batch(&self.records)
    }
}

/// Groups records from a source into size-bounded batches
pub struct BatchAssembler<S> {
    source: S,
    limits: BatchLimits,
    carry_over: Option<Record>,
    exhausted: bool,
}

impl<S: RecordSource> BatchAssembler<S> {
    pub fn new(source: S, limits: BatchLimits) -> Self {
        Self {
            source,
            limits,
            carry_over: None,
            exhausted: false,
        }
    }

    /// Whether a record is held back for the next batch
    pub fn has_carry_over(&self) -> bool {
        self.carry_over.is_some()
    }

    /// Assemble the next batch.
    ///
    /// An empty batch is only returned once the source is exhausted and no
    /// carry-over remains. A single record larger than the payload limit is
    /// returned alone rather than held back forever. A source error discards
    /// the partially assembled batch.
    pub fn next_batch(&mut self) -> Result<Batch, SourceError> {
        let mut records = Vec::with_capacity(self.limits.max_records.min(64));
        // Sum of encoded record lengths; the wire length is one less
        let mut encoded = 0usize;

        if let Some(record) = self.carry_over.take() {
            encoded += record.encoded_len();
            records.push(record);
        }

        while records.len() < self.limits.max_records {
            if self.exhausted {
                return Ok(Batch {
                    records,
                    exhausted: true,
                });
            }

            let Some(record) = self.source.next_record()? else {
                self.exhausted = true;
                continue;
            };

            let len = record.encoded_len();
            if records.is_empty() {
                encoded += len;
                records.push(record);
                if encoded - 1 > self.limits.max_payload_bytes {
                    warn!(
                        bytes = encoded - 1,
                        max = self.limits.max_payload_bytes,
                        "record exceeds batch payload limit, sending it alone"
                    );
                    break;
                }
                continue;
            }

            if encoded + len - 1 > self.limits.max_payload_bytes {
                debug!(
                    records = records.len(),
                    bytes = encoded - 1,
                    "payload limit reached, carrying record over"
                );
                self.carry_over = Some(record);
                break;
            }

            encoded += len;
            records.push(record);
        }

        Ok(Batch {
            records,
            exhausted: false,
        })
    }
}
