// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Winner list carried by the collector's response frame.
//!
//! The payload is a sequence of fixed-width result records, each one a
//! big-endian `u32` document number.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Width in bytes of one result record
pub const WINNER_RECORD_WIDTH: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WinnerListError {
    #[error("winner list of {len} bytes is not a multiple of {WINNER_RECORD_WIDTH}")]
    PartialRecord { len: usize },
}

/// Decoded response payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WinnerList {
    payload: Bytes,
}

impl WinnerList {
    /// Wrap a response payload, rejecting a trailing partial record.
    ///
    /// This is stricter than counting `len / WINNER_RECORD_WIDTH` and
    /// ignoring the remainder: a payload whose length is not a multiple of
    /// the record width is an error, and the caller must not acknowledge it.
    pub fn from_payload(payload: Bytes) -> Result<Self, WinnerListError> {
        if payload.len() % WINNER_RECORD_WIDTH != 0 {
            return Err(WinnerListError::PartialRecord {
                len: payload.len(),
            });
        }
        Ok(Self { payload })
    }

    /// Build the payload for a list of winner documents
    pub fn from_documents(documents: &[u32]) -> Self {
        let mut buf = BytesMut::with_capacity(documents.len() * WINNER_RECORD_WIDTH);
        for document in documents {
            buf.put_u32(*document);
        }
        Self {
            payload: buf.freeze(),
        }
    }

    /// Number of winners in the list
    pub fn len(&self) -> usize {
        self.payload.len() / WINNER_RECORD_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = u32> + '_ {
        self.payload
            .chunks_exact(WINNER_RECORD_WIDTH)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_from_sixteen_bytes() {
        let list = WinnerList::from_payload(Bytes::from(vec![0u8; 16])).unwrap();
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_empty_list() {
        let list = WinnerList::from_payload(Bytes::new()).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.documents().count(), 0);
    }

    #[test]
    fn test_partial_record_rejected() {
        let err = WinnerList::from_payload(Bytes::from(vec![0u8; 6])).unwrap_err();
        assert_eq!(err, WinnerListError::PartialRecord { len: 6 });
    }

    #[test]
    fn test_documents_big_endian() {
        let list = WinnerList::from_documents(&[30904465, 1]);
        assert_eq!(list.payload().len(), 8);
        assert_eq!(&list.payload()[4..], &[0, 0, 0, 1]);
        assert_eq!(list.documents().collect::<Vec<_>>(), vec![30904465, 1]);
    }
}
