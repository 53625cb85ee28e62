// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Record encoding for batch payloads.
//!
//! A record is encoded as its five fields joined by [`FIELD_SEPARATOR`] and
//! terminated by [`RECORD_SEPARATOR`]:
//!
//! ```text
//! name,surname,document,birthdate,number;
//! ```
//!
//! A batch payload is the concatenation of its encoded records with the final
//! record separator stripped. Fields must not contain either separator; the
//! encoder does not check this.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use thiserror::Error;

/// Separator between the fields of one record
pub const FIELD_SEPARATOR: u8 = b',';

/// Terminator of one record (separator between records in a batch)
pub const RECORD_SEPARATOR: u8 = b';';

/// Number of fields carried by every record
pub const FIELD_COUNT: usize = 5;

/// Errors that can occur while decoding a batch payload
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("batch payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("record {index} has {found} fields (expected {FIELD_COUNT})")]
    FieldCount { index: usize, found: usize },
}

/// One unit of domain data sent to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Record {
    pub name: String,
    pub surname: String,
    pub document: String,
    pub birthdate: String,
    pub number: String,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        surname: impl Into<String>,
        document: impl Into<String>,
        birthdate: impl Into<String>,
        number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
            document: document.into(),
            birthdate: birthdate.into(),
            number: number.into(),
        }
    }

    fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            &self.name,
            &self.surname,
            &self.document,
            &self.birthdate,
            &self.number,
        ]
    }

    /// Length of the encoded record, terminator included.
    ///
    /// Always equal to `self.encode().len()`; batch sizing relies on it.
    pub fn encoded_len(&self) -> usize {
        // FIELD_COUNT - 1 field separators plus the record terminator
        self.fields().iter().map(|f| f.len()).sum::<usize>() + FIELD_COUNT
    }

    /// Append the encoded record to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        for (i, field) in self.fields().iter().enumerate() {
            if i > 0 {
                buf.put_u8(FIELD_SEPARATOR);
            }
            buf.put_slice(field.as_bytes());
        }
        buf.put_u8(RECORD_SEPARATOR);
    }

    /// Encode the record to bytes
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }
}

/// Number of payload bytes `records` occupy on the wire.
pub fn batch_wire_len(records: &[Record]) -> usize {
    records
        .iter()
        .map(Record::encoded_len)
        .sum::<usize>()
        .saturating_sub(1)
}

/// Build the wire payload for a batch: encoded records, last terminator stripped.
pub fn encode_batch(records: &[Record]) -> Bytes {
    let mut buf = BytesMut::with_capacity(batch_wire_len(records) + 1);
    for record in records {
        record.encode_into(&mut buf);
    }
    if !buf.is_empty() {
        buf.truncate(buf.len() - 1);
    }
    buf.freeze()
}

/// Parse a batch payload back into records.
///
/// A trailing record separator is tolerated; an empty payload yields no records.
pub fn decode_batch(payload: &[u8]) -> Result<Vec<Record>, RecordError> {
    let text = std::str::from_utf8(payload)?;
    let text = text
        .strip_suffix(RECORD_SEPARATOR as char)
        .unwrap_or(text);
    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(RECORD_SEPARATOR as char)
        .enumerate()
        .map(|(index, raw)| {
            let fields: Vec<&str> = raw.split(FIELD_SEPARATOR as char).collect();
            match fields.as_slice() {
                [name, surname, document, birthdate, number] => {
                    Ok(Record::new(*name, *surname, *document, *birthdate, *number))
                }
                _ => Err(RecordError::FieldCount {
                    index,
                    found: fields.len(),
                }),
            }
        })
        .collect()
}
