// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Record sources feeding the batch assembler.
//!
//! A source hands out one record at a time: `Ok(Some(record))` while records
//! remain, `Ok(None)` once exhausted, `Err` when the backing store fails.

use std::collections::VecDeque;
use std::env;
use std::fs::File;
use std::io;
use std::path::Path;

use agency_protocol::Record;
use tracing::debug;

use crate::error::SourceError;

/// Sequential supplier of records
pub trait RecordSource {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        (**self).next_record()
    }
}

/// Headerless CSV with one record per row: `name,surname,document,birthdate,number`
pub struct CsvSource<R: io::Read = File> {
    rows: csv::DeserializeRecordsIntoIter<R, Record>,
}

impl CsvSource<File> {
    /// Open a CSV file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening record file");
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: io::Read> CsvSource<R> {
    pub fn from_reader(reader: R) -> Self {
        let rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(reader)
            .into_deserialize();
        Self { rows }
    }
}

impl<R: io::Read> RecordSource for CsvSource<R> {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        self.rows.next().transpose().map_err(SourceError::from)
    }
}

/// Single record read from the `NOMBRE`, `APELLIDO`, `DOCUMENTO`,
/// `NACIMIENTO` and `NUMERO` environment variables.
#[derive(Debug)]
pub struct EnvSource {
    record: Option<Record>,
}

impl EnvSource {
    pub fn from_env() -> Result<Self, SourceError> {
        fn field(key: &'static str) -> Result<String, SourceError> {
            env::var(key).map_err(|_| SourceError::MissingField(key))
        }

        let record = Record::new(
            field("NOMBRE")?,
            field("APELLIDO")?,
            field("DOCUMENTO")?,
            field("NACIMIENTO")?,
            field("NUMERO")?,
        );
        Ok(Self {
            record: Some(record),
        })
    }
}

impl RecordSource for EnvSource {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        Ok(self.record.take())
    }
}

/// In-memory source, drained front to back
#[derive(Debug, Default)]
pub struct MemorySource {
    records: VecDeque<Record>,
}

impl MemorySource {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for MemorySource {
    fn from(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl RecordSource for MemorySource {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        Ok(self.records.pop_front())
    }
}
