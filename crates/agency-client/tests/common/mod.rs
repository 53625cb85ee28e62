// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared helpers for agency-client integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use agency_client::{BatchAssembler, BatchLimits, MemorySource, Record};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Stream wrapper that moves at most one byte per read or write call
pub struct Trickle<S> {
    pub inner: S,
}

impl<S: AsyncRead + Unpin> AsyncRead for Trickle<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        let mut one = [0u8; 1];
        let mut small = ReadBuf::new(&mut one);
        match Pin::new(&mut self.inner).poll_read(cx, &mut small) {
            Poll::Ready(Ok(())) => {
                buf.put_slice(small.filled());
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Trickle<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let len = buf.len().min(1);
        Pin::new(&mut self.inner).poll_write(cx, &buf[..len])
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Record with a numeric document and the given lottery number
pub fn record(document: u32, number: &str) -> Record {
    Record::new(
        "Santiago",
        "Lorca",
        document.to_string(),
        "1999-03-17",
        number,
    )
}

/// Record whose encoded form is exactly `len` bytes
pub fn record_of_len(document: u32, len: usize) -> Record {
    let document = document.to_string();
    let number_len = len - 8 - document.len();
    Record::new("n", "s", document, "b", "7".repeat(number_len))
}

pub fn assembler(
    records: Vec<Record>,
    max_records: usize,
    max_bytes: usize,
) -> BatchAssembler<MemorySource> {
    BatchAssembler::new(
        MemorySource::from(records),
        BatchLimits::new(max_records, max_bytes).unwrap(),
    )
}
