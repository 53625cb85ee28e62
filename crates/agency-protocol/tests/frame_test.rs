// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Frame encoding/decoding and short-I/O tests for agency-protocol.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use agency_protocol::frame::{
    Frame, FrameError, FramedStream, HEADER_SIZE, MAX_FRAME_SIZE, read_frame, write_frame,
};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Stream wrapper that moves at most one byte per read or write call
struct Trickle<S> {
    inner: S,
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

fn payload_of(len: usize) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
}

#[test]
fn test_frame_header_format() {
    let frame = Frame::new(payload_of(300)).unwrap();
    let encoded = frame.encode();

    let length = u16::from_be_bytes([encoded[0], encoded[1]]) as usize;
    assert_eq!(length, 300);
    assert_eq!(encoded.len(), HEADER_SIZE + frame.payload.len());
}

#[test]
fn test_frame_encode_decode_roundtrip() {
    let original = Frame::new(payload_of(1024)).unwrap();
    let decoded = Frame::decode_from_bytes(original.encode()).unwrap();
    assert_eq!(original, decoded);
}

#[test]
fn test_frame_decode_leaves_trailing_bytes() {
    let mut data = Frame::new(payload_of(3)).unwrap().encode().to_vec();
    data.extend_from_slice(&[9, 9]);
    let decoded = Frame::decode_from_bytes(Bytes::from(data)).unwrap();
    assert_eq!(decoded.payload, payload_of(3));
}

#[tokio::test]
async fn test_read_write_frame() {
    let original = Frame::new(payload_of(512)).unwrap();

    let mut buffer = Vec::new();
    write_frame(&mut buffer, &original).await.unwrap();

    let mut reader = buffer.as_slice();
    let read_back = read_frame(&mut reader).await.unwrap();
    assert_eq!(original, read_back);
}

#[tokio::test]
async fn test_roundtrip_one_byte_chunks() {
    let lengths = [0usize, 1, 2, 255, 256, 4096, 8192, MAX_FRAME_SIZE];
    let (client, server) = tokio::io::duplex(64);

    let writer = tokio::spawn(async move {
        let mut framed = FramedStream::new(Trickle { inner: client });
        for len in lengths {
            framed.send(payload_of(len)).await.unwrap();
        }
        framed.shutdown().await.unwrap();
    });

    let mut framed = FramedStream::new(Trickle { inner: server });
    for len in lengths {
        let frame = framed.read_frame().await.unwrap();
        assert_eq!(frame.payload.len(), len);
        assert_eq!(frame.payload, payload_of(len));
    }
    assert!(matches!(
        framed.read_frame().await,
        Err(FrameError::ConnectionClosed)
    ));

    writer.await.unwrap();
}

#[tokio::test]
async fn test_handshake_bytes_one_byte_chunks() {
    let (client, server) = tokio::io::duplex(1);
    let mut client = FramedStream::new(Trickle { inner: client });
    let mut server = FramedStream::new(Trickle { inner: server });

    client.write_byte(7).await.unwrap();
    assert_eq!(server.read_byte().await.unwrap(), 7);

    server.write_byte(b'0').await.unwrap();
    assert_eq!(client.read_byte().await.unwrap(), b'0');
}

#[tokio::test]
async fn test_write_done_marker() {
    let mut buffer = Vec::new();
    {
        let mut framed = FramedStream::new(&mut buffer);
        framed.write_done().await.unwrap();
    }
    assert_eq!(buffer, vec![0, 0]);
}

#[tokio::test]
async fn test_into_inner_returns_written_stream() {
    let mut framed = FramedStream::new(Vec::new());
    framed.write_byte(7).await.unwrap();
    framed.send(&b"a,b"[..]).await.unwrap();
    framed.write_done().await.unwrap();

    let buffer = framed.into_inner();
    assert_eq!(buffer, vec![7, 0, 3, b'a', b',', b'b', 0, 0]);
}

#[tokio::test]
async fn test_oversized_payload_writes_nothing() {
    let mut buffer = Vec::new();
    let result = {
        let mut framed = FramedStream::new(&mut buffer);
        framed.send(vec![0u8; MAX_FRAME_SIZE + 1]).await
    };
    assert!(matches!(result, Err(FrameError::FrameTooLarge(_))));
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn test_peer_closes_mid_frame() {
    let (client, server) = tokio::io::duplex(64);
    let mut client = client;
    tokio::io::AsyncWriteExt::write_all(&mut client, &[0, 10, 1, 2, 3])
        .await
        .unwrap();
    drop(client);

    let mut framed = FramedStream::new(server);
    let err = framed.read_frame().await.unwrap_err();
    assert!(matches!(
        err,
        FrameError::Truncated {
            expected: 10,
            received: 3
        }
    ));
}
