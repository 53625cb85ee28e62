// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire format for length-prefixed framing over a byte stream.
//!
//! Each frame has the following format:
//! - 2 bytes: payload length (big-endian `u16`)
//! - N bytes: payload
//!
//! A frame with length `0` carries no payload and marks the end of the batch
//! stream. Handshake bytes (client id, acknowledgments) travel unframed.
//!
//! Every read and write here tolerates short I/O: the stream may accept or
//! deliver a single byte per call.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum payload size, bounded by the 16-bit length prefix
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Frame header size (2 bytes length)
pub const HEADER_SIZE: usize = 2;

/// Acknowledgment the collector sends for a stored batch
pub const ACK_OK: u8 = b'0';

/// Acknowledgment the collector sends for a batch it could not store
pub const ACK_REJECTED: u8 = b'1';

/// Byte the client sends once it has consumed the winner list
pub const RESULT_ACK: u8 = b'0';

/// Errors that can occur during frame encoding/decoding and stream I/O
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    #[error("write error: {0}")]
    Write(#[source] std::io::Error),

    #[error("read error: {0}")]
    Read(#[source] std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("truncated frame: expected {expected} bytes, received {received}")]
    Truncated { expected: usize, received: usize },
}

impl FrameError {
    /// Whether the error happened while writing to the peer
    pub fn is_write(&self) -> bool {
        matches!(self, FrameError::Write(_) | FrameError::FrameTooLarge(_))
    }
}

/// A length-prefixed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame, rejecting payloads the prefix cannot describe
    pub fn new(payload: impl Into<Bytes>) -> Result<Self, FrameError> {
        let payload = payload.into();
        if payload.len() > MAX_FRAME_SIZE {
            return Err(FrameError::FrameTooLarge(payload.len()));
        }
        Ok(Self { payload })
    }

    /// The zero-length frame that marks the end of the batch stream
    pub fn done() -> Self {
        Self {
            payload: Bytes::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.payload.is_empty()
    }

    /// Encode the frame to bytes for wire transmission
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_u16(self.payload.len() as u16);
        buf.put(self.payload.clone());
        buf.freeze()
    }

    /// Decode a frame from bytes
    pub fn decode_from_bytes(mut bytes: Bytes) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::Truncated {
                expected: HEADER_SIZE,
                received: bytes.len(),
            });
        }

        let length = bytes.get_u16() as usize;
        if bytes.len() < length {
            return Err(FrameError::Truncated {
                expected: length,
                received: bytes.len(),
            });
        }

        Ok(Self {
            payload: bytes.split_to(length),
        })
    }
}

/// Write a frame to an async writer
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), FrameError> {
    let encoded = frame.encode();
    writer.write_all(&encoded).await.map_err(FrameError::Write)?;
    writer.flush().await.map_err(FrameError::Write)
}

/// Write a single unframed byte
pub async fn write_byte<W: AsyncWrite + Unpin>(writer: &mut W, byte: u8) -> Result<(), FrameError> {
    writer.write_all(&[byte]).await.map_err(FrameError::Write)?;
    writer.flush().await.map_err(FrameError::Write)
}

/// Read exactly `len` bytes, looping over partial reads.
///
/// End of stream before the first byte is [`FrameError::ConnectionClosed`];
/// end of stream after some bytes arrived is [`FrameError::Truncated`].
pub async fn read_exact_bytes<R: AsyncRead + Unpin>(
    reader: &mut R,
    len: usize,
) -> Result<BytesMut, FrameError> {
    let mut buf = BytesMut::zeroed(len);
    let mut filled = 0;
    while filled < len {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(FrameError::Read)?;
        if n == 0 {
            return Err(if filled == 0 {
                FrameError::ConnectionClosed
            } else {
                FrameError::Truncated {
                    expected: len,
                    received: filled,
                }
            });
        }
        filled += n;
    }
    Ok(buf)
}

/// Read a single unframed byte
pub async fn read_byte<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u8, FrameError> {
    let buf = read_exact_bytes(reader, 1).await?;
    Ok(buf[0])
}

/// Read a frame from an async reader
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, FrameError> {
    let header = read_exact_bytes(reader, HEADER_SIZE).await?;
    let length = u16::from_be_bytes([header[0], header[1]]) as usize;

    // The buffer is sized from the prefix, so any length up to MAX_FRAME_SIZE fits
    let payload = match read_exact_bytes(reader, length).await {
        Ok(payload) => payload,
        Err(FrameError::ConnectionClosed) => {
            return Err(FrameError::Truncated {
                expected: length,
                received: 0,
            });
        }
        Err(e) => return Err(e),
    };

    Ok(Frame {
        payload: payload.freeze(),
    })
}

/// Framed codec for encoding/decoding frames on a stream
pub struct FramedStream<S> {
    stream: S,
}

impl<S> FramedStream<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: AsyncRead + Unpin> FramedStream<S> {
    /// Read the next frame from the stream
    pub async fn read_frame(&mut self) -> Result<Frame, FrameError> {
        read_frame(&mut self.stream).await
    }

    /// Read one unframed byte (handshake or acknowledgment)
    pub async fn read_byte(&mut self) -> Result<u8, FrameError> {
        read_byte(&mut self.stream).await
    }
}

impl<S: AsyncWrite + Unpin> FramedStream<S> {
    /// Write a frame to the stream
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), FrameError> {
        write_frame(&mut self.stream, frame).await
    }

    /// Frame `payload` and write it to the stream
    pub async fn send(&mut self, payload: impl Into<Bytes>) -> Result<(), FrameError> {
        let frame = Frame::new(payload)?;
        self.write_frame(&frame).await
    }

    /// Write the zero-length end-of-batches frame
    pub async fn write_done(&mut self) -> Result<(), FrameError> {
        self.write_frame(&Frame::done()).await
    }

    /// Write one unframed byte (handshake or acknowledgment)
    pub async fn write_byte(&mut self, byte: u8) -> Result<(), FrameError> {
        write_byte(&mut self.stream, byte).await
    }

    /// Shut down the write half of the stream
    pub async fn shutdown(&mut self) -> Result<(), FrameError> {
        self.stream.shutdown().await.map_err(FrameError::Write)
    }
}
