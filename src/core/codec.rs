//! # Wire Codec
//!
//! Frame-level codec for streaming transports, used through
//! `tokio_util::codec::Framed`.
//!
//! ## Wire Format
//! ```text
//! [Opcode(2, BE)] [Length(4, BE)] [Payload(Length)]
//! ```
//!
//! The codec deals in [`RawFrame`]s: opcode plus undecoded payload bytes.
//! Resolving the opcode to a packet variant and decoding the payload happens
//! in the session loop, so a frame for an unknown opcode can be skipped
//! without ever parsing its payload.
//!
//! The length field is validated against the configured maximum before any
//! payload allocation. A stream that ends mid-frame surfaces as
//! [`ProtocolError::TruncatedFrame`], which is connection-fatal.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_PAYLOAD_SIZE;
use crate::error::{ProtocolError, Result};

/// Bytes in the fixed frame header: opcode (2) + payload length (4).
pub const HEADER_SIZE: usize = 6;

/// One complete frame as it appears on the wire, payload still undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Raw opcode value. May be unknown to this build of the server.
    pub opcode: u16,
    /// Payload bytes, exactly as long as the header declared.
    pub payload: Bytes,
}

impl RawFrame {
    pub fn new(opcode: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Total size of this frame on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Codec translating between byte streams and [`RawFrame`]s.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }

    /// Codec with a custom payload ceiling (tests, constrained deployments).
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }

    /// Encode a frame to a standalone buffer.
    ///
    /// Broadcast encodes each outbound packet exactly once through this and
    /// hands the same `Bytes` to every recipient queue.
    pub fn frame_to_bytes(frame: &RawFrame) -> Bytes {
        let mut dst = BytesMut::with_capacity(frame.encoded_len());
        dst.put_u16(frame.opcode);
        dst.put_u32(frame.payload.len() as u32);
        dst.extend_from_slice(&frame.payload);
        dst.freeze()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>> {
        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let opcode = u16::from_be_bytes([src[0], src[1]]);
        let length = u32::from_be_bytes([src[2], src[3], src[4], src[5]]) as usize;

        // Reject before reserving: a hostile length claim must not drive an
        // allocation.
        if length > self.max_payload {
            return Err(ProtocolError::OversizedFrame(length));
        }

        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(length).freeze();

        Ok(Some(RawFrame { opcode, payload }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            // The header promised more bytes than the stream delivered.
            None => Err(ProtocolError::TruncatedFrame),
        }
    }
}

impl Encoder<RawFrame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: RawFrame, dst: &mut BytesMut) -> Result<()> {
        if frame.payload.len() > self.max_payload {
            return Err(ProtocolError::OversizedFrame(frame.payload.len()));
        }

        dst.reserve(frame.encoded_len());
        dst.put_u16(frame.opcode);
        dst.put_u32(frame.payload.len() as u32);
        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}
