//! # Error Types
//!
//! Error handling for the channel protocol core.
//!
//! This module defines all error variants that can occur between the wire and
//! the handler boundary, from cursor bounds violations to session delivery
//! failures.
//!
//! ## Fatality
//!
//! Only the session loop decides what an error means for the connection:
//! - **Framing errors** (truncated stream, oversized length claim) and
//!   **decode errors** are connection-fatal: frame boundaries can no longer
//!   be trusted.
//! - **Unknown opcodes** are non-fatal: the frame is dropped and the
//!   connection continues, so older and newer clients interoperate.
//! - **Delivery failures** are isolated to the failing recipient.
//!
//! None of the lower layers panic on malformed input; everything surfaces as
//! a `Result` value.

use std::io;
use thiserror::Error;

use crate::protocol::opcode::Opcode;

/// Primary error type for all protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A cursor read ran past the end of the buffer. The cursor position is
    /// unchanged when this is returned.
    #[error("cursor overrun: requested {requested} bytes, {remaining} remaining")]
    CursorOverrun { requested: usize, remaining: usize },

    /// The frame header claims a payload larger than the configured maximum.
    #[error("frame payload too large: {0} bytes")]
    OversizedFrame(usize),

    /// The stream ended inside a frame. Connection-fatal.
    #[error("truncated frame: stream ended mid-frame")]
    TruncatedFrame,

    /// No packet variant is registered for this opcode. Non-fatal; the frame
    /// is dropped and the connection continues.
    #[error("unknown opcode: {0:#06x}")]
    UnknownOpcode(u16),

    /// A length-prefixed string field held bytes that are not UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A string field is longer than its length prefix can describe.
    #[error("string field too long: {0} bytes")]
    StringTooLong(usize),

    /// Registration attempted for an opcode that already has a constructor.
    #[error("duplicate opcode registration: {0:?}")]
    DuplicateOpcode(Opcode),

    /// Payload bytes were inconsistent with the variant's layout.
    #[error("decode failed for {opcode:?}: {reason}")]
    Decode { opcode: Opcode, reason: String },

    /// Decode consumed fewer bytes than the frame declared. Connection-fatal:
    /// the variant and the wire disagree about the payload layout.
    #[error("decode of {opcode:?} left {remaining} trailing bytes")]
    TrailingBytes { opcode: Opcode, remaining: usize },

    /// Attempted to serialize a receive-only variant. A logic error in the
    /// calling handler, surfaced rather than emitting malformed bytes.
    #[error("encode not implemented for {0:?}")]
    EncodeNotImplemented(Opcode),

    /// Attempted to parse a send-only variant.
    #[error("decode not implemented for {0:?}")]
    DecodeNotImplemented(Opcode),

    #[error("session not found: {0}")]
    SessionNotFound(u32),

    /// The target session's outbound queue is gone or full.
    #[error("delivery failed to session {0}")]
    DeliveryFailed(u32),

    #[error("invalid session state transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A business-logic handler rejected a packet. The session treats this
    /// as connection-fatal.
    #[error("handler error: {0}")]
    Handler(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
