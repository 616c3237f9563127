//! The packet contract every opcode variant implements.

use std::any::Any;
use std::fmt;

use crate::core::codec::RawFrame;
use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::Result;
use crate::protocol::opcode::Opcode;

/// One strongly-typed protocol message.
///
/// Variants are constructed empty by the registry, populated by `decode`,
/// consumed once by a handler, and never reused across connections. For
/// responses a fresh instance is built by application code and serialized
/// with `encode`.
///
/// `decode` and `encode` are symmetric but not required to be inverses:
/// a receive-only variant (the server never sends it) returns
/// [`crate::error::ProtocolError::EncodeNotImplemented`] from `encode`, and a
/// send-only variant returns
/// [`crate::error::ProtocolError::DecodeNotImplemented`] from `decode`.
/// Explicit failure beats silently emitting malformed bytes.
pub trait Packet: Send + Sync + fmt::Debug {
    /// The opcode identifying this variant. Pure and constant.
    fn opcode(&self) -> Opcode;

    /// Populate fields from exactly this payload's bytes.
    ///
    /// The caller verifies afterwards that the cursor is exhausted; bytes
    /// left over mean the variant and the wire disagree, which is
    /// connection-fatal.
    fn decode(&mut self, cursor: &mut FrameCursor, ctx: &ClientContext) -> Result<()>;

    /// Serialize current field values into the cursor.
    fn encode(&self, cursor: &mut FrameCursor, ctx: &ClientContext) -> Result<()>;

    /// Downcasting hook so handlers can reach the concrete variant.
    fn as_any(&self) -> &dyn Any;
}

/// Encode a packet into a complete wire frame (header + payload).
pub fn encode_to_frame(packet: &dyn Packet, ctx: &ClientContext) -> Result<RawFrame> {
    let mut cursor = FrameCursor::new();
    packet.encode(&mut cursor, ctx)?;
    Ok(RawFrame::new(
        packet.opcode().to_u16(),
        cursor.into_inner(),
    ))
}
