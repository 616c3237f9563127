//! Binary cast request (client to server).

use std::any::Any;

use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::{ProtocolError, Result};
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;

/// Request to relay opaque bytes to other sessions. The core never looks
/// inside `payload`; `broadcast_kind` selects the audience and
/// `message_kind` tags the content for the receiving client. Receive-only;
/// the outbound half is [`CastedBinary`](super::CastedBinary).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastBinary {
    pub broadcast_kind: u8,
    pub message_kind: u8,
    pub payload: Vec<u8>,
}

impl Packet for CastBinary {
    fn opcode(&self) -> Opcode {
        Opcode::CastBinary
    }

    fn decode(&mut self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        self.broadcast_kind = cursor.read_u8()?;
        self.message_kind = cursor.read_u8()?;
        let size = cursor.read_u32()? as usize;
        self.payload = cursor.read_bytes(size)?.to_vec();
        Ok(())
    }

    fn encode(&self, _cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        Err(ProtocolError::EncodeNotImplemented(self.opcode()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
