//! Client logout request.

use std::any::Any;

use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::{ProtocolError, Result};
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;

/// Explicit logout. The session acks it and begins its disconnect path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysLogout {
    pub ack_handle: u32,
}

impl Packet for SysLogout {
    fn opcode(&self) -> Opcode {
        Opcode::SysLogout
    }

    fn decode(&mut self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        self.ack_handle = cursor.read_u32()?;
        Ok(())
    }

    fn encode(&self, _cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        Err(ProtocolError::EncodeNotImplemented(self.opcode()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
