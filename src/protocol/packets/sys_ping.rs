//! Keepalive ping.

use std::any::Any;

use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::Result;
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;

/// Client keepalive, answered with a [`SysAck`](super::SysAck) echoing the
/// handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysPing {
    pub ack_handle: u32,
}

impl Packet for SysPing {
    fn opcode(&self) -> Opcode {
        Opcode::SysPing
    }

    fn decode(&mut self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        self.ack_handle = cursor.read_u32()?;
        Ok(())
    }

    fn encode(&self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        cursor.write_u32(self.ack_handle)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
