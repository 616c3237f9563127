//! Client diagnostic log upload.

use std::any::Any;

use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::{ProtocolError, Result};
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;

/// Batch of client-side log lines forwarded for server-side diagnostics.
/// Receive-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysTerminalLog {
    pub ack_handle: u32,
    pub log_kind: u8,
    pub entries: Vec<String>,
}

impl Packet for SysTerminalLog {
    fn opcode(&self) -> Opcode {
        Opcode::SysTerminalLog
    }

    fn decode(&mut self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        self.ack_handle = cursor.read_u32()?;
        self.log_kind = cursor.read_u8()?;
        let count = cursor.read_u16()? as usize;
        self.entries = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            self.entries.push(cursor.read_string()?);
        }
        Ok(())
    }

    fn encode(&self, _cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        Err(ProtocolError::EncodeNotImplemented(self.opcode()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
