//! Generic acknowledgement.

use std::any::Any;

use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::Result;
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;

/// Server response correlated to a request by its ack handle.
///
/// `error_code` zero means success; the meaning of nonzero codes and of the
/// opaque `data` blob is owned by the request's handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysAck {
    pub ack_handle: u32,
    pub error_code: u8,
    pub data: Vec<u8>,
}

impl SysAck {
    /// Plain success ack with no body.
    pub fn success(ack_handle: u32) -> Self {
        Self {
            ack_handle,
            error_code: 0,
            data: Vec::new(),
        }
    }
}

impl Packet for SysAck {
    fn opcode(&self) -> Opcode {
        Opcode::SysAck
    }

    fn decode(&mut self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        self.ack_handle = cursor.read_u32()?;
        self.error_code = cursor.read_u8()?;
        let size = cursor.read_u32()? as usize;
        self.data = cursor.read_bytes(size)?.to_vec();
        Ok(())
    }

    fn encode(&self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        cursor.write_u32(self.ack_handle)?;
        cursor.write_u8(self.error_code)?;
        cursor.write_u32(self.data.len() as u32)?;
        cursor.write_bytes(&self.data)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
