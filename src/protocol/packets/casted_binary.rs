//! Binary cast relay (server to clients).

use std::any::Any;

use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::Result;
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;

/// Server-side half of the binary cast: the originating request's bytes
/// stamped with the sender's char id so recipients know who cast it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastedBinary {
    pub char_id: u32,
    pub broadcast_kind: u8,
    pub message_kind: u8,
    pub payload: Vec<u8>,
}

impl Packet for CastedBinary {
    fn opcode(&self) -> Opcode {
        Opcode::CastedBinary
    }

    fn decode(&mut self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        self.char_id = cursor.read_u32()?;
        self.broadcast_kind = cursor.read_u8()?;
        self.message_kind = cursor.read_u8()?;
        let size = cursor.read_u32()? as usize;
        self.payload = cursor.read_bytes(size)?.to_vec();
        Ok(())
    }

    fn encode(&self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        cursor.write_u32(self.char_id)?;
        cursor.write_u8(self.broadcast_kind)?;
        cursor.write_u8(self.message_kind)?;
        cursor.write_u32(self.payload.len() as u32)?;
        cursor.write_bytes(&self.payload)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let ctx = ClientContext::new();
        let casted = CastedBinary {
            char_id: 77,
            broadcast_kind: 1,
            message_kind: 3,
            payload: vec![0xAA; 32],
        };

        let mut w = FrameCursor::new();
        casted.encode(&mut w, &ctx).unwrap();

        let mut decoded = CastedBinary::default();
        let mut r = FrameCursor::from_bytes(&w.into_inner());
        decoded.decode(&mut r, &ctx).unwrap();

        assert_eq!(decoded, casted);
        assert_eq!(r.remaining(), 0);
    }
}
