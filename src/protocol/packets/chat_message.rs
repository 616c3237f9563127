//! Chat line.

use std::any::Any;

use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::Result;
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;

/// A chat line. Travels both directions: clients send it with `char_id`
/// zero, and the server stamps the sender before broadcasting. Lines
/// injected from an external relay use char id zero with the relay label
/// folded into `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub char_id: u32,
    /// Chat scope (0 = channel-wide; higher values are deployment-defined).
    pub scope: u8,
    pub name: String,
    pub text: String,
}

impl Packet for ChatMessage {
    fn opcode(&self) -> Opcode {
        Opcode::ChatMessage
    }

    fn decode(&mut self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        self.char_id = cursor.read_u32()?;
        self.scope = cursor.read_u8()?;
        self.name = cursor.read_string()?;
        self.text = cursor.read_string()?;
        Ok(())
    }

    fn encode(&self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        cursor.write_u32(self.char_id)?;
        cursor.write_u8(self.scope)?;
        cursor.write_string(&self.name)?;
        cursor.write_string(&self.text)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
