//! Client login request.

use std::any::Any;

use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::{ProtocolError, Result};
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;

/// Login request carrying the account id and a token the authentication
/// collaborator verifies. Receive-only: the server never sends one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysLogin {
    pub ack_handle: u32,
    pub account_id: u32,
    /// Protocol revision the client speaks; copied into the session context
    /// on successful authentication.
    pub protocol_version: u8,
    pub token: String,
    /// Character the client is entering the channel with. Verified against
    /// saved data by the authentication collaborator, not by this core.
    pub character_name: String,
}

impl Packet for SysLogin {
    fn opcode(&self) -> Opcode {
        Opcode::SysLogin
    }

    fn decode(&mut self, cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        self.ack_handle = cursor.read_u32()?;
        self.account_id = cursor.read_u32()?;
        self.protocol_version = cursor.read_u8()?;
        self.token = cursor.read_string()?;
        self.character_name = cursor.read_string()?;
        Ok(())
    }

    fn encode(&self, _cursor: &mut FrameCursor, _ctx: &ClientContext) -> Result<()> {
        Err(ProtocolError::EncodeNotImplemented(self.opcode()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
