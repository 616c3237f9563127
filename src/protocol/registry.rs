//! Opcode-to-constructor registry.
//!
//! The registry maps each wire opcode to a constructor for the matching
//! packet variant. It is built once at process start and never mutated
//! afterwards; sessions share it behind an `Arc` and only call
//! [`PacketRegistry::resolve`]. Keeping registration construction-time means
//! there is no lock on the dispatch path and no runtime registration race.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::protocol::opcode::Opcode;
use crate::protocol::packet::Packet;
use crate::protocol::packets;

/// Constructor producing an empty packet instance ready for `decode`.
pub type PacketConstructor = fn() -> Box<dyn Packet>;

/// Static opcode-to-variant mapping.
pub struct PacketRegistry {
    constructors: HashMap<u16, PacketConstructor>,
}

impl PacketRegistry {
    /// An empty registry. Most callers want [`PacketRegistry::with_defaults`].
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry holding every variant this crate ships.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Registration is total here; a duplicate is a programming error in
        // the opcode table, so it cannot happen for the shipped set.
        let defaults: &[(Opcode, PacketConstructor)] = &[
            (Opcode::SysPing, || Box::new(packets::SysPing::default())),
            (Opcode::SysAck, || Box::new(packets::SysAck::default())),
            (Opcode::SysLogin, || Box::new(packets::SysLogin::default())),
            (Opcode::SysLogout, || {
                Box::new(packets::SysLogout::default())
            }),
            (Opcode::SysTerminalLog, || {
                Box::new(packets::SysTerminalLog::default())
            }),
            (Opcode::ChatMessage, || {
                Box::new(packets::ChatMessage::default())
            }),
            (Opcode::CastBinary, || {
                Box::new(packets::CastBinary::default())
            }),
            (Opcode::CastedBinary, || {
                Box::new(packets::CastedBinary::default())
            }),
        ];

        for (opcode, constructor) in defaults {
            registry
                .register(*opcode, *constructor)
                .unwrap_or_else(|_| unreachable!("default opcode table holds duplicates"));
        }

        registry
    }

    /// Register a constructor for an opcode.
    ///
    /// Fails with [`ProtocolError::DuplicateOpcode`] if the opcode already
    /// has one; at most one constructor may exist per opcode value.
    pub fn register(&mut self, opcode: Opcode, constructor: PacketConstructor) -> Result<()> {
        if self.constructors.contains_key(&opcode.to_u16()) {
            return Err(ProtocolError::DuplicateOpcode(opcode));
        }
        self.constructors.insert(opcode.to_u16(), constructor);
        Ok(())
    }

    /// Instantiate an empty packet for a wire opcode.
    ///
    /// An unknown opcode is a first-class outcome, not a fault: callers log
    /// and drop the frame while the connection continues.
    pub fn resolve(&self, opcode: u16) -> Result<Box<dyn Packet>> {
        match self.constructors.get(&opcode) {
            Some(constructor) => Ok(constructor()),
            None => {
                debug!(opcode = format_args!("{opcode:#06x}"), "no constructor for opcode");
                Err(ProtocolError::UnknownOpcode(opcode))
            }
        }
    }

    /// Number of registered opcodes.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl Default for PacketRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
