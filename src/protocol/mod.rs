//! # Protocol Layer
//!
//! The typed face of the wire: opcodes, the packet contract, the per-opcode
//! variants, and the startup-time registry that maps one to the other.

pub mod opcode;
pub mod packet;
pub mod packets;
pub mod registry;

pub use opcode::Opcode;
pub use packet::{encode_to_frame, Packet};
pub use registry::PacketRegistry;
