//! Per-opcode packet variants.
//!
//! One file per variant, each implementing the
//! [`Packet`](crate::protocol::packet::Packet) trio: `opcode`, `decode`,
//! `encode`. A deployment built on this core adds its own variants the same
//! way and registers them next to the defaults.

mod cast_binary;
mod casted_binary;
mod chat_message;
mod sys_ack;
mod sys_login;
mod sys_logout;
mod sys_ping;
mod sys_terminal_log;

pub use cast_binary::CastBinary;
pub use casted_binary::CastedBinary;
pub use chat_message::ChatMessage;
pub use sys_ack::SysAck;
pub use sys_login::SysLogin;
pub use sys_logout::SysLogout;
pub use sys_ping::SysPing;
pub use sys_terminal_log::SysTerminalLog;
