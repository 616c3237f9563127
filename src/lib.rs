//! # Channel Protocol
//!
//! Wire protocol and session core for multiplayer game channel servers.
//!
//! The crate covers everything between the socket and the game logic:
//!
//! - **Framing**: opcode-tagged, length-prefixed binary frames
//!   ([`core::codec`]) built on a bounds-checked byte cursor
//!   ([`core::cursor`]).
//! - **Typed packets**: one [`protocol::Packet`] variant per opcode,
//!   instantiated through a startup-fixed [`protocol::PacketRegistry`].
//! - **Sessions**: a task-per-connection read/decode/dispatch loop with a
//!   dedicated writer task per connection ([`session`]).
//! - **Broadcast**: a channel-wide session registry with encode-once
//!   fan-out, targeted sends, and an external chat-relay ingress
//!   ([`server`]).
//!
//! Game handlers plug in at the [`handler::PacketHandler`] seam: the core
//! hands over each decoded packet plus a session view and executes the
//! actions the handler returns. The core itself never interprets payload
//! semantics beyond opcode and length.
//!
//! ## Error policy
//!
//! Malformed input never panics below the session layer. Unknown opcodes
//! are dropped and the connection lives on; broken framing or a failed
//! decode disconnects the offending client; a delivery failure during
//! broadcast is isolated to the one failing recipient.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use channel_protocol::config::ChannelConfig;
//! use channel_protocol::handler::CoreHandler;
//! use channel_protocol::protocol::PacketRegistry;
//! use channel_protocol::server::ChannelServer;
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> channel_protocol::error::Result<()> {
//!     let config = ChannelConfig::from_env()?;
//!     config.validate_strict()?;
//!
//!     let server = ChannelServer::new(
//!         config.clone(),
//!         PacketRegistry::with_defaults(),
//!         Arc::new(CoreHandler::new()),
//!     );
//!
//!     let listener = TcpListener::bind(&config.server.address).await?;
//!
//!     let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
//!     tokio::spawn(async move {
//!         if let Ok(()) = tokio::signal::ctrl_c().await {
//!             let _ = shutdown_tx.send(()).await;
//!         }
//!     });
//!
//!     server.serve(listener, shutdown_rx).await
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod session;
pub mod utils;

pub use crate::config::ChannelConfig;
pub use crate::core::codec::{FrameCodec, RawFrame};
pub use crate::core::context::{ClientContext, Identity};
pub use crate::core::cursor::FrameCursor;
pub use crate::error::{ProtocolError, Result};
pub use crate::handler::{CoreHandler, HandlerAction, PacketHandler};
pub use crate::protocol::{Opcode, Packet, PacketRegistry};
pub use crate::server::ChannelServer;
pub use crate::session::{
    DisconnectReason, Session, SessionHandle, SessionId, SessionInfo, SessionState,
};
