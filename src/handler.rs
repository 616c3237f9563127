//! # Handler Boundary
//!
//! The seam between the protocol core and game logic. The core hands every
//! successfully decoded packet, together with a read-only view of the
//! originating session, to a [`PacketHandler`]; the handler answers with a
//! list of [`HandlerAction`]s the session loop then executes. Handlers never
//! touch sockets or queues directly, which keeps all write paths owned by
//! the session machinery.
//!
//! [`CoreHandler`] is the reference implementation covering the opcodes this
//! crate ships; a game deployment wraps or replaces it with its own routing
//! for the rest of the opcode space.

use tracing::{debug, warn};

use crate::core::context::Identity;
use crate::error::Result;
use crate::protocol::packet::Packet;
use crate::protocol::packets::{
    CastBinary, CastedBinary, ChatMessage, SysAck, SysLogin, SysLogout, SysPing, SysTerminalLog,
};
use crate::session::SessionInfo;

/// What a handler wants done after processing one inbound packet.
///
/// Actions are executed in order by the originating session's loop.
#[derive(Debug)]
pub enum HandlerAction {
    /// Enqueue a packet on the originating session's outbound queue.
    Respond(Box<dyn Packet>),

    /// Encode once and fan out to every registered session.
    Broadcast {
        packet: Box<dyn Packet>,
        /// Skip the originating session, the usual anti-echo choice.
        exclude_self: bool,
    },

    /// Attach an identity and promote the session to `Active`; the session
    /// joins channel broadcast routing at this point.
    Authenticate {
        identity: Identity,
        /// Protocol revision the client announced, recorded in the session
        /// context for payloads that vary by revision.
        protocol_version: u8,
    },

    /// Begin the session's disconnect path after the other actions run.
    Disconnect,
}

/// Business-logic boundary for decoded packets.
///
/// Implementations must be cheap to call and free of blocking work; they run
/// inline in the session's read loop.
pub trait PacketHandler: Send + Sync {
    fn handle(&self, packet: &dyn Packet, session: &SessionInfo) -> Result<Vec<HandlerAction>>;
}

/// Reference handler for the core opcode set: acks pings, authenticates
/// logins, relays chat and binary casts, and tears down on logout.
///
/// Token verification is delegated to the deployment; this handler accepts
/// any login whose fields decode, which is what the protocol core itself can
/// vouch for.
#[derive(Debug, Default)]
pub struct CoreHandler;

impl CoreHandler {
    pub fn new() -> Self {
        Self
    }
}

impl PacketHandler for CoreHandler {
    fn handle(&self, packet: &dyn Packet, session: &SessionInfo) -> Result<Vec<HandlerAction>> {
        let any = packet.as_any();

        if let Some(ping) = any.downcast_ref::<SysPing>() {
            return Ok(vec![HandlerAction::Respond(Box::new(SysAck::success(
                ping.ack_handle,
            )))]);
        }

        if let Some(login) = any.downcast_ref::<SysLogin>() {
            let identity = Identity {
                char_id: login.account_id,
                name: login.character_name.clone(),
            };
            return Ok(vec![
                HandlerAction::Authenticate {
                    identity,
                    protocol_version: login.protocol_version,
                },
                HandlerAction::Respond(Box::new(SysAck::success(login.ack_handle))),
            ]);
        }

        if let Some(logout) = any.downcast_ref::<SysLogout>() {
            return Ok(vec![
                HandlerAction::Respond(Box::new(SysAck::success(logout.ack_handle))),
                HandlerAction::Disconnect,
            ]);
        }

        if let Some(log) = any.downcast_ref::<SysTerminalLog>() {
            debug!(
                session_id = session.id,
                entries = log.entries.len(),
                "client terminal log received"
            );
            return Ok(vec![HandlerAction::Respond(Box::new(SysAck::success(
                log.ack_handle,
            )))]);
        }

        if let Some(chat) = any.downcast_ref::<ChatMessage>() {
            let Some(identity) = session.context.identity.as_ref() else {
                warn!(session_id = session.id, "chat from unauthenticated session dropped");
                return Ok(vec![]);
            };
            let stamped = ChatMessage {
                char_id: identity.char_id,
                scope: chat.scope,
                name: identity.name.clone(),
                text: chat.text.clone(),
            };
            return Ok(vec![HandlerAction::Broadcast {
                packet: Box::new(stamped),
                exclude_self: true,
            }]);
        }

        if let Some(cast) = any.downcast_ref::<CastBinary>() {
            let Some(identity) = session.context.identity.as_ref() else {
                warn!(session_id = session.id, "cast from unauthenticated session dropped");
                return Ok(vec![]);
            };
            let casted = CastedBinary {
                char_id: identity.char_id,
                broadcast_kind: cast.broadcast_kind,
                message_kind: cast.message_kind,
                payload: cast.payload.clone(),
            };
            return Ok(vec![HandlerAction::Broadcast {
                packet: Box::new(casted),
                exclude_self: true,
            }]);
        }

        debug!(
            session_id = session.id,
            opcode = ?packet.opcode(),
            "no core handling for packet, dropping"
        );
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ClientContext;
    use crate::session::SessionState;

    fn active_session(char_id: u32, name: &str) -> SessionInfo {
        let mut context = ClientContext::new();
        context.identity = Some(Identity {
            char_id,
            name: name.to_owned(),
        });
        SessionInfo {
            id: 1,
            state: SessionState::Active,
            context,
        }
    }

    fn connecting_session() -> SessionInfo {
        SessionInfo {
            id: 2,
            state: SessionState::Authenticating,
            context: ClientContext::new(),
        }
    }

    #[test]
    fn ping_is_acked_with_same_handle() {
        let handler = CoreHandler::new();
        let ping = SysPing { ack_handle: 33 };
        let actions = handler.handle(&ping, &active_session(5, "A")).unwrap();

        assert_eq!(actions.len(), 1);
        match &actions[0] {
            HandlerAction::Respond(packet) => {
                let ack = packet.as_any().downcast_ref::<SysAck>().unwrap();
                assert_eq!(ack.ack_handle, 33);
                assert_eq!(ack.error_code, 0);
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[test]
    fn login_authenticates_then_acks() {
        let handler = CoreHandler::new();
        let login = SysLogin {
            ack_handle: 1,
            account_id: 400,
            protocol_version: 2,
            token: "t".into(),
            character_name: "Rathian".into(),
        };
        let actions = handler.handle(&login, &connecting_session()).unwrap();

        assert_eq!(actions.len(), 2);
        match &actions[0] {
            HandlerAction::Authenticate {
                identity,
                protocol_version,
            } => {
                assert_eq!(identity.char_id, 400);
                assert_eq!(identity.name, "Rathian");
                assert_eq!(*protocol_version, 2);
            }
            other => panic!("expected Authenticate, got {other:?}"),
        }
        assert!(matches!(actions[1], HandlerAction::Respond(_)));
    }

    #[test]
    fn logout_acks_then_disconnects() {
        let handler = CoreHandler::new();
        let logout = SysLogout { ack_handle: 9 };
        let actions = handler.handle(&logout, &active_session(5, "A")).unwrap();

        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], HandlerAction::Respond(_)));
        assert!(matches!(actions[1], HandlerAction::Disconnect));
    }

    #[test]
    fn chat_broadcast_is_stamped_with_identity() {
        let handler = CoreHandler::new();
        let chat = ChatMessage {
            char_id: 0,
            scope: 0,
            name: String::new(),
            text: "hello channel".into(),
        };
        let actions = handler.handle(&chat, &active_session(42, "Kirin")).unwrap();

        match &actions[0] {
            HandlerAction::Broadcast {
                packet,
                exclude_self,
            } => {
                assert!(*exclude_self);
                let stamped = packet.as_any().downcast_ref::<ChatMessage>().unwrap();
                assert_eq!(stamped.char_id, 42);
                assert_eq!(stamped.name, "Kirin");
                assert_eq!(stamped.text, "hello channel");
            }
            other => panic!("expected Broadcast, got {other:?}"),
        }
    }

    #[test]
    fn unauthenticated_chat_is_dropped() {
        let handler = CoreHandler::new();
        let chat = ChatMessage {
            text: "premature".into(),
            ..Default::default()
        };
        let actions = handler.handle(&chat, &connecting_session()).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn cast_binary_becomes_casted_binary() {
        let handler = CoreHandler::new();
        let cast = CastBinary {
            broadcast_kind: 1,
            message_kind: 7,
            payload: vec![1, 2, 3],
        };
        let actions = handler.handle(&cast, &active_session(8, "B")).unwrap();

        match &actions[0] {
            HandlerAction::Broadcast { packet, .. } => {
                let casted = packet.as_any().downcast_ref::<CastedBinary>().unwrap();
                assert_eq!(casted.char_id, 8);
                assert_eq!(casted.payload, vec![1, 2, 3]);
            }
            other => panic!("expected Broadcast, got {other:?}"),
        }
    }
}
