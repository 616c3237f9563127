//! Per-connection decode/encode context.
//!
//! Some payloads change shape with what the connection has negotiated, so
//! `decode`/`encode` receive this context alongside the cursor. The context
//! belongs to the connection, not the packet: variants stay stateless across
//! frames.

/// Identity established for a session once authentication completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable character id, used as the broadcast sender id.
    pub char_id: u32,
    /// Display name carried in chat relays.
    pub name: String,
}

/// Connection-scoped information available while decoding or encoding.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    /// Protocol revision the client announced at login. Zero until known.
    pub protocol_version: u8,
    /// Set by the handler when the session authenticates.
    pub identity: Option<Identity>,
}

impl ClientContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the handler has attached an identity.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}
