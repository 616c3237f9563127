//! # Channel Server
//!
//! Process-wide coordinator for one game channel: the registry of live
//! sessions, broadcast and targeted delivery, the external chat-relay
//! ingress, and the accept loop that binds each new connection to a session
//! task.
//!
//! ## Registry discipline
//!
//! The session map is the only structure mutated from multiple tasks, so
//! every insert, remove, and broadcast iteration goes through one
//! `tokio::sync::Mutex`. A session is a broadcast target exactly while it is
//! present in the map; `leave` is the single point that guarantees no
//! further delivery is attempted on a closing connection.
//!
//! ## Broadcast
//!
//! An outbound packet is encoded once; the same frozen `Bytes` is enqueued
//! to every recipient. Delivery uses the non-blocking queue path: a full or
//! closed queue marks that one session for disconnect and the fan-out moves
//! on, so no recipient can fail another's delivery or block the sender.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::ChannelConfig;
use crate::core::codec::FrameCodec;
use crate::core::context::ClientContext;
use crate::error::{ProtocolError, Result};
use crate::handler::PacketHandler;
use crate::protocol::packet::{encode_to_frame, Packet};
use crate::protocol::packets::ChatMessage;
use crate::protocol::registry::PacketRegistry;
use crate::session::{DisconnectReason, Session, SessionHandle, SessionId};
use crate::utils::metrics::global_metrics;

/// Registry and broadcast coordinator for all sessions of one channel.
pub struct ChannelServer {
    config: ChannelConfig,
    registry: Arc<PacketRegistry>,
    handler: Arc<dyn PacketHandler>,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl ChannelServer {
    pub fn new(
        config: ChannelConfig,
        registry: PacketRegistry,
        handler: Arc<dyn PacketHandler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: Arc::new(registry),
            handler,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    pub fn handler(&self) -> &dyn PacketHandler {
        self.handler.as_ref()
    }

    /// Number of sessions currently visible to broadcast.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Register a session for broadcast. Called by the session loop once it
    /// reaches `Active`.
    pub async fn join(&self, handle: SessionHandle) {
        let id = handle.id;
        let mut sessions = self.sessions.lock().await;
        if sessions.insert(id, handle).is_some() {
            // An id collision would mean delivery to the wrong connection;
            // ids are allocated against the registry, so this is a bug.
            warn!(session_id = id, "joined twice, previous handle replaced");
        }
        debug!(session_id = id, total = sessions.len(), "session joined channel");
    }

    /// Remove a session from broadcast routing. Idempotent: disconnect can
    /// race in from several paths and only one of them wins the removal.
    pub async fn leave(&self, id: SessionId) {
        let mut sessions = self.sessions.lock().await;
        if sessions.remove(&id).is_some() {
            debug!(session_id = id, total = sessions.len(), "session left channel");
        }
    }

    /// Allocate a session id not currently present in the registry.
    async fn allocate_session_id(&self) -> SessionId {
        let sessions = self.sessions.lock().await;
        loop {
            let id: SessionId = rand::random();
            if id != 0 && !sessions.contains_key(&id) {
                return id;
            }
        }
    }

    /// Encode `packet` once and enqueue the bytes to every registered
    /// session except `exclude`. Returns the number of queues reached.
    ///
    /// A failed enqueue marks that recipient for disconnect and continues;
    /// the caller never observes other recipients' failures.
    pub async fn broadcast(&self, packet: &dyn Packet, exclude: Option<SessionId>) -> Result<usize> {
        let frame = encode_to_frame(packet, &ClientContext::default())?;
        let bytes = FrameCodec::frame_to_bytes(&frame);
        Ok(self.broadcast_bytes(bytes, exclude).await)
    }

    async fn broadcast_bytes(&self, bytes: Bytes, exclude: Option<SessionId>) -> usize {
        let sessions = self.sessions.lock().await;
        let mut delivered = 0;

        for (id, handle) in sessions.iter() {
            if Some(*id) == exclude {
                continue;
            }
            match handle.try_send_bytes(bytes.clone()) {
                Ok(()) => {
                    global_metrics().frame_sent(bytes.len() as u64);
                    delivered += 1;
                }
                Err(_) => {
                    global_metrics().delivery_failure();
                    warn!(session_id = *id, "broadcast delivery failed, marking for disconnect");
                    handle.request_disconnect(DisconnectReason::DeliveryFailure);
                }
            }
        }

        global_metrics().broadcast_sent();
        debug!(recipients = delivered, "broadcast enqueued");
        delivered
    }

    /// Targeted single-recipient send. A missing session is reported to the
    /// caller, never fatal.
    pub async fn send_to(&self, id: SessionId, packet: &dyn Packet) -> Result<()> {
        let frame = encode_to_frame(packet, &ClientContext::default())?;
        let bytes = FrameCodec::frame_to_bytes(&frame);

        let sessions = self.sessions.lock().await;
        let handle = sessions
            .get(&id)
            .ok_or(ProtocolError::SessionNotFound(id))?;
        handle.try_send_bytes(bytes.clone()).map_err(|e| {
            global_metrics().delivery_failure();
            handle.request_disconnect(DisconnectReason::DeliveryFailure);
            e
        })?;
        global_metrics().frame_sent(bytes.len() as u64);
        Ok(())
    }

    /// Broadcast a server-originated chat line to every session.
    pub async fn broadcast_chat(&self, text: &str) -> Result<usize> {
        let chat = ChatMessage {
            char_id: 0,
            scope: 0,
            name: String::new(),
            text: text.to_owned(),
        };
        self.broadcast(&chat, None).await
    }

    /// Ingress for the external chat relay: a plain line plus its
    /// originating label become one in-protocol chat broadcast.
    ///
    /// The relay hands over text only; it cannot choose an opcode or reach
    /// any other part of the protocol surface.
    pub async fn inject_chat(&self, label: &str, text: &str) -> Result<usize> {
        let chat = ChatMessage {
            char_id: 0,
            scope: 0,
            name: format!("[{label}]"),
            text: text.to_owned(),
        };
        info!(label, "relay chat injected");
        self.broadcast(&chat, None).await
    }

    /// Accept loop with graceful shutdown.
    ///
    /// Spawns one [`Session::run`] task per accepted connection. A message
    /// on `shutdown_rx` stops accepting, asks every live session to
    /// disconnect, and waits for the registry to empty (bounded by the
    /// configured drain timeout).
    pub async fn serve(
        self: &Arc<Self>,
        listener: TcpListener,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        info!(address = %listener.local_addr()?, "channel server listening");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("shutdown requested, draining sessions");
                    self.shutdown_sessions().await;
                    return Ok(());
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let id = self.allocate_session_id().await;
                            debug!(session_id = id, peer = %addr, "connection accepted");
                            let server = Arc::clone(self);
                            tokio::spawn(async move {
                                Session::run(stream, id, server).await;
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "error accepting connection");
                        }
                    }
                }
            }
        }
    }

    /// Ask every live session to disconnect and wait for the registry to
    /// empty or the drain timeout to pass.
    async fn shutdown_sessions(&self) {
        {
            let sessions = self.sessions.lock().await;
            for handle in sessions.values() {
                handle.request_disconnect(DisconnectReason::ServerShutdown);
            }
        }

        let deadline = tokio::time::Instant::now() + self.config.server.shutdown_drain_timeout;
        loop {
            let remaining = self.session_count().await;
            if remaining == 0 {
                info!("all sessions closed");
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(remaining, "shutdown drain timeout reached");
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }
}
