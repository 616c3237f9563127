//! # Session
//!
//! Per-connection state and processing: the lifecycle state machine, the
//! read/decode/dispatch loop, and the dedicated writer task that serializes
//! all outbound traffic for one connection.
//!
//! ## Lifecycle
//!
//! ```text
//! Connecting -> Authenticating -> Active -> Disconnecting -> Closed
//! ```
//!
//! Only an `Active` session is visible to channel broadcast. `Closed` is
//! terminal: the connection is released exactly once and queued-but-unsent
//! frames are dropped (best-effort delivery is the accepted policy).
//!
//! ## Concurrency
//!
//! The read loop is the only place a session's own state is touched. Other
//! sessions reach this one exclusively by enqueueing pre-encoded bytes onto
//! its outbound channel; the owning writer task is the single consumer, so
//! two writers can never interleave on the same socket.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::core::codec::{FrameCodec, RawFrame};
use crate::core::context::ClientContext;
use crate::core::cursor::FrameCursor;
use crate::error::{ProtocolError, Result};
use crate::handler::HandlerAction;
use crate::protocol::packet::encode_to_frame;
use crate::server::ChannelServer;
use crate::utils::metrics::global_metrics;

/// Stable identifier for one session within a channel server.
pub type SessionId = u32;

/// How often a live session checks for inactivity.
const IDLE_CHECK_PERIOD: Duration = Duration::from_secs(60);

/// Quiet time after which a session is logged as idle. Clients ping well
/// inside this window, so a hit usually means a hung client.
const IDLE_WARNING_AFTER: Duration = Duration::from_secs(120);

/// Session lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport accepted, session machinery not yet running.
    Connecting,
    /// Read loop running, identity not yet established.
    Authenticating,
    /// Identity known; registered for channel broadcast.
    Active,
    /// Teardown in progress; draining the outbound queue.
    Disconnecting,
    /// Terminal. No further sends are attempted.
    Closed,
}

impl SessionState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Active => "active",
            Self::Disconnecting => "disconnecting",
            Self::Closed => "closed",
        }
    }

    const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Connecting, Self::Authenticating)
                | (Self::Authenticating, Self::Active)
                | (Self::Connecting, Self::Disconnecting)
                | (Self::Authenticating, Self::Disconnecting)
                | (Self::Active, Self::Disconnecting)
                | (Self::Disconnecting, Self::Closed)
        )
    }
}

/// Why a session left its read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client asked to log out.
    Logout,
    /// Peer closed the stream on a clean frame boundary.
    PeerClosed,
    /// Stream framing broke: truncated frame or oversized length claim.
    FramingError,
    /// A resolved payload failed to decode; frame boundaries are no longer
    /// trustworthy.
    DecodeError,
    /// The socket or outbound queue failed.
    WriteError,
    /// Read side of the socket failed.
    ReadError,
    /// Server-wide shutdown.
    ServerShutdown,
    /// Broadcast delivery to this session failed; disconnect requested by
    /// the channel server.
    DeliveryFailure,
}

impl DisconnectReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::PeerClosed => "peer closed",
            Self::FramingError => "framing error",
            Self::DecodeError => "decode error",
            Self::WriteError => "write error",
            Self::ReadError => "read error",
            Self::ServerShutdown => "server shutdown",
            Self::DeliveryFailure => "delivery failure",
        }
    }
}

/// Cheaply cloneable handle to a live session, held by the channel server's
/// registry and by anything that needs to push bytes at this connection.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    outbound: mpsc::Sender<Bytes>,
    shutdown: mpsc::Sender<DisconnectReason>,
}

impl SessionHandle {
    /// Enqueue pre-encoded bytes, waiting if the bounded queue is full.
    ///
    /// This is the path for the session's own responses, where backpressure
    /// should stall the producing loop rather than drop frames.
    pub async fn send_bytes(&self, bytes: Bytes) -> Result<()> {
        self.outbound
            .send(bytes)
            .await
            .map_err(|_| ProtocolError::DeliveryFailed(self.id))
    }

    /// Enqueue pre-encoded bytes without waiting.
    ///
    /// Broadcast fan-out uses this so one slow recipient can never stall the
    /// broadcaster; a full or closed queue is a delivery failure isolated to
    /// this session.
    pub fn try_send_bytes(&self, bytes: Bytes) -> Result<()> {
        self.outbound
            .try_send(bytes)
            .map_err(|_| ProtocolError::DeliveryFailed(self.id))
    }

    /// Ask the session's loop to disconnect. Idempotent: repeated requests
    /// and requests against an already-closing session are no-ops.
    pub fn request_disconnect(&self, reason: DisconnectReason) {
        let _ = self.shutdown.try_send(reason);
    }
}

/// Read-only view of a session handed to packet handlers.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: SessionId,
    pub state: SessionState,
    pub context: ClientContext,
}

/// What the read loop should do after processing one frame.
enum LoopStep {
    Continue,
    Stop(DisconnectReason),
}

/// One connection's state plus its processing loop.
pub struct Session {
    id: SessionId,
    state: SessionState,
    context: ClientContext,
    server: Arc<ChannelServer>,
    handle: SessionHandle,
    last_activity: Instant,
}

impl Session {
    /// Drive a freshly accepted connection through its entire lifetime.
    ///
    /// Owns the connection: when this future resolves, the session has
    /// reached `Closed`, is absent from the channel registry, and the socket
    /// halves have been dropped.
    pub async fn run(stream: TcpStream, id: SessionId, server: Arc<ChannelServer>) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_owned());

        let codec = FrameCodec::with_max_payload(server.config().server.max_payload_size);
        let (read_half, write_half) = stream.into_split();
        let mut framed = FramedRead::new(read_half, codec);

        let (outbound_tx, outbound_rx) =
            mpsc::channel::<Bytes>(server.config().server.outbound_queue_capacity);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<DisconnectReason>(1);

        let handle = SessionHandle {
            id,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
        };

        let writer_task = tokio::spawn(writer_loop(outbound_rx, write_half));

        let mut session = Session {
            id,
            state: SessionState::Connecting,
            context: ClientContext::new(),
            server,
            handle: handle.clone(),
            last_activity: Instant::now(),
        };

        global_metrics().session_opened();
        info!(session_id = id, peer = %peer, "session accepted");

        // The transport-level handshake is the accept itself; anything
        // stronger is the authentication collaborator's concern.
        if session.transition(SessionState::Authenticating).is_err() {
            unreachable!("connecting always reaches authenticating");
        }

        let mut idle_check = tokio::time::interval(IDLE_CHECK_PERIOD);

        let reason = loop {
            tokio::select! {
                requested = shutdown_rx.recv() => {
                    break requested.unwrap_or(DisconnectReason::ServerShutdown);
                }
                _ = idle_check.tick() => {
                    let quiet = session.last_activity.elapsed();
                    if quiet >= IDLE_WARNING_AFTER {
                        warn!(
                            session_id = id,
                            quiet_secs = quiet.as_secs(),
                            "session has gone quiet"
                        );
                    }
                }
                next = framed.next() => match next {
                    None => break DisconnectReason::PeerClosed,
                    Some(Err(e)) => break session.classify_stream_error(&e),
                    Some(Ok(frame)) => match session.process_frame(frame).await {
                        LoopStep::Continue => {}
                        LoopStep::Stop(reason) => break reason,
                    },
                },
            }
        };

        session.teardown(handle, reason, writer_task).await;
    }

    fn transition(&mut self, to: SessionState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(ProtocolError::InvalidTransition {
                from: self.state.name(),
                to: to.name(),
            });
        }
        debug!(
            session_id = self.id,
            from = self.state.name(),
            to = to.name(),
            "session state change"
        );
        self.state = to;
        Ok(())
    }

    fn classify_stream_error(&self, error: &ProtocolError) -> DisconnectReason {
        match error {
            ProtocolError::OversizedFrame(_) | ProtocolError::TruncatedFrame => {
                warn!(session_id = self.id, %error, "fatal framing error");
                DisconnectReason::FramingError
            }
            _ => {
                warn!(session_id = self.id, %error, "read error");
                DisconnectReason::ReadError
            }
        }
    }

    /// Dispatch one inbound frame: resolve, decode, hand to the handler,
    /// execute the returned actions.
    async fn process_frame(&mut self, frame: RawFrame) -> LoopStep {
        self.last_activity = Instant::now();
        let metrics = global_metrics();
        metrics.frame_received(frame.encoded_len() as u64);

        let mut packet = match self.server.registry().resolve(frame.opcode) {
            Ok(packet) => packet,
            Err(_) => {
                // Forward/backward compatibility: an opcode this build does
                // not know is dropped, not fatal. The length field already
                // told the codec where the frame ends, so the stream stays
                // in sync.
                metrics.unknown_opcode();
                debug!(
                    session_id = self.id,
                    opcode = format_args!("{:#06x}", frame.opcode),
                    len = frame.payload.len(),
                    "dropping frame with unknown opcode"
                );
                return LoopStep::Continue;
            }
        };

        let mut cursor = FrameCursor::from_bytes(&frame.payload);
        if let Err(error) = packet.decode(&mut cursor, &self.context) {
            metrics.decode_failure();
            warn!(
                session_id = self.id,
                opcode = ?packet.opcode(),
                %error,
                "payload decode failed, disconnecting"
            );
            return LoopStep::Stop(DisconnectReason::DecodeError);
        }
        if cursor.remaining() > 0 {
            metrics.decode_failure();
            let error = ProtocolError::TrailingBytes {
                opcode: packet.opcode(),
                remaining: cursor.remaining(),
            };
            warn!(session_id = self.id, %error, "disconnecting");
            return LoopStep::Stop(DisconnectReason::DecodeError);
        }

        let info = SessionInfo {
            id: self.id,
            state: self.state,
            context: self.context.clone(),
        };

        let actions = match self.server.handler().handle(packet.as_ref(), &info) {
            Ok(actions) => actions,
            Err(error) => {
                warn!(session_id = self.id, %error, "handler rejected packet");
                return LoopStep::Stop(DisconnectReason::DecodeError);
            }
        };

        for action in actions {
            match self.apply_action(action).await {
                LoopStep::Continue => {}
                stop @ LoopStep::Stop(_) => return stop,
            }
        }

        LoopStep::Continue
    }

    async fn apply_action(&mut self, action: HandlerAction) -> LoopStep {
        match action {
            HandlerAction::Respond(packet) => {
                let frame = match encode_to_frame(packet.as_ref(), &self.context) {
                    Ok(frame) => frame,
                    Err(error) => {
                        // Encoding a receive-only variant is a handler logic
                        // error; it costs this response, not the connection.
                        warn!(session_id = self.id, %error, "response encode failed");
                        return LoopStep::Continue;
                    }
                };
                let bytes = FrameCodec::frame_to_bytes(&frame);
                global_metrics().frame_sent(bytes.len() as u64);
                if self.handle.send_bytes(bytes).await.is_err() {
                    return LoopStep::Stop(DisconnectReason::WriteError);
                }
                LoopStep::Continue
            }

            HandlerAction::Broadcast {
                packet,
                exclude_self,
            } => {
                let exclude = exclude_self.then_some(self.id);
                if let Err(error) = self.server.broadcast(packet.as_ref(), exclude).await {
                    warn!(session_id = self.id, %error, "broadcast failed");
                }
                LoopStep::Continue
            }

            HandlerAction::Authenticate {
                identity,
                protocol_version,
            } => {
                if let Err(error) = self.transition(SessionState::Active) {
                    warn!(session_id = self.id, %error, "authentication out of order");
                    return LoopStep::Stop(DisconnectReason::DecodeError);
                }
                info!(
                    session_id = self.id,
                    char_id = identity.char_id,
                    name = %identity.name,
                    protocol_version,
                    "session authenticated"
                );
                self.context.protocol_version = protocol_version;
                self.context.identity = Some(identity);
                self.server.join(self.handle.clone()).await;
                LoopStep::Continue
            }

            HandlerAction::Disconnect => LoopStep::Stop(DisconnectReason::Logout),
        }
    }

    /// Leave the registry, drain the writer, release the connection.
    ///
    /// Every exit path funnels through here exactly once. The drain timeout
    /// bounds how long a slow peer can hold the session in `Disconnecting`;
    /// when it fires, whatever is still queued is dropped.
    async fn teardown(
        mut self,
        handle: SessionHandle,
        reason: DisconnectReason,
        writer_task: tokio::task::JoinHandle<Result<()>>,
    ) {
        let _ = self.transition(SessionState::Disconnecting);
        info!(
            session_id = self.id,
            reason = reason.as_str(),
            "session disconnecting"
        );

        // Deregister first: from this point no broadcast can target this
        // session, and leave() is idempotent if another path got here first.
        self.server.leave(self.id).await;

        // Dropping the queue senders lets the writer drain and exit.
        drop(handle);
        drop(self.handle);

        let drain = self.server.config().server.shutdown_drain_timeout;
        let mut writer_task = writer_task;
        match tokio::time::timeout(drain, &mut writer_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(error))) => {
                debug!(session_id = self.id, %error, "writer closed with error");
            }
            Ok(Err(join_error)) => {
                warn!(session_id = self.id, %join_error, "writer task panicked");
            }
            Err(_) => {
                // Timeout: queued-but-unsent frames are dropped. Policy, not
                // an oversight.
                warn!(session_id = self.id, "writer drain timed out, dropping queue");
                writer_task.abort();
            }
        }

        self.state = SessionState::Closed;
        global_metrics().session_closed();
        info!(session_id = self.id, "session closed");
    }
}

/// Single consumer of a session's outbound queue.
///
/// Writes frames in enqueue order and exits when every sender is gone and
/// the queue is drained, or on the first write error.
async fn writer_loop<W>(mut rx: mpsc::Receiver<Bytes>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = rx.recv().await {
        writer.write_all(&bytes).await?;
        writer.flush().await?;
    }
    Ok(())
}
