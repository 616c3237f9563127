//! Shared harness for integration tests: a real channel server on an
//! ephemeral port and a minimal wire-speaking client.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use channel_protocol::config::ChannelConfig;
use channel_protocol::core::context::ClientContext;
use channel_protocol::core::cursor::FrameCursor;
use channel_protocol::handler::CoreHandler;
use channel_protocol::protocol::packet::encode_to_frame;
use channel_protocol::protocol::packets::SysAck;
use channel_protocol::protocol::{Opcode, Packet, PacketRegistry};
use channel_protocol::server::ChannelServer;
use channel_protocol::{FrameCodec, RawFrame};

/// A running server plus the pieces tests need to talk to and stop it.
pub struct TestServer {
    pub server: Arc<ChannelServer>,
    pub addr: String,
    pub shutdown: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<channel_protocol::Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_config(ChannelConfig::default()).await
    }

    pub async fn start_with_config(config: ChannelConfig) -> Self {
        let server = ChannelServer::new(
            config,
            PacketRegistry::with_defaults(),
            Arc::new(CoreHandler::new()),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (shutdown, shutdown_rx) = mpsc::channel(1);

        let serve_server = Arc::clone(&server);
        let task = tokio::spawn(async move { serve_server.serve(listener, shutdown_rx).await });

        Self {
            server,
            addr,
            shutdown,
            task,
        }
    }

    /// Poll until the broadcast registry holds exactly `count` sessions.
    pub async fn wait_for_sessions(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if self.server.session_count().await == count {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "registry never reached {count} sessions"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(()).await;
        let _ = self.task.await;
    }
}

/// Client end of one connection, speaking raw frames.
pub struct TestClient {
    framed: Framed<TcpStream, FrameCodec>,
}

impl TestClient {
    pub async fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            framed: Framed::new(stream, FrameCodec::new()),
        }
    }

    pub async fn send_frame(&mut self, frame: RawFrame) {
        self.framed.send(frame).await.unwrap();
    }

    /// Encode and send a packet that supports the encode path.
    pub async fn send_packet(&mut self, packet: &dyn Packet) {
        let frame = encode_to_frame(packet, &ClientContext::default()).unwrap();
        self.send_frame(frame).await;
    }

    /// Receive the next frame, failing the test after two seconds.
    pub async fn expect_frame(&mut self) -> RawFrame {
        tokio::time::timeout(Duration::from_secs(2), self.framed.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream closed while a frame was expected")
            .expect("frame decode failed")
    }

    /// Assert that no frame arrives within the window.
    pub async fn expect_silence(&mut self, window: Duration) {
        let outcome = tokio::time::timeout(window, self.framed.next()).await;
        assert!(outcome.is_err(), "expected silence, received {outcome:?}");
    }

    /// Assert the stream ends (server closed the connection).
    pub async fn expect_closed(&mut self) {
        let outcome = tokio::time::timeout(Duration::from_secs(2), self.framed.next())
            .await
            .expect("timed out waiting for the server to close the connection");
        match outcome {
            None => {}
            Some(Err(_)) => {}
            Some(Ok(frame)) => panic!("expected close, received frame {frame:?}"),
        }
    }

    /// Log in and consume the ack. Leaves the session `Active` and joined.
    pub async fn login(&mut self, account_id: u32, name: &str) {
        self.send_frame(login_frame(1, account_id, name)).await;
        let ack = self.expect_ack().await;
        assert_eq!(ack.ack_handle, 1);
        assert_eq!(ack.error_code, 0);
    }

    pub async fn expect_ack(&mut self) -> SysAck {
        let frame = self.expect_frame().await;
        assert_eq!(frame.opcode, Opcode::SysAck.to_u16());
        decode_payload::<SysAck>(&frame)
    }

    /// Access the raw stream for half-close tricks.
    pub fn into_stream(self) -> TcpStream {
        self.framed.into_inner()
    }
}

/// Decode a frame payload into a concrete packet type, asserting full
/// consumption.
pub fn decode_payload<P: Packet + Default>(frame: &RawFrame) -> P {
    let mut packet = P::default();
    let mut cursor = FrameCursor::from_bytes(&frame.payload);
    packet
        .decode(&mut cursor, &ClientContext::default())
        .unwrap();
    assert_eq!(cursor.remaining(), 0, "payload not fully consumed");
    packet
}

/// Hand-build a login frame; `SysLogin` is receive-only so the client side
/// writes the wire layout directly.
pub fn login_frame(ack_handle: u32, account_id: u32, name: &str) -> RawFrame {
    let mut w = FrameCursor::new();
    w.write_u32(ack_handle).unwrap();
    w.write_u32(account_id).unwrap();
    w.write_u8(1).unwrap();
    w.write_string("test-token").unwrap();
    w.write_string(name).unwrap();
    RawFrame::new(Opcode::SysLogin.to_u16(), w.into_inner())
}

/// Hand-build a logout frame.
pub fn logout_frame(ack_handle: u32) -> RawFrame {
    let mut w = FrameCursor::new();
    w.write_u32(ack_handle).unwrap();
    RawFrame::new(Opcode::SysLogout.to_u16(), w.into_inner())
}

/// Hand-build a binary cast request.
pub fn cast_frame(broadcast_kind: u8, message_kind: u8, payload: &[u8]) -> RawFrame {
    let mut w = FrameCursor::new();
    w.write_u8(broadcast_kind).unwrap();
    w.write_u8(message_kind).unwrap();
    w.write_u32(payload.len() as u32).unwrap();
    w.write_bytes(payload).unwrap();
    RawFrame::new(Opcode::CastBinary.to_u16(), w.into_inner())
}
