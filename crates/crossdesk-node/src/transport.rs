//! Reliable ack-gated RPC over a channel.
//!
//! Every frame the transport sends must be answered by an ack before the
//! exchange continues, and a whole exchange (header, ack, payload, ack)
//! runs under one per-entity mutex so concurrent callers can never
//! interleave frames on the wire.
//!
//! Failure policy:
//! - `NotConnected`: reconnect once, then restart the whole exchange.
//! - `BrokenPipe`: close and reconnect the channel, then restart.
//! - Anything else, including a malformed ack, surfaces immediately.
//!
//! Restarts run in a bounded loop with linear backoff; when the budget is
//! spent the caller gets [`TransportError::RetryExhausted`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crossdesk_core::protocol::events::{encode_event, OsEvent};
use crossdesk_core::protocol::packets::{decode_ack, encode_header, ACK_SIZE};
use crossdesk_core::{PacketType, WireError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::infrastructure::channel::{recv_exact, Channel, ChannelError};

/// Maximum number of times one exchange is attempted before giving up.
pub const MAX_CALL_ATTEMPTS: u32 = 3;

/// Base backoff between attempts; multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Errors surfaced to RPC callers.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying channel failed and recovery did not help.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The peer sent a frame that does not decode (wrong size or magic).
    #[error("invalid packet: {0}")]
    InvalidPacket(#[from] WireError),

    /// Every attempt in the retry budget failed with a recoverable error.
    #[error("retry budget exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    /// The operation is not valid for this entity's role.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
}

/// The reliable RPC endpoint for one remote entity.
pub struct RpcTransport {
    channel: Arc<dyn Channel>,
    /// Serializes whole exchanges; held across header and payload frames.
    exchange_lock: Mutex<()>,
}

impl RpcTransport {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self { channel, exchange_lock: Mutex::new(()) }
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// Connects the underlying channel if it is not already connected.
    pub fn connect(&self) -> Result<(), TransportError> {
        self.channel.connect().map_err(TransportError::from)
    }

    /// Performs one ack-gated RPC: header, ack, then the optional payload
    /// frame, ack. Recoverable channel failures restart the whole call.
    pub fn call(&self, packet_type: PacketType, payload: Option<&[u8]>) -> Result<(), TransportError> {
        let _guard = self.lock_exchange();

        for attempt in 1..=MAX_CALL_ATTEMPTS {
            match self.exchange(packet_type, payload) {
                Ok(()) => return Ok(()),
                Err(TransportError::Channel(e)) => {
                    self.recover(e)?;
                    warn!(
                        peer = %self.channel.peer_addr(),
                        ?packet_type,
                        attempt,
                        "exchange failed, restarting call"
                    );
                    std::thread::sleep(RETRY_BACKOFF * attempt);
                }
                Err(other) => return Err(other),
            }
        }
        Err(TransportError::RetryExhausted { attempts: MAX_CALL_ATTEMPTS })
    }

    /// Forwards an OS event: the two-ack exchange (header, ack, payload,
    /// ack) under one lock acquisition.
    ///
    /// Event injection is not idempotent, so only a failed *header send* is
    /// retried; at that point the peer provably saw nothing. Any failure
    /// after the header leaves the wire surfaces immediately.
    pub fn forward_event(&self, event: &OsEvent) -> Result<(), TransportError> {
        let _guard = self.lock_exchange();

        if !self.channel.is_connected() {
            self.channel.connect()?;
        }

        let header = encode_header(PacketType::OsEventHeader);
        for attempt in 1..=MAX_CALL_ATTEMPTS {
            match self.channel.send(&header) {
                Ok(()) => {
                    self.await_ack()?;
                    self.channel.send(&encode_event(event))?;
                    return self.await_ack();
                }
                Err(e) => {
                    self.recover(e)?;
                    debug!(attempt, "event header send failed, reconnected");
                    std::thread::sleep(RETRY_BACKOFF * attempt);
                }
            }
        }
        Err(TransportError::RetryExhausted { attempts: MAX_CALL_ATTEMPTS })
    }

    /// Sends one heartbeat probe. No retry: the heartbeat loop treats any
    /// failure as terminal.
    pub fn heartbeat(&self) -> Result<(), TransportError> {
        let _guard = self.lock_exchange();
        self.channel.send(&encode_header(PacketType::Heartbeat))?;
        self.await_ack()
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn lock_exchange(&self) -> MutexGuard<'_, ()> {
        self.exchange_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn exchange(&self, packet_type: PacketType, payload: Option<&[u8]>) -> Result<(), TransportError> {
        self.channel.send(&encode_header(packet_type))?;
        self.await_ack()?;
        if let Some(payload) = payload {
            self.channel.send(payload)?;
            self.await_ack()?;
        }
        Ok(())
    }

    fn await_ack(&self) -> Result<(), TransportError> {
        let mut buf = [0u8; ACK_SIZE];
        recv_exact(&*self.channel, &mut buf)?;
        decode_ack(&buf)?;
        Ok(())
    }

    /// Brings the channel back to a sendable state after a recoverable
    /// failure, or propagates the error when recovery is impossible.
    fn recover(&self, e: ChannelError) -> Result<(), TransportError> {
        match e {
            ChannelError::NotConnected => self
                .channel
                .connect()
                .map_err(|_| TransportError::Channel(ChannelError::NotConnected)),
            ChannelError::BrokenPipe => {
                self.channel.close();
                self.channel.connect().map_err(TransportError::from)
            }
            other => Err(TransportError::Channel(other)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::channel::memory::{MemoryChannel, ScriptedFailure};
    use crossdesk_core::protocol::events::EVENT_PAYLOAD_SIZE;
    use crossdesk_core::protocol::packets::{
        decode_header, encode_ack, HEADER_SIZE, MOUSE_POSITION_PAYLOAD_SIZE,
    };

    /// Serves the peer side of `frame_sizes.len()` frames: reads each frame
    /// of the given size and answers it with an ack. Returns the raw frames.
    fn serve_acks(peer: MemoryChannel, frame_sizes: Vec<usize>) -> std::thread::JoinHandle<Vec<Vec<u8>>> {
        std::thread::spawn(move || {
            let mut frames = Vec::new();
            for size in frame_sizes {
                let mut buf = vec![0u8; size];
                recv_exact(&peer, &mut buf).expect("peer recv");
                peer.send(&encode_ack()).expect("peer ack");
                frames.push(buf);
            }
            frames
        })
    }

    #[test]
    fn test_call_without_payload_sends_one_acked_header() {
        let (local, peer) = MemoryChannel::pair();
        let server = serve_acks(peer, vec![HEADER_SIZE]);
        let transport = RpcTransport::new(Arc::new(local));

        transport.call(PacketType::HideMouse, None).expect("call");

        let frames = server.join().expect("join");
        assert_eq!(decode_header(&frames[0]), Ok(PacketType::HideMouse));
    }

    #[test]
    fn test_call_with_payload_sends_header_then_payload() {
        let (local, peer) = MemoryChannel::pair();
        let server = serve_acks(peer, vec![HEADER_SIZE, MOUSE_POSITION_PAYLOAD_SIZE]);
        let transport = RpcTransport::new(Arc::new(local));

        let payload = [0u8; MOUSE_POSITION_PAYLOAD_SIZE];
        transport
            .call(PacketType::SetMousePosition, Some(&payload))
            .expect("call");

        let frames = server.join().expect("join");
        assert_eq!(decode_header(&frames[0]), Ok(PacketType::SetMousePosition));
        assert_eq!(frames[1], payload);
    }

    #[test]
    fn test_call_recovers_from_not_connected_and_delivers_once() {
        let (local, peer) = MemoryChannel::pair();
        local.script_send_failure(ScriptedFailure::NotConnected);
        let server = serve_acks(peer, vec![HEADER_SIZE]);
        let transport = RpcTransport::new(Arc::new(local));

        transport.call(PacketType::UnhideMouse, None).expect("call");

        // Exactly one header reached the peer despite the retry.
        let frames = server.join().expect("join");
        assert_eq!(frames.len(), 1);
        assert_eq!(decode_header(&frames[0]), Ok(PacketType::UnhideMouse));
    }

    #[test]
    fn test_call_recovers_from_broken_pipe() {
        let (local, peer) = MemoryChannel::pair();
        local.script_send_failure(ScriptedFailure::BrokenPipe);
        // Recovery closes and reconnects the channel, so the peer may see a
        // transient end-of-stream before the retried header arrives.
        let server = std::thread::spawn(move || {
            let mut buf = [0u8; HEADER_SIZE];
            let mut read = 0;
            while read < buf.len() {
                match peer.recv(&mut buf[read..]).expect("peer recv") {
                    0 => std::thread::sleep(Duration::from_millis(5)),
                    n => read += n,
                }
            }
            peer.send(&encode_ack()).expect("peer ack");
            buf
        });
        let transport = RpcTransport::new(Arc::new(local));

        transport.call(PacketType::HideMouse, None).expect("call");

        let frame = server.join().expect("join");
        assert_eq!(decode_header(&frame), Ok(PacketType::HideMouse));
    }

    #[test]
    fn test_call_exhausts_retry_budget() {
        let (local, _peer) = MemoryChannel::pair();
        for _ in 0..MAX_CALL_ATTEMPTS {
            local.script_send_failure(ScriptedFailure::NotConnected);
        }
        let transport = RpcTransport::new(Arc::new(local));

        let result = transport.call(PacketType::HideMouse, None);
        assert!(matches!(
            result,
            Err(TransportError::RetryExhausted { attempts: MAX_CALL_ATTEMPTS })
        ));
    }

    #[test]
    fn test_call_surfaces_not_connected_when_reconnect_fails() {
        let (local, _peer) = MemoryChannel::pair();
        local.script_send_failure(ScriptedFailure::NotConnected);
        local.fail_next_connects(1);
        let transport = RpcTransport::new(Arc::new(local));

        let result = transport.call(PacketType::HideMouse, None);
        assert!(matches!(
            result,
            Err(TransportError::Channel(ChannelError::NotConnected))
        ));
    }

    #[test]
    fn test_malformed_ack_surfaces_invalid_packet_without_retry() {
        let (local, peer) = MemoryChannel::pair();
        let server = std::thread::spawn(move || {
            let mut buf = [0u8; HEADER_SIZE];
            recv_exact(&peer, &mut buf).expect("peer recv");
            peer.send(&[0xDE, 0xAD, 0xBE, 0xEF]).expect("bad ack");
        });
        let transport = RpcTransport::new(Arc::new(local));

        let result = transport.call(PacketType::HideMouse, None);
        assert!(matches!(result, Err(TransportError::InvalidPacket(_))));
        server.join().expect("join");
    }

    #[test]
    fn test_forward_event_runs_the_two_ack_exchange() {
        let (local, peer) = MemoryChannel::pair();
        let server = serve_acks(peer, vec![HEADER_SIZE, EVENT_PAYLOAD_SIZE]);
        let transport = RpcTransport::new(Arc::new(local));

        let event = OsEvent::Key { pressed: true, scan_code: 30 };
        transport.forward_event(&event).expect("forward");

        let frames = server.join().expect("join");
        assert_eq!(decode_header(&frames[0]), Ok(PacketType::OsEventHeader));
        assert_eq!(frames[1], encode_event(&event));
    }

    #[test]
    fn test_forward_event_retries_only_the_unsent_header() {
        let (local, peer) = MemoryChannel::pair();
        local.script_send_failure(ScriptedFailure::NotConnected);
        let server = serve_acks(peer, vec![HEADER_SIZE, EVENT_PAYLOAD_SIZE]);
        let transport = RpcTransport::new(Arc::new(local));

        let event = OsEvent::Key { pressed: false, scan_code: 1 };
        transport.forward_event(&event).expect("forward");

        let frames = server.join().expect("join");
        assert_eq!(frames.len(), 2, "peer saw exactly one exchange");
    }

    #[test]
    fn test_heartbeat_does_not_retry() {
        let (local, _peer) = MemoryChannel::pair();
        local.script_send_failure(ScriptedFailure::NotConnected);
        let transport = RpcTransport::new(Arc::new(local));

        let result = transport.heartbeat();
        assert!(matches!(
            result,
            Err(TransportError::Channel(ChannelError::NotConnected))
        ));
    }

    #[test]
    fn test_heartbeat_sends_heartbeat_header() {
        let (local, peer) = MemoryChannel::pair();
        let server = serve_acks(peer, vec![HEADER_SIZE]);
        let transport = RpcTransport::new(Arc::new(local));

        transport.heartbeat().expect("heartbeat");

        let frames = server.join().expect("join");
        assert_eq!(decode_header(&frames[0]), Ok(PacketType::Heartbeat));
    }
}
