//! The channel capability: byte-stream connections between entities.
//!
//! The transport and lifecycle layers never touch sockets directly; they
//! speak to these traits. `channel::tcp` provides the production TCP
//! implementation, `channel::memory` an in-process duplex pair for tests.
//!
//! Contract every implementation must honor: `close()` promptly unblocks a
//! concurrent blocking `recv` (or `accept`, for servers). The lifecycle
//! layer relies on that to join its threads during shutdown.

pub mod memory;
pub mod tcp;

use thiserror::Error;

/// Errors a channel operation can produce. The transport layer keys its
/// retry policy off these variants, so implementations must classify I/O
/// failures consistently.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel has no live connection. Retryable after a reconnect.
    #[error("channel not connected")]
    NotConnected,

    /// The peer tore the connection down mid-exchange. The channel must be
    /// closed and reconnected before retrying.
    #[error("broken pipe")]
    BrokenPipe,

    /// The channel was closed locally; no reconnect will revive it.
    #[error("channel closed")]
    Closed,

    /// Any other I/O failure. Not retryable.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maps an OS error to the channel taxonomy.
pub(crate) fn classify_io_error(e: std::io::Error) -> ChannelError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::NotConnected => ChannelError::NotConnected,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            ChannelError::BrokenPipe
        }
        _ => ChannelError::Io(e),
    }
}

/// A connected (or connectable) duplex byte stream to one peer.
pub trait Channel: Send + Sync {
    /// Establishes the connection to the peer. Idempotent when already
    /// connected.
    fn connect(&self) -> Result<(), ChannelError>;

    /// Sends all of `bytes`.
    fn send(&self, bytes: &[u8]) -> Result<(), ChannelError>;

    /// Receives up to `buf.len()` bytes, blocking until at least one byte
    /// is available. Returns the number of bytes read; `Ok(0)` only at
    /// end-of-stream.
    fn recv(&self, buf: &mut [u8]) -> Result<usize, ChannelError>;

    /// Tears the connection down and unblocks any pending `recv`.
    fn close(&self);

    fn is_connected(&self) -> bool;

    /// Peer address for log messages.
    fn peer_addr(&self) -> String;
}

/// The listening side: yields one [`Channel`] per accepted connection.
pub trait ServerChannel: Send + Sync {
    fn bind(&self) -> Result<(), ChannelError>;

    fn listen(&self) -> Result<(), ChannelError>;

    /// Blocks until a peer connects. After `close()`, returns
    /// [`ChannelError::Closed`].
    fn accept(&self) -> Result<Box<dyn Channel>, ChannelError>;

    /// Stops listening and unblocks a pending `accept`.
    fn close(&self);

    /// Local address for log messages.
    fn local_addr(&self) -> String;
}

/// Fills `buf` completely from `channel`, treating end-of-stream as
/// [`ChannelError::Closed`]. Frames in this protocol are tiny and
/// fixed-size, so every read site wants exactly-n semantics.
pub(crate) fn recv_exact(channel: &dyn Channel, buf: &mut [u8]) -> Result<(), ChannelError> {
    let mut read = 0;
    while read < buf.len() {
        match channel.recv(&mut buf[read..])? {
            0 => return Err(ChannelError::Closed),
            n => read += n,
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
