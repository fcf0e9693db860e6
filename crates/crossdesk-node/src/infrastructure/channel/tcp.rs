//! TCP implementation of the channel capability over `std::net`.
//!
//! All sockets are blocking; the lifecycle layer gives each one its own
//! thread. Shutdown never relies on timeouts: `TcpChannel::close` shuts the
//! stream down (which wakes a blocked read with end-of-stream), and
//! `TcpServerChannel::close` wakes a blocked `accept` with a self-connect
//! to the listener's own address, since std offers no way to shut a
//! listener down directly.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, trace};

use super::{classify_io_error, Channel, ChannelError, ServerChannel};

/// A client-side TCP connection to one peer entity.
pub struct TcpChannel {
    addr: String,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpChannel {
    /// Creates an unconnected channel that will dial `addr` on `connect`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), stream: Mutex::new(None) }
    }

    /// Wraps an already-accepted stream (the server side of a connection).
    pub fn from_stream(stream: TcpStream) -> Self {
        let addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        Self { addr, stream: Mutex::new(Some(stream)) }
    }

    /// Clones the underlying stream handle so I/O can proceed without
    /// holding the lock, keeping `close` responsive mid-read.
    fn handle(&self) -> Result<TcpStream, ChannelError> {
        let guard = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(stream) => stream.try_clone().map_err(classify_io_error),
            None => Err(ChannelError::NotConnected),
        }
    }
}

impl Channel for TcpChannel {
    fn connect(&self) -> Result<(), ChannelError> {
        let mut guard = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return Ok(());
        }
        let stream = TcpStream::connect(&self.addr).map_err(classify_io_error)?;
        stream.set_nodelay(true).ok();
        debug!(peer = %self.addr, "connected");
        *guard = Some(stream);
        Ok(())
    }

    fn send(&self, bytes: &[u8]) -> Result<(), ChannelError> {
        use std::io::Write;
        let mut stream = self.handle()?;
        stream.write_all(bytes).map_err(classify_io_error)
    }

    fn recv(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        use std::io::Read;
        let mut stream = self.handle()?;
        stream.read(buf).map_err(classify_io_error)
    }

    fn close(&self) {
        let mut guard = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(stream) = guard.take() {
            // Wakes any thread blocked in read with end-of-stream.
            stream.shutdown(Shutdown::Both).ok();
            trace!(peer = %self.addr, "channel closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.stream
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn peer_addr(&self) -> String {
        self.addr.clone()
    }
}

/// The listening side of the local entity.
pub struct TcpServerChannel {
    bind_addr: String,
    listener: Mutex<Option<TcpListener>>,
    closed: AtomicBool,
}

impl TcpServerChannel {
    /// Creates an unbound server for `bind_addr` (e.g. `"0.0.0.0:1045"`).
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            listener: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    fn listener_handle(&self) -> Result<TcpListener, ChannelError> {
        let guard = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(listener) => listener.try_clone().map_err(classify_io_error),
            None => Err(ChannelError::NotConnected),
        }
    }
}

impl ServerChannel for TcpServerChannel {
    fn bind(&self) -> Result<(), ChannelError> {
        let mut guard = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return Ok(());
        }
        let listener = TcpListener::bind(&self.bind_addr).map_err(classify_io_error)?;
        debug!(addr = %self.bind_addr, "bound");
        *guard = Some(listener);
        Ok(())
    }

    fn listen(&self) -> Result<(), ChannelError> {
        // std listens as part of bind; this just validates the state.
        if self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
        {
            return Err(ChannelError::NotConnected);
        }
        Ok(())
    }

    fn accept(&self) -> Result<Box<dyn Channel>, ChannelError> {
        let listener = self.listener_handle()?;
        if self.closed.load(Ordering::Relaxed) {
            return Err(ChannelError::Closed);
        }
        let (stream, peer) = listener.accept().map_err(classify_io_error)?;
        // The self-connect used by close() lands here; report Closed
        // instead of handing the wake-up connection to the caller.
        if self.closed.load(Ordering::Relaxed) {
            return Err(ChannelError::Closed);
        }
        stream.set_nodelay(true).ok();
        trace!(%peer, "accepted connection");
        Ok(Box::new(TcpChannel::from_stream(stream)))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        // A blocked accept only returns once a connection arrives; provide
        // one ourselves on the listener's own address. A listener bound to
        // the unspecified address is reachable over loopback.
        if let Ok(listener) = self.listener_handle() {
            if let Ok(mut addr) = listener.local_addr() {
                if addr.ip().is_unspecified() {
                    addr.set_ip(match addr.ip() {
                        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
                    });
                }
                TcpStream::connect(addr).ok();
            }
        }
    }

    fn local_addr(&self) -> String {
        self.bind_addr.clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
