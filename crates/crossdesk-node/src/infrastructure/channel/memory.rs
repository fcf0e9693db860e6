//! In-process channel implementation used by unit and integration tests.
//!
//! [`MemoryChannel::pair`] returns two connected endpoints sharing a pair of
//! byte pipes, honoring the same blocking and close-unblocks-recv contract
//! as the TCP implementation. Failures can be scripted per endpoint to
//! exercise the transport's retry policy deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use super::{Channel, ChannelError, ServerChannel};

/// One direction of a duplex pair.
struct Pipe {
    state: Mutex<PipeState>,
    cond: Condvar,
}

struct PipeState {
    buf: VecDeque<u8>,
    closed: bool,
}

impl Pipe {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PipeState { buf: VecDeque::new(), closed: false }),
            cond: Condvar::new(),
        })
    }

    fn write(&self, bytes: &[u8]) -> Result<(), ChannelError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(ChannelError::BrokenPipe);
        }
        state.buf.extend(bytes);
        self.cond.notify_all();
        Ok(())
    }

    /// Blocks until data or close. Returns `Ok(0)` at end-of-stream,
    /// mirroring a TCP read on a shut-down socket.
    fn read(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while state.buf.is_empty() && !state.closed {
            state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        if state.buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(state.buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.buf.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = true;
        self.cond.notify_all();
    }

    fn reopen(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = false;
        state.buf.clear();
    }
}

/// A failure to inject into the next `send` call.
#[derive(Debug, Clone, Copy)]
pub enum ScriptedFailure {
    NotConnected,
    BrokenPipe,
}

/// One endpoint of an in-memory duplex pair.
pub struct MemoryChannel {
    name: String,
    tx: Arc<Pipe>,
    rx: Arc<Pipe>,
    connected: AtomicBool,
    /// Number of upcoming `connect` calls that should fail.
    failing_connects: AtomicUsize,
    /// Failures consumed one per `send`, front first.
    scripted_send_failures: Mutex<VecDeque<ScriptedFailure>>,
}

impl MemoryChannel {
    /// Creates two connected endpoints wired back to back.
    pub fn pair() -> (MemoryChannel, MemoryChannel) {
        let a_to_b = Pipe::new();
        let b_to_a = Pipe::new();
        let a = MemoryChannel {
            name: "mem-a".to_string(),
            tx: Arc::clone(&a_to_b),
            rx: Arc::clone(&b_to_a),
            connected: AtomicBool::new(true),
            failing_connects: AtomicUsize::new(0),
            scripted_send_failures: Mutex::new(VecDeque::new()),
        };
        let b = MemoryChannel {
            name: "mem-b".to_string(),
            tx: b_to_a,
            rx: a_to_b,
            connected: AtomicBool::new(true),
            failing_connects: AtomicUsize::new(0),
            scripted_send_failures: Mutex::new(VecDeque::new()),
        };
        (a, b)
    }

    /// Marks the endpoint as disconnected without touching the pipes, so
    /// the next `send` reports `NotConnected`.
    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Makes the next `n` calls to `connect` fail with `NotConnected`.
    pub fn fail_next_connects(&self, n: usize) {
        self.failing_connects.store(n, Ordering::SeqCst);
    }

    /// Queues a failure for an upcoming `send` call.
    pub fn script_send_failure(&self, failure: ScriptedFailure) {
        self.scripted_send_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(failure);
    }
}

impl Channel for MemoryChannel {
    fn connect(&self) -> Result<(), ChannelError> {
        let remaining = self.failing_connects.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_connects.store(remaining - 1, Ordering::SeqCst);
            return Err(ChannelError::NotConnected);
        }
        self.rx.reopen();
        self.tx.reopen();
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn send(&self, bytes: &[u8]) -> Result<(), ChannelError> {
        let scripted = self
            .scripted_send_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(failure) = scripted {
            return Err(match failure {
                ScriptedFailure::NotConnected => {
                    self.connected.store(false, Ordering::SeqCst);
                    ChannelError::NotConnected
                }
                ScriptedFailure::BrokenPipe => ChannelError::BrokenPipe,
            });
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }
        self.tx.write(bytes)
    }

    fn recv(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.rx.read(buf)
    }

    fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        // Mirrors a TCP `shutdown(Both)`: our pending recv unblocks and
        // the peer's next read sees end-of-stream.
        self.rx.close();
        self.tx.close();
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn peer_addr(&self) -> String {
        self.name.clone()
    }
}

/// A server channel whose accepted connections are pushed in by the test.
pub struct MemoryServerChannel {
    state: Mutex<ServerState>,
    cond: Condvar,
}

struct ServerState {
    queue: VecDeque<Box<dyn Channel>>,
    closed: bool,
}

impl Default for MemoryServerChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServerChannel {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState { queue: VecDeque::new(), closed: false }),
            cond: Condvar::new(),
        }
    }

    /// Queues a connection for the next `accept` call.
    pub fn push_connection(&self, channel: Box<dyn Channel>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.queue.push_back(channel);
        self.cond.notify_all();
    }
}

impl ServerChannel for MemoryServerChannel {
    fn bind(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn listen(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn accept(&self) -> Result<Box<dyn Channel>, ChannelError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if state.closed {
                return Err(ChannelError::Closed);
            }
            if let Some(channel) = state.queue.pop_front() {
                return Ok(channel);
            }
            state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = true;
        self.cond.notify_all();
    }

    fn local_addr(&self) -> String {
        "mem-server".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
