//! Entity thread lifecycle: the listener loop, the heartbeat loop, and the
//! runtime handle that owns them.
//!
//! Each entity owns exactly one background thread. A local entity runs
//! [`run_listener`]; a remote entity runs [`run_heartbeat`]. Both loops
//! cooperate with shutdown through a shared running flag, and both rely on
//! the channel contract that `close()` unblocks a pending read, so joining
//! never waits on a timeout.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossdesk_core::protocol::events::{decode_event, EVENT_PAYLOAD_SIZE};
use crossdesk_core::protocol::packets::{
    decode_header, decode_mouse_position, encode_ack, HEADER_SIZE, MOUSE_POSITION_PAYLOAD_SIZE,
};
use crossdesk_core::PacketType;
use tracing::{debug, info, trace, warn};

use crate::delegate::EntityDelegate;
use crate::infrastructure::channel::{recv_exact, Channel, ChannelError, ServerChannel};
use crate::transport::RpcTransport;

/// Cadence of heartbeat probes, measured from the start of each iteration.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Granularity of the shutdown-flag checks while waiting out the interval.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Where an entity is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

/// Inbound RPC dispatch seam. The local entity implements this; the
/// listener loop calls it after each fully-acked frame.
pub trait RpcHandler: Send + Sync {
    fn handle_set_mouse_position(&self, x_percent: f32, y_percent: f32);
    fn handle_hide_mouse(&self);
    fn handle_unhide_mouse(&self);
    fn handle_os_event(&self, event: crossdesk_core::OsEvent);
}

/// Owns an entity's background thread and its running flag.
///
/// `shutdown` clears the flag, closes the entity's channels (unblocking any
/// pending read), and joins the thread; the state reaches `Stopped` only
/// after the join completes. Safe to call more than once.
pub struct EntityRuntime {
    running: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    thread: Mutex<Option<JoinHandle<()>>>,
    close_channels: Box<dyn Fn() + Send + Sync>,
}

impl EntityRuntime {
    /// Spawns the entity thread. `body` receives the running flag;
    /// `close_channels` is invoked during shutdown to unblock it.
    pub fn spawn(
        thread_name: &str,
        body: impl FnOnce(Arc<AtomicBool>) + Send + 'static,
        close_channels: impl Fn() + Send + Sync + 'static,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(AtomicU8::new(LifecycleState::Running as u8));

        let thread = {
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name(thread_name.to_string())
                .spawn(move || body(running))?
        };

        Ok(Self {
            running,
            state,
            thread: Mutex::new(Some(thread)),
            close_channels: Box::new(close_channels),
        })
    }

    pub fn state(&self) -> LifecycleState {
        match self.state.load(Ordering::SeqCst) {
            0 => LifecycleState::Created,
            1 => LifecycleState::Running,
            2 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the thread and waits for it to exit.
    pub fn shutdown(&self) {
        let handle = {
            let mut guard = self.thread.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        let Some(handle) = handle else {
            return; // already shut down
        };

        self.state
            .store(LifecycleState::Stopping as u8, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        (self.close_channels)();

        if handle.join().is_err() {
            warn!("entity thread panicked before join");
        }
        self.state
            .store(LifecycleState::Stopped as u8, Ordering::SeqCst);
    }
}

impl Drop for EntityRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Listener loop ─────────────────────────────────────────────────────────────

/// Shared slot holding the connection currently being served, so shutdown
/// can close it and unblock the listener's pending read.
pub type ActiveConnection = Arc<Mutex<Option<Arc<dyn Channel>>>>;

/// The local entity's accept-and-dispatch loop.
///
/// Binds and listens once, then accepts one connection at a time. Each
/// frame is validated (exact size, magic, known type), acked, and
/// dispatched to `handler`. Any read error or invalid frame drops the
/// connection; the loop notifies `on_server_lost` (only while still
/// running) and goes back to accepting.
pub fn run_listener(
    server: Arc<dyn ServerChannel>,
    handler: Arc<dyn RpcHandler>,
    delegate: Weak<dyn EntityDelegate>,
    running: Arc<AtomicBool>,
    active: ActiveConnection,
) {
    if let Err(e) = server.bind() {
        warn!(addr = %server.local_addr(), "listener bind failed: {e}");
        return;
    }
    if let Err(e) = server.listen() {
        warn!(addr = %server.local_addr(), "listener listen failed: {e}");
        return;
    }
    info!(addr = %server.local_addr(), "listener started");

    while running.load(Ordering::SeqCst) {
        let conn = match server.accept() {
            Ok(conn) => conn,
            Err(ChannelError::Closed) => break,
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    warn!("accept failed: {e}");
                }
                continue;
            }
        };
        debug!(peer = %conn.peer_addr(), "serving connection");

        let conn: Arc<dyn Channel> = Arc::from(conn);
        *active.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&conn));

        serve_connection(&*conn, &*handler, &running);

        active.lock().unwrap_or_else(|e| e.into_inner()).take();
        conn.close();

        if running.load(Ordering::SeqCst) {
            if let Some(delegate) = delegate.upgrade() {
                delegate.on_server_lost();
            }
        }
    }

    info!(addr = %server.local_addr(), "listener stopped");
}

/// Reads, validates, acks, and dispatches frames until the connection dies
/// or shutdown begins.
fn serve_connection(conn: &dyn Channel, handler: &dyn RpcHandler, running: &AtomicBool) {
    let mut header_buf = [0u8; HEADER_SIZE];

    while running.load(Ordering::SeqCst) {
        if let Err(e) = recv_exact(conn, &mut header_buf) {
            debug!("connection read ended: {e}");
            return;
        }
        let packet_type = match decode_header(&header_buf) {
            Ok(t) => t,
            Err(e) => {
                warn!(peer = %conn.peer_addr(), "invalid header, dropping connection: {e}");
                return;
            }
        };
        if conn.send(&encode_ack()).is_err() {
            return;
        }

        match packet_type {
            PacketType::SetMousePosition => {
                let mut payload = [0u8; MOUSE_POSITION_PAYLOAD_SIZE];
                if recv_exact(conn, &mut payload).is_err() {
                    return;
                }
                let pos = match decode_mouse_position(&payload) {
                    Ok(pos) => pos,
                    Err(e) => {
                        warn!("invalid mouse position payload: {e}");
                        return;
                    }
                };
                if conn.send(&encode_ack()).is_err() {
                    return;
                }
                handler.handle_set_mouse_position(pos.x_percent, pos.y_percent);
            }
            PacketType::HideMouse => handler.handle_hide_mouse(),
            PacketType::UnhideMouse => handler.handle_unhide_mouse(),
            PacketType::Heartbeat => trace!("heartbeat"),
            PacketType::OsEventHeader => {
                let mut payload = [0u8; EVENT_PAYLOAD_SIZE];
                if recv_exact(conn, &mut payload).is_err() {
                    return;
                }
                let event = match decode_event(&payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("invalid event payload: {e}");
                        return;
                    }
                };
                if conn.send(&encode_ack()).is_err() {
                    return;
                }
                handler.handle_os_event(event);
            }
        }
    }
}

// ── Heartbeat loop ────────────────────────────────────────────────────────────

/// The remote entity's liveness loop.
///
/// Connects once if needed; a failed initial connect reports the peer lost
/// and stops. Afterwards one heartbeat is sent every
/// [`HEARTBEAT_INTERVAL`], measured from the start of each iteration. The
/// first failed probe reports `on_entity_lost` exactly once and ends the
/// loop; shutdown-induced failures are not reported.
pub fn run_heartbeat(
    transport: Arc<RpcTransport>,
    delegate: Weak<dyn EntityDelegate>,
    entity_id: String,
    running: Arc<AtomicBool>,
    interval: Duration,
) {
    let notify_lost = |reason: &str| {
        warn!(entity = %entity_id, "peer lost: {reason}");
        if let Some(delegate) = delegate.upgrade() {
            delegate.on_entity_lost(&entity_id);
        }
    };

    if !transport.channel().is_connected() {
        if let Err(e) = transport.connect() {
            notify_lost(&format!("initial connect failed: {e}"));
            return;
        }
    }
    info!(entity = %entity_id, "heartbeat started");

    while running.load(Ordering::SeqCst) {
        let next_beat = Instant::now() + interval;

        if let Err(e) = transport.heartbeat() {
            if running.load(Ordering::SeqCst) {
                notify_lost(&format!("heartbeat failed: {e}"));
            }
            return;
        }
        trace!(entity = %entity_id, "heartbeat acked");

        // Wait out the rest of the interval, staying responsive to shutdown.
        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= next_beat {
                break;
            }
            std::thread::sleep(SHUTDOWN_POLL.min(next_beat - now));
        }
    }

    info!(entity = %entity_id, "heartbeat stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
