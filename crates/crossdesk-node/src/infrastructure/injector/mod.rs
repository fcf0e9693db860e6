//! Input injection: the backend trait and the worker thread that feeds it.
//!
//! Inbound RPC dispatch runs on the listener thread, and injecting input
//! can block (or re-enter the windowing system) for milliseconds. The
//! [`InjectionWorker`] decouples the two: dispatch enqueues a command and
//! returns; a dedicated thread drains the queue against the backend.
//! Failures are logged and counted rather than propagated back to the
//! wire: by the time injection fails, the RPC has already been acked.

pub mod mock;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use crossdesk_core::OsEvent;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors an injection backend can produce.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The OS-level injection call failed.
    #[error("injection backend failure: {0}")]
    Backend(String),

    /// The worker thread is gone; the command was not enqueued.
    #[error("injection queue closed")]
    QueueClosed,
}

/// An input injection backend. Real implementations wrap the platform's
/// input synthesis APIs; [`mock::MockInjector`] records calls for tests.
///
/// Callers must not invoke these from a thread holding a transport lock:
/// backends are allowed to block.
pub trait InputInjector: Send + Sync {
    /// Warps the cursor to an absolute desktop position.
    fn set_cursor_position(&self, x: i32, y: i32) -> Result<(), InjectionError>;

    /// Hides or reveals the cursor.
    fn set_cursor_hidden(&self, hidden: bool) -> Result<(), InjectionError>;

    /// Synthesizes one input event.
    fn inject_event(&self, event: &OsEvent) -> Result<(), InjectionError>;
}

/// A backend that only logs, used when no platform backend is wired in.
pub struct LoggingInjector;

impl InputInjector for LoggingInjector {
    fn set_cursor_position(&self, x: i32, y: i32) -> Result<(), InjectionError> {
        debug!(x, y, "cursor warp");
        Ok(())
    }

    fn set_cursor_hidden(&self, hidden: bool) -> Result<(), InjectionError> {
        debug!(hidden, "cursor visibility");
        Ok(())
    }

    fn inject_event(&self, event: &OsEvent) -> Result<(), InjectionError> {
        debug!(?event, "inject event");
        Ok(())
    }
}

enum InjectorCommand {
    Warp { x: i32, y: i32 },
    Inject(OsEvent),
    Stop,
}

/// Cloneable producer handle for the worker queue.
#[derive(Clone)]
pub struct InjectorHandle {
    tx: mpsc::Sender<InjectorCommand>,
}

impl InjectorHandle {
    /// Enqueues a cursor warp.
    pub fn warp(&self, x: i32, y: i32) -> Result<(), InjectionError> {
        self.tx
            .send(InjectorCommand::Warp { x, y })
            .map_err(|_| InjectionError::QueueClosed)
    }

    /// Enqueues an event injection.
    pub fn inject(&self, event: OsEvent) -> Result<(), InjectionError> {
        self.tx
            .send(InjectorCommand::Inject(event))
            .map_err(|_| InjectionError::QueueClosed)
    }
}

/// Owns the worker thread draining injection commands.
///
/// Dropping the worker sends a stop command and joins the thread; commands
/// still queued ahead of the stop are drained first, and handles that
/// outlive the worker get [`InjectionError::QueueClosed`] on use.
pub struct InjectionWorker {
    handle: InjectorHandle,
    thread: Option<JoinHandle<()>>,
    failures: Arc<AtomicU64>,
}

impl InjectionWorker {
    /// Spawns the worker against `injector`.
    pub fn spawn(injector: Arc<dyn InputInjector>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<InjectorCommand>();
        let failures = Arc::new(AtomicU64::new(0));

        let thread = {
            let failures = Arc::clone(&failures);
            std::thread::Builder::new()
                .name("injection-worker".to_string())
                .spawn(move || {
                    while let Ok(command) = rx.recv() {
                        let result = match command {
                            InjectorCommand::Warp { x, y } => injector.set_cursor_position(x, y),
                            InjectorCommand::Inject(event) => injector.inject_event(&event),
                            InjectorCommand::Stop => break,
                        };
                        if let Err(e) = result {
                            failures.fetch_add(1, Ordering::Relaxed);
                            warn!("injection failed: {e}");
                        }
                    }
                    debug!("injection worker stopped");
                })?
        };

        Ok(Self { handle: InjectorHandle { tx }, thread: Some(thread), failures })
    }

    /// A cloneable handle for enqueueing commands.
    pub fn handle(&self) -> InjectorHandle {
        self.handle.clone()
    }

    /// Number of commands whose injection failed since spawn.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Drop for InjectionWorker {
    fn drop(&mut self) {
        self.handle.tx.send(InjectorCommand::Stop).ok();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("injection worker panicked");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
