//! The entity façade: one per machine in the virtual desktop.
//!
//! The **local** entity owns this machine's listening channel and turns
//! inbound RPCs into injected input. A **remote** entity owns a client
//! channel to one peer and turns outbound operations into acked RPC
//! exchanges, with a heartbeat thread probing liveness. The role is fixed
//! at construction and decides which side of each operation runs.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock, Weak};

use crossdesk_core::protocol::packets::{encode_mouse_position, MousePositionPayload};
use crossdesk_core::{Display, EntityIdx, EntityTopology, OsEvent, PacketType, Point, TopologyError};
use thiserror::Error;
use tracing::warn;

use crate::delegate::EntityDelegate;
use crate::infrastructure::channel::{Channel, ServerChannel};
use crate::infrastructure::injector::{InjectionError, InjectorHandle, InputInjector};
use crate::infrastructure::storage::config::{ConfigError, OffsetStore};
use crate::lifecycle::{
    run_heartbeat, run_listener, ActiveConnection, EntityRuntime, LifecycleState, RpcHandler,
    HEARTBEAT_INTERVAL,
};
use crate::transport::{RpcTransport, TransportError};

/// Which side of the protocol this entity plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRole {
    /// Hosts this machine's displays and the listening channel.
    Local,
    /// Proxy for a peer machine; owns the outbound channel.
    Remote,
}

/// Errors surfaced by entity operations.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("injection: {0}")]
    Injection(#[from] InjectionError),

    #[error("topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("storage: {0}")]
    Storage(#[from] ConfigError),

    /// The entity has no displays registered, so a percentage position
    /// has nothing to map onto.
    #[error("entity has no displays")]
    NoDisplays,
}

/// A machine participating in the shared desktop.
pub struct Entity {
    id: String,
    role: EntityRole,
    topology: Arc<RwLock<EntityTopology>>,
    idx: EntityIdx,
    /// Present on remote entities only.
    transport: Option<Arc<RpcTransport>>,
    /// Present on local entities only: direct effects (cursor visibility).
    injector: Option<Arc<dyn InputInjector>>,
    /// Present on local entities only: queued effects (warps, events).
    worker: Option<InjectorHandle>,
    runtime: Mutex<Option<EntityRuntime>>,
}

impl Entity {
    /// Creates the local entity and spawns its listener thread.
    pub fn new_local(
        id: impl Into<String>,
        server: Arc<dyn ServerChannel>,
        topology: Arc<RwLock<EntityTopology>>,
        idx: EntityIdx,
        injector: Arc<dyn InputInjector>,
        worker: InjectorHandle,
        delegate: Weak<dyn EntityDelegate>,
    ) -> std::io::Result<Arc<Self>> {
        let id = id.into();
        let entity = Arc::new(Self {
            id: id.clone(),
            role: EntityRole::Local,
            topology,
            idx,
            transport: None,
            injector: Some(injector),
            worker: Some(worker),
            runtime: Mutex::new(None),
        });

        let runtime = {
            let server_for_loop = Arc::clone(&server);
            let handler: Arc<dyn RpcHandler> = Arc::clone(&entity) as Arc<dyn RpcHandler>;
            let active: ActiveConnection = Arc::new(Mutex::new(None));
            let active_for_loop = Arc::clone(&active);
            EntityRuntime::spawn(
                &format!("listener-{id}"),
                move |running: Arc<AtomicBool>| {
                    run_listener(server_for_loop, handler, delegate, running, active_for_loop);
                },
                move || {
                    server.close();
                    // Unblock a read on the connection being served.
                    if let Some(conn) = active.lock().unwrap_or_else(|e| e.into_inner()).take() {
                        conn.close();
                    }
                },
            )?
        };
        *entity.runtime.lock().unwrap_or_else(|e| e.into_inner()) = Some(runtime);
        Ok(entity)
    }

    /// Creates a remote entity and spawns its heartbeat thread.
    pub fn new_remote(
        id: impl Into<String>,
        channel: Arc<dyn Channel>,
        topology: Arc<RwLock<EntityTopology>>,
        idx: EntityIdx,
        delegate: Weak<dyn EntityDelegate>,
    ) -> std::io::Result<Arc<Self>> {
        let id = id.into();
        let transport = Arc::new(RpcTransport::new(Arc::clone(&channel)));
        let entity = Arc::new(Self {
            id: id.clone(),
            role: EntityRole::Remote,
            topology,
            idx,
            transport: Some(Arc::clone(&transport)),
            injector: None,
            worker: None,
            runtime: Mutex::new(None),
        });

        let runtime = EntityRuntime::spawn(
            &format!("heartbeat-{id}"),
            move |running: Arc<AtomicBool>| {
                run_heartbeat(transport, delegate, id, running, HEARTBEAT_INTERVAL);
            },
            move || channel.close(),
        )?;
        *entity.runtime.lock().unwrap_or_else(|e| e.into_inner()) = Some(runtime);
        Ok(entity)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> EntityRole {
        self.role
    }

    pub fn idx(&self) -> EntityIdx {
        self.idx
    }

    pub fn state(&self) -> LifecycleState {
        self.runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(EntityRuntime::state)
            .unwrap_or(LifecycleState::Created)
    }

    /// Stops the entity's background thread and closes its channels.
    pub fn shutdown(&self) {
        if let Some(runtime) = self
            .runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            runtime.shutdown();
        }
    }

    // ── RPC operations ────────────────────────────────────────────────────────

    /// Moves the cursor to a percentage position within the entity's total
    /// bounds. Remote: sends the RPC. Local: maps the percentages over the
    /// bounds and hands the warp to the injection worker.
    pub fn set_mouse_position(&self, x_percent: f32, y_percent: f32) -> Result<(), EntityError> {
        match self.role {
            EntityRole::Remote => {
                let payload = encode_mouse_position(&MousePositionPayload { x_percent, y_percent });
                self.transport()?
                    .call(PacketType::SetMousePosition, Some(&payload))?;
                Ok(())
            }
            EntityRole::Local => {
                let (x, y) = self.percent_to_desktop(x_percent, y_percent)?;
                self.worker()?.warp(x, y)?;
                Ok(())
            }
        }
    }

    pub fn hide_mouse(&self) -> Result<(), EntityError> {
        self.set_mouse_hidden(true, PacketType::HideMouse)
    }

    pub fn unhide_mouse(&self) -> Result<(), EntityError> {
        self.set_mouse_hidden(false, PacketType::UnhideMouse)
    }

    /// Forwards an OS input event to the peer. Only valid on remote
    /// entities: input destined for this machine is injected, not
    /// forwarded, and pretending otherwise would silently drop events.
    pub fn forward_os_event(&self, event: &OsEvent) -> Result<(), EntityError> {
        match self.role {
            EntityRole::Remote => {
                self.transport()?.forward_event(event)?;
                Ok(())
            }
            EntityRole::Local => Err(EntityError::Transport(TransportError::InvalidOperation(
                "cannot forward an OS event to the local entity",
            ))),
        }
    }

    // ── Display management ────────────────────────────────────────────────────

    pub fn add_display(&self, display: Display) -> Result<(), EntityError> {
        self.topology
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add_display(self.idx, display)?;
        Ok(())
    }

    pub fn remove_display(&self, display_id: u32) -> Result<(), EntityError> {
        self.topology
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove_display(self.idx, display_id)?;
        Ok(())
    }

    pub fn point_intersects(&self, p: Point) -> Result<bool, EntityError> {
        Ok(self
            .topology
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .point_intersects_entity(self.idx, p)?)
    }

    // ── Persisted offsets ─────────────────────────────────────────────────────

    /// Applies the persisted offset for this entity, if one exists.
    pub fn load_offsets(&self, store: &dyn OffsetStore) -> Result<(), EntityError> {
        if let Some(offset) = store.get(&self.id) {
            self.topology
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .set_display_offsets(self.idx, offset)?;
        }
        Ok(())
    }

    /// Persists this entity's current offset.
    pub fn save_offsets(&self, store: &dyn OffsetStore) -> Result<(), EntityError> {
        let offset = self
            .topology
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .offset(self.idx)?;
        store.set(&self.id, offset)?;
        Ok(())
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn set_mouse_hidden(&self, hidden: bool, packet: PacketType) -> Result<(), EntityError> {
        match self.role {
            EntityRole::Remote => {
                self.transport()?.call(packet, None)?;
                Ok(())
            }
            EntityRole::Local => {
                self.injector()?.set_cursor_hidden(hidden)?;
                Ok(())
            }
        }
    }

    fn percent_to_desktop(&self, x_percent: f32, y_percent: f32) -> Result<(i32, i32), EntityError> {
        let bounds = self
            .topology
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .total_bounds(self.idx)?;
        // A display-less entity still has its inverted-bounds sentinel.
        if bounds.is_degenerate() {
            return Err(EntityError::NoDisplays);
        }
        let x = bounds.top_left.x + (bounds.width() as f32 * x_percent).round() as i32;
        let y = bounds.top_left.y + (bounds.height() as f32 * y_percent).round() as i32;
        Ok((x, y))
    }

    fn transport(&self) -> Result<&Arc<RpcTransport>, EntityError> {
        self.transport.as_ref().ok_or(EntityError::Transport(
            TransportError::InvalidOperation("RPC call on the local entity"),
        ))
    }

    fn injector(&self) -> Result<&Arc<dyn InputInjector>, EntityError> {
        self.injector.as_ref().ok_or(EntityError::Transport(
            TransportError::InvalidOperation("injection on a remote entity"),
        ))
    }

    fn worker(&self) -> Result<&InjectorHandle, EntityError> {
        self.worker.as_ref().ok_or(EntityError::Transport(
            TransportError::InvalidOperation("injection on a remote entity"),
        ))
    }
}

/// Inbound dispatch: the listener thread lands here after acking frames.
/// Effects either go through the injection worker (warps, events) or the
/// injector directly (visibility); failures are logged, not propagated;
/// the frame is already acked.
impl RpcHandler for Entity {
    fn handle_set_mouse_position(&self, x_percent: f32, y_percent: f32) {
        match self.percent_to_desktop(x_percent, y_percent) {
            Ok((x, y)) => {
                if let Ok(worker) = self.worker() {
                    if let Err(e) = worker.warp(x, y) {
                        warn!(entity = %self.id, "warp enqueue failed: {e}");
                    }
                }
            }
            Err(e) => warn!(entity = %self.id, "cannot map mouse position: {e}"),
        }
    }

    fn handle_hide_mouse(&self) {
        if let Ok(injector) = self.injector() {
            if let Err(e) = injector.set_cursor_hidden(true) {
                warn!(entity = %self.id, "hide cursor failed: {e}");
            }
        }
    }

    fn handle_unhide_mouse(&self) {
        if let Ok(injector) = self.injector() {
            if let Err(e) = injector.set_cursor_hidden(false) {
                warn!(entity = %self.id, "unhide cursor failed: {e}");
            }
        }
    }

    fn handle_os_event(&self, event: OsEvent) {
        if let Ok(worker) = self.worker() {
            if let Err(e) = worker.inject(event) {
                warn!(entity = %self.id, "event enqueue failed: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
