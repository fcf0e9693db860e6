//! CrossDesk node daemon entry point.
//!
//! Wires together the infrastructure services and blocks until shutdown.
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML config, defaults on first run
//!  └─ InjectionWorker        -- queue + thread feeding the injector
//!  └─ Entity::new_local()    -- listener thread on the RPC port
//!  └─ Entity::new_remote()   -- one heartbeat thread per [[peers]] entry
//! ```

use std::sync::{Arc, RwLock};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crossdesk_node::infrastructure::channel::tcp::{TcpChannel, TcpServerChannel};
use crossdesk_node::infrastructure::channel::{Channel, ServerChannel};
use crossdesk_node::infrastructure::injector::{InjectionWorker, InputInjector, LoggingInjector};
use crossdesk_node::infrastructure::storage::config::{
    config_file_path, load_config, topology_from_config, TomlOffsetStore,
};
use crossdesk_node::{Entity, EntityDelegate};

/// Logs connection losses. A richer build would surface these to a UI or
/// trigger reconnection policy; the daemon just records them.
struct NodeDelegate;

impl EntityDelegate for NodeDelegate {
    fn on_server_lost(&self) {
        warn!("inbound connection lost; listener is accepting again");
    }

    fn on_entity_lost(&self, entity_id: &str) {
        warn!(entity = %entity_id, "peer lost");
    }
}

fn main() -> anyhow::Result<()> {
    let config_path = config_file_path()?;
    let config = load_config(&config_path)?;

    // Structured logging. `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.node.log_level.clone())),
        )
        .init();

    info!(id = %config.node.id, "CrossDesk node starting");

    let topology = Arc::new(RwLock::new(topology_from_config(&config)));
    let delegate: Arc<dyn EntityDelegate> = Arc::new(NodeDelegate);
    let injector: Arc<dyn InputInjector> = Arc::new(LoggingInjector);
    let worker = InjectionWorker::spawn(Arc::clone(&injector))?;
    let store = TomlOffsetStore::new(config_path.clone());

    // ── Local entity ──────────────────────────────────────────────────────────
    let local_idx = topology
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .add_entity(config.node.id.clone());
    let bind_addr = format!("{}:{}", config.network.bind_address, config.network.rpc_port);
    let server: Arc<dyn ServerChannel> = Arc::new(TcpServerChannel::new(bind_addr.clone()));
    let local = Entity::new_local(
        config.node.id.clone(),
        server,
        Arc::clone(&topology),
        local_idx,
        Arc::clone(&injector),
        worker.handle(),
        Arc::downgrade(&delegate),
    )?;
    local.load_offsets(&store)?;
    info!(addr = %bind_addr, "local entity listening");

    // ── Remote entities ───────────────────────────────────────────────────────
    let mut remotes = Vec::with_capacity(config.peers.len());
    for peer in &config.peers {
        let idx = topology
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add_entity(peer.id.clone());
        let addr = format!("{}:{}", peer.host, peer.port);
        let channel: Arc<dyn Channel> = Arc::new(TcpChannel::new(addr.clone()));
        let entity = Entity::new_remote(
            peer.id.clone(),
            channel,
            Arc::clone(&topology),
            idx,
            Arc::downgrade(&delegate),
        )?;
        entity.load_offsets(&store)?;
        info!(entity = %peer.id, addr = %addr, "remote entity created");
        remotes.push(entity);
    }

    topology
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .rebuild_links();

    info!("CrossDesk node ready. Close stdin (Ctrl-D) to exit.");

    // Headless daemon: block until stdin reaches EOF.
    let mut sink = String::new();
    loop {
        sink.clear();
        if std::io::stdin().read_line(&mut sink)? == 0 {
            break;
        }
    }

    info!("shutting down");
    for entity in &remotes {
        entity.shutdown();
    }
    local.shutdown();
    drop(worker);

    info!("CrossDesk node stopped");
    Ok(())
}
