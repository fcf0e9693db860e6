//! TOML-based configuration persistence for the node daemon.
//!
//! Reads and writes `NodeConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\CrossDesk\config.toml`
//! - Linux:    `~/.config/crossdesk/config.toml`
//! - macOS:    `~/Library/Application Support/CrossDesk/config.toml`
//!
//! Fields annotated with `#[serde(default = "...")]` fall back to their
//! defaults when absent, so the daemon works on first run and across
//! config-schema additions.
//!
//! Per-entity display offsets live in the `[entities.offsets]` table keyed
//! by entity id; the [`OffsetStore`] capability exposes them to the entity
//! layer without tying it to the file format.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crossdesk_core::{Point, EntityTopology};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level node configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub layout: LayoutSection,
    /// Known peers this node should hold remote entities for.
    #[serde(default)]
    pub peers: Vec<PeerEntry>,
    #[serde(default)]
    pub entities: EntitiesSection,
}

/// Identity and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSection {
    /// Stable identifier for this machine's local entity.
    #[serde(default = "default_node_id")]
    pub id: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Listening socket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    /// TCP port the local entity listens on for peer RPCs.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,
    /// IP address to bind the listener to. `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Geometry settings for the shared desktop space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutSection {
    /// Width in pixels of the jump zones outside each entity's bounds.
    #[serde(default = "default_jump_buffer")]
    pub jump_buffer: i32,
}

/// A peer machine to hold a remote entity for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerEntry {
    /// The peer's entity id.
    pub id: String,
    /// Hostname or IP address.
    pub host: String,
    /// The peer's RPC port.
    #[serde(default = "default_rpc_port")]
    pub port: u16,
}

/// Persisted per-entity state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EntitiesSection {
    /// Display offsets in the shared desktop space, keyed by entity id.
    #[serde(default)]
    pub offsets: BTreeMap<String, OffsetEntry>,
}

/// One persisted offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetEntry {
    pub x: i32,
    pub y: i32,
}

impl From<Point> for OffsetEntry {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<OffsetEntry> for Point {
    fn from(e: OffsetEntry) -> Self {
        Point::new(e.x, e.y)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_node_id() -> String {
    "local".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_rpc_port() -> u16 {
    1045
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_jump_buffer() -> i32 {
    crossdesk_core::domain::topology::DEFAULT_JUMP_BUFFER
}

impl Default for NodeSection {
    fn default() -> Self {
        Self { id: default_node_id(), log_level: default_log_level() }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self { rpc_port: default_rpc_port(), bind_address: default_bind_address() }
    }
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self { jump_buffer: default_jump_buffer() }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `NodeConfig` from `path`, returning `NodeConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &PathBuf) -> Result<NodeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: NodeConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NodeConfig::default()),
        Err(e) => Err(ConfigError::Io { path: path.clone(), source: e }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &PathBuf, config: &NodeConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Applies the jump-buffer setting to a fresh topology.
pub fn topology_from_config(config: &NodeConfig) -> EntityTopology {
    EntityTopology::with_jump_buffer(config.layout.jump_buffer)
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("CrossDesk"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("crossdesk"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("CrossDesk")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Offset store ──────────────────────────────────────────────────────────────

/// Persisted display-offset access, decoupled from the config file format.
pub trait OffsetStore: Send + Sync {
    /// The persisted offset for `entity_id`, if any.
    fn get(&self, entity_id: &str) -> Option<Point>;

    /// Persists `offset` for `entity_id`.
    fn set(&self, entity_id: &str, offset: Point) -> Result<(), ConfigError>;
}

/// Offset store backed by the TOML config file. Each `set` rewrites the
/// file, preserving the other sections.
pub struct TomlOffsetStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TomlOffsetStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }
}

impl OffsetStore for TomlOffsetStore {
    fn get(&self, entity_id: &str) -> Option<Point> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let config = load_config(&self.path).ok()?;
        config.entities.offsets.get(entity_id).copied().map(Point::from)
    }

    fn set(&self, entity_id: &str, offset: Point) -> Result<(), ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = load_config(&self.path)?;
        config
            .entities
            .offsets
            .insert(entity_id.to_string(), offset.into());
        save_config(&self.path, &config)
    }
}

/// In-memory offset store for tests.
#[derive(Default)]
pub struct MemoryOffsetStore {
    offsets: Mutex<BTreeMap<String, Point>>,
}

impl MemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OffsetStore for MemoryOffsetStore {
    fn get(&self, entity_id: &str) -> Option<Point> {
        self.offsets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(entity_id)
            .copied()
    }

    fn set(&self, entity_id: &str, offset: Point) -> Result<(), ConfigError> {
        self.offsets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(entity_id.to_string(), offset);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("crossdesk_test_{tag}_{nanos}/config.toml"))
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_default_config_has_expected_port_and_buffer() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.network.rpc_port, 1045);
        assert_eq!(cfg.layout.jump_buffer, 20);
        assert_eq!(cfg.node.log_level, "info");
        assert!(cfg.peers.is_empty());
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: NodeConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, NodeConfig::default());
    }

    #[test]
    fn test_deserialize_partial_network_overrides_defaults() {
        let toml_str = r#"
[network]
rpc_port = 9999
"#;
        let cfg: NodeConfig = toml::from_str(toml_str).expect("deserialize partial");
        assert_eq!(cfg.network.rpc_port, 9999);
        assert_eq!(cfg.network.bind_address, "0.0.0.0");
    }

    // ── Round-trip ────────────────────────────────────────────────────────────

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = NodeConfig::default();
        cfg.node.id = "workstation".to_string();
        cfg.peers.push(PeerEntry {
            id: "laptop".to_string(),
            host: "192.168.1.40".to_string(),
            port: 1045,
        });
        cfg.entities
            .offsets
            .insert("laptop".to_string(), OffsetEntry { x: 1920, y: 0 });

        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: NodeConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/crossdesk/config.toml");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg, NodeConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip_via_temp_dir() {
        let path = temp_config_path("roundtrip");
        let mut cfg = NodeConfig::default();
        cfg.network.rpc_port = 2090;

        save_config(&path, &cfg).expect("save");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded.network.rpc_port, 2090);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_topology_from_config_applies_jump_buffer() {
        let toml_str = r#"
[layout]
jump_buffer = 35
"#;
        let cfg: NodeConfig = toml::from_str(toml_str).expect("deserialize");
        assert_eq!(cfg.layout.jump_buffer, 35);
        // The topology itself is opaque; building it must not panic.
        let _ = topology_from_config(&cfg);
    }

    // ── Offset stores ─────────────────────────────────────────────────────────

    #[test]
    fn test_memory_offset_store_round_trips() {
        let store = MemoryOffsetStore::new();
        assert_eq!(store.get("laptop"), None);
        store.set("laptop", Point::new(1920, 0)).expect("set");
        assert_eq!(store.get("laptop"), Some(Point::new(1920, 0)));
    }

    #[test]
    fn test_toml_offset_store_persists_across_instances() {
        let path = temp_config_path("offsets");
        {
            let store = TomlOffsetStore::new(path.clone());
            store.set("laptop", Point::new(-500, 300)).expect("set");
        }
        let store = TomlOffsetStore::new(path.clone());
        assert_eq!(store.get("laptop"), Some(Point::new(-500, 300)));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_toml_offset_store_preserves_other_sections() {
        let path = temp_config_path("preserve");
        let mut cfg = NodeConfig::default();
        cfg.node.id = "keeper".to_string();
        save_config(&path, &cfg).expect("save");

        let store = TomlOffsetStore::new(path.clone());
        store.set("laptop", Point::new(10, 10)).expect("set");

        let reloaded = load_config(&path).expect("load");
        assert_eq!(reloaded.node.id, "keeper");
        assert_eq!(
            reloaded.entities.offsets.get("laptop"),
            Some(&OffsetEntry { x: 10, y: 10 })
        );

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
