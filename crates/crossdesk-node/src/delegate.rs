//! The callback seam between entities and the coordinating layer.

/// Notifications emitted from entity background threads.
///
/// Entities hold this as `Weak<dyn EntityDelegate>`: the coordinating layer
/// owns itself, and a delegate that has been dropped simply stops receiving
/// notifications. Implementations must tolerate being called from listener
/// and heartbeat threads concurrently.
pub trait EntityDelegate: Send + Sync {
    /// The local entity's active inbound connection died. The listener is
    /// already back to accepting; this is informational.
    fn on_server_lost(&self);

    /// A remote entity stopped answering heartbeats (or never connected).
    /// Fired at most once per entity lifetime.
    fn on_entity_lost(&self, entity_id: &str);
}
