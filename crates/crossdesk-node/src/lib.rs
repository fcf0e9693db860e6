//! # crossdesk-node
//!
//! The CrossDesk node daemon. Each machine in the virtual desktop runs one
//! node process holding:
//!
//! - one **local entity** -- owns this machine's displays and a listening
//!   server channel; inbound RPCs become injected input here;
//! - one **remote entity per peer** -- owns a client channel to that peer
//!   and a heartbeat thread; outbound RPCs flow through its transport.
//!
//! Layering:
//!
//! - **`infrastructure`** -- the channel capability (TCP + in-memory),
//!   input injection backends, and TOML config storage.
//! - **`transport`** -- reliable ack-gated RPC exchanges over a channel.
//! - **`lifecycle`** -- the listener and heartbeat loops and the runtime
//!   handle that owns their threads.
//! - **`delegate`** -- the callback seam the coordinating layer implements.
//! - **`entity`** -- the façade tying it all together.

pub mod delegate;
pub mod entity;
pub mod infrastructure;
pub mod lifecycle;
pub mod transport;

pub use delegate::EntityDelegate;
pub use entity::{Entity, EntityError, EntityRole};
pub use transport::{RpcTransport, TransportError};
