//! # crossdesk-core
//!
//! Shared library for CrossDesk containing the wire protocol codec, geometry
//! primitives, and the entity topology engine.
//!
//! This crate is used by every node process. It has zero dependencies on OS
//! APIs, input backends, or network sockets.
//!
//! # Architecture overview
//!
//! CrossDesk is a software KVM: one keyboard and mouse drive several machines
//! ("entities") arranged side by side in a shared 2-D coordinate space. When
//! the cursor runs off the edge of one entity's screens into a *jump zone*,
//! control hops to the adjacent entity.
//!
//! This crate defines:
//!
//! - **`geometry`** -- Points, rectangles, and the bound-accumulation helpers
//!   everything else is built on.
//!
//! - **`protocol`** -- How bytes travel over the wire. Every frame is a small
//!   fixed-layout packet tagged with a magic number, and every frame is
//!   answered by an explicit acknowledgement.
//!
//! - **`domain`** -- Pure business logic: displays, per-entity global offsets,
//!   and the topology table that answers "which entity does this point jump
//!   to, and where does the cursor land".

pub mod domain;
pub mod geometry;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `crossdesk_core::EntityTopology` instead of the full module path.
pub use domain::display::Display;
pub use domain::topology::{EntityIdx, EntityTopology, Jump, JumpDirection, TopologyError};
pub use geometry::{Point, Rect};
pub use protocol::events::{MouseButton, MouseEventKind, OsEvent};
pub use protocol::packets::{PacketType, WireError};
