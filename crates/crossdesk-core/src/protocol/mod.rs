//! Wire protocol: packet framing and the OS-event payload codec.

pub mod events;
pub mod packets;
