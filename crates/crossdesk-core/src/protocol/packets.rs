//! Fixed-layout packet framing.
//!
//! Wire format:
//! ```text
//! Header: [magic:4][packet_type:1]            = 5 bytes
//! Ack:    [magic:4]                           = 4 bytes
//! MousePositionPayload: [x_percent:4][y_percent:4] = 8 bytes (IEEE-754 f32)
//! ```
//! All multi-byte values are big-endian. Every frame an endpoint sends,
//! header or payload, is answered by the peer with an `Ack` before the
//! conversation continues, so a sender always knows its frame arrived intact.
//!
//! The magic number doubles as a framing check: a header or ack whose first
//! four bytes are not the magic means the stream has desynchronized and the
//! connection is no longer trustworthy.

use thiserror::Error;

/// Tag present at the start of every frame. Both ends must agree on it;
/// the value itself is arbitrary ("CTEN" backwards, as bytes).
pub const PACKET_MAGIC: u32 = 0x4E45_5443;

/// Size of an encoded [`PacketType`] header.
pub const HEADER_SIZE: usize = 5;

/// Size of an encoded acknowledgement.
pub const ACK_SIZE: usize = 4;

/// Size of an encoded mouse-position payload.
pub const MOUSE_POSITION_PAYLOAD_SIZE: usize = 8;

/// Errors produced while decoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    /// The byte slice is shorter than the frame requires.
    #[error("short frame: need {needed} bytes, got {available}")]
    ShortFrame { needed: usize, available: usize },

    /// The leading magic bytes do not match [`PACKET_MAGIC`].
    #[error("bad magic: 0x{0:08X}")]
    BadMagic(u32),

    /// The packet type byte is not a recognized value.
    #[error("unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// The payload bytes decoded but the values are out of range.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Every RPC the protocol can carry, one per header.
///
/// `OsEventHeader` announces that an OS-event payload follows; the other
/// types either carry a fixed payload (`SetMousePosition`) or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Warp the peer's cursor to a percentage position within its bounds.
    /// Followed by a [`MousePositionPayload`].
    SetMousePosition = 0x01,
    /// Hide the peer's cursor. No payload.
    HideMouse = 0x02,
    /// Reveal the peer's cursor. No payload.
    UnhideMouse = 0x03,
    /// Liveness probe. No payload.
    Heartbeat = 0x04,
    /// An OS input event payload follows. See [`super::events`].
    OsEventHeader = 0x05,
}

impl TryFrom<u8> for PacketType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(PacketType::SetMousePosition),
            0x02 => Ok(PacketType::HideMouse),
            0x03 => Ok(PacketType::UnhideMouse),
            0x04 => Ok(PacketType::Heartbeat),
            0x05 => Ok(PacketType::OsEventHeader),
            _ => Err(()),
        }
    }
}

/// Percentage cursor position within the receiving entity's total bounds.
/// Both components are expected in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MousePositionPayload {
    pub x_percent: f32,
    pub y_percent: f32,
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes a packet header for `packet_type`.
pub fn encode_header(packet_type: PacketType) -> [u8; HEADER_SIZE] {
    let magic = PACKET_MAGIC.to_be_bytes();
    [magic[0], magic[1], magic[2], magic[3], packet_type as u8]
}

/// Encodes an acknowledgement frame.
pub fn encode_ack() -> [u8; ACK_SIZE] {
    PACKET_MAGIC.to_be_bytes()
}

/// Encodes a mouse-position payload.
pub fn encode_mouse_position(payload: &MousePositionPayload) -> [u8; MOUSE_POSITION_PAYLOAD_SIZE] {
    let mut buf = [0u8; MOUSE_POSITION_PAYLOAD_SIZE];
    buf[0..4].copy_from_slice(&payload.x_percent.to_be_bytes());
    buf[4..8].copy_from_slice(&payload.y_percent.to_be_bytes());
    buf
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes a packet header, validating length, magic, and type byte.
///
/// # Errors
///
/// Returns [`WireError`] if the frame is short, the magic is wrong, or the
/// type byte is unknown.
pub fn decode_header(bytes: &[u8]) -> Result<PacketType, WireError> {
    require_len(bytes, HEADER_SIZE)?;
    check_magic(bytes)?;
    PacketType::try_from(bytes[4]).map_err(|_| WireError::UnknownPacketType(bytes[4]))
}

/// Decodes an acknowledgement frame, validating length and magic.
///
/// # Errors
///
/// Returns [`WireError`] if the frame is short or the magic is wrong.
pub fn decode_ack(bytes: &[u8]) -> Result<(), WireError> {
    require_len(bytes, ACK_SIZE)?;
    check_magic(bytes)
}

/// Decodes a mouse-position payload, validating that both components are
/// finite and within `[0.0, 1.0]`.
///
/// # Errors
///
/// Returns [`WireError::MalformedPayload`] for NaN, infinite, or
/// out-of-range components.
pub fn decode_mouse_position(bytes: &[u8]) -> Result<MousePositionPayload, WireError> {
    require_len(bytes, MOUSE_POSITION_PAYLOAD_SIZE)?;
    let x_percent = f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let y_percent = f32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    for (name, v) in [("x_percent", x_percent), ("y_percent", y_percent)] {
        if !v.is_finite() || !(0.0..=1.0).contains(&v) {
            return Err(WireError::MalformedPayload(format!(
                "{name} out of range: {v}"
            )));
        }
    }

    Ok(MousePositionPayload { x_percent, y_percent })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn require_len(bytes: &[u8], needed: usize) -> Result<(), WireError> {
    if bytes.len() < needed {
        return Err(WireError::ShortFrame { needed, available: bytes.len() });
    }
    Ok(())
}

fn check_magic(bytes: &[u8]) -> Result<(), WireError> {
    let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != PACKET_MAGIC {
        return Err(WireError::BadMagic(magic));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
