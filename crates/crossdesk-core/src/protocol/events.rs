//! OS input event payload codec.
//!
//! An [`OsEvent`] travels as the payload frame following a
//! [`PacketType::OsEventHeader`](super::packets::PacketType) header. The
//! layout is fixed at [`EVENT_PAYLOAD_SIZE`] bytes regardless of variant so
//! the receiver can read exactly one frame without peeking:
//!
//! ```text
//! [0]      discriminant: 0x01 = Key, 0x02 = Mouse
//! Key:     [1] pressed  [2..4] scan_code:u16  [4..16] zero
//! Mouse:   [1] kind  [2] button  [3] reserved
//!          [4..8] extra:i32  [8..12] delta_x:i32  [12..16] delta_y:i32
//! ```
//! All multi-byte values are big-endian.

use thiserror::Error;

use super::packets::WireError;

/// Size of every encoded [`OsEvent`], both variants.
pub const EVENT_PAYLOAD_SIZE: usize = 16;

/// What a mouse event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MouseEventKind {
    Move = 0x01,
    Down = 0x02,
    Up = 0x03,
    Scroll = 0x04,
}

impl TryFrom<u8> for MouseEventKind {
    type Error = UnknownTag;

    fn try_from(value: u8) -> Result<Self, UnknownTag> {
        match value {
            0x01 => Ok(MouseEventKind::Move),
            0x02 => Ok(MouseEventKind::Down),
            0x03 => Ok(MouseEventKind::Up),
            0x04 => Ok(MouseEventKind::Scroll),
            _ => Err(UnknownTag(value)),
        }
    }
}

/// Which button a mouse event refers to. `None` for moves and scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MouseButton {
    None = 0x00,
    Left = 0x01,
    Right = 0x02,
    Middle = 0x03,
    Extended = 0x04,
}

impl TryFrom<u8> for MouseButton {
    type Error = UnknownTag;

    fn try_from(value: u8) -> Result<Self, UnknownTag> {
        match value {
            0x00 => Ok(MouseButton::None),
            0x01 => Ok(MouseButton::Left),
            0x02 => Ok(MouseButton::Right),
            0x03 => Ok(MouseButton::Middle),
            0x04 => Ok(MouseButton::Extended),
            _ => Err(UnknownTag(value)),
        }
    }
}

/// A tag byte that is not a member of the enum being decoded.
#[derive(Debug, Error, PartialEq)]
#[error("unknown tag byte: 0x{0:02X}")]
pub struct UnknownTag(pub u8);

/// A platform-neutral input event forwarded between entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OsEvent {
    /// A key changed state. `scan_code` is the hardware scan code.
    Key { pressed: bool, scan_code: u16 },
    /// The mouse moved, clicked, or scrolled. `extra` carries
    /// button-specific detail (e.g. which extended button); deltas are in
    /// pixels for moves and wheel notches for scrolls.
    Mouse {
        kind: MouseEventKind,
        button: MouseButton,
        extra: i32,
        delta_x: i32,
        delta_y: i32,
    },
}

const TAG_KEY: u8 = 0x01;
const TAG_MOUSE: u8 = 0x02;

/// Encodes `event` into its fixed wire layout.
pub fn encode_event(event: &OsEvent) -> [u8; EVENT_PAYLOAD_SIZE] {
    let mut buf = [0u8; EVENT_PAYLOAD_SIZE];
    match event {
        OsEvent::Key { pressed, scan_code } => {
            buf[0] = TAG_KEY;
            buf[1] = u8::from(*pressed);
            buf[2..4].copy_from_slice(&scan_code.to_be_bytes());
        }
        OsEvent::Mouse { kind, button, extra, delta_x, delta_y } => {
            buf[0] = TAG_MOUSE;
            buf[1] = *kind as u8;
            buf[2] = *button as u8;
            buf[4..8].copy_from_slice(&extra.to_be_bytes());
            buf[8..12].copy_from_slice(&delta_x.to_be_bytes());
            buf[12..16].copy_from_slice(&delta_y.to_be_bytes());
        }
    }
    buf
}

/// Decodes one [`OsEvent`] from a fixed-layout payload frame.
///
/// # Errors
///
/// Returns [`WireError::ShortFrame`] for truncated frames and
/// [`WireError::MalformedPayload`] for unknown discriminant, kind, or
/// button bytes.
pub fn decode_event(bytes: &[u8]) -> Result<OsEvent, WireError> {
    if bytes.len() < EVENT_PAYLOAD_SIZE {
        return Err(WireError::ShortFrame {
            needed: EVENT_PAYLOAD_SIZE,
            available: bytes.len(),
        });
    }

    match bytes[0] {
        TAG_KEY => Ok(OsEvent::Key {
            pressed: bytes[1] != 0,
            scan_code: u16::from_be_bytes([bytes[2], bytes[3]]),
        }),
        TAG_MOUSE => {
            let kind = MouseEventKind::try_from(bytes[1])
                .map_err(|e| WireError::MalformedPayload(format!("mouse kind: {e}")))?;
            let button = MouseButton::try_from(bytes[2])
                .map_err(|e| WireError::MalformedPayload(format!("mouse button: {e}")))?;
            Ok(OsEvent::Mouse {
                kind,
                button,
                extra: i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
                delta_x: i32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
                delta_y: i32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            })
        }
        other => Err(WireError::MalformedPayload(format!(
            "unknown event discriminant: 0x{other:02X}"
        ))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
