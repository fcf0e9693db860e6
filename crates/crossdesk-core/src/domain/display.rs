//! A single physical display belonging to one entity.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// One physical display. `bounds` is the display's rectangle in its owning
/// machine's local coordinates; `offset` shifts it into the shared desktop
/// space. Every display is owned by exactly one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    /// The OS-native screen identifier, stable per machine.
    pub id: u32,
    /// Local bounds as reported by the OS.
    pub bounds: Rect,
    /// Translation from local bounds into the shared desktop space.
    pub offset: Point,
}

impl Display {
    pub fn new(id: u32, bounds: Rect) -> Self {
        Self { id, bounds, offset: Point::new(0, 0) }
    }

    /// The display's rectangle in shared desktop coordinates.
    pub fn collision(&self) -> Rect {
        self.bounds.translated(self.offset)
    }

    /// Returns `true` if `p` (in shared desktop coordinates) falls on this
    /// display.
    pub fn contains(&self, p: Point) -> bool {
        self.collision().contains(p)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
