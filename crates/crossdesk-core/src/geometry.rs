//! Geometry primitives shared by the display and topology layers.
//!
//! All coordinates live in the global desktop space: a single signed 2-D
//! plane shared by every entity. Rectangles are closed on all four sides, so
//! two rectangles that merely share an edge still intersect. The jump-zone
//! strips rely on that: a strip hugging the outside of one entity's bounds
//! touches, and therefore links to, a neighbor that starts exactly where the
//! strip does.

use serde::{Deserialize, Serialize};

/// A point in global desktop coordinates. May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle described by its top-left and bottom-right
/// corners, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Rect {
    pub const fn new(top_left: Point, bottom_right: Point) -> Self {
        Self { top_left, bottom_right }
    }

    /// A degenerate rectangle with inverted extremes, used as the identity
    /// element when folding a set of rectangles into their common bounds.
    /// Any real rectangle expanded into it replaces both corners.
    pub const fn inverted() -> Self {
        Self {
            top_left: Point::new(i32::MAX, i32::MAX),
            bottom_right: Point::new(i32::MIN, i32::MIN),
        }
    }

    /// Returns `true` if the corners are still inverted, i.e. no real
    /// rectangle has been folded in yet. `width`/`height` are undefined on
    /// a degenerate rectangle.
    pub fn is_degenerate(&self) -> bool {
        self.top_left.x > self.bottom_right.x || self.top_left.y > self.bottom_right.y
    }

    pub fn width(&self) -> i32 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> i32 {
        self.bottom_right.y - self.top_left.y
    }

    /// Returns `true` if `p` lies within the rectangle, edges included.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.top_left.x
            && p.x <= self.bottom_right.x
            && p.y >= self.top_left.y
            && p.y <= self.bottom_right.y
    }

    /// Returns `true` if the two rectangles share at least one point.
    /// Edge contact counts.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.top_left.x <= other.bottom_right.x
            && self.bottom_right.x >= other.top_left.x
            && self.top_left.y <= other.bottom_right.y
            && self.bottom_right.y >= other.top_left.y
    }

    /// Grows this rectangle so that it also covers `other`.
    pub fn expand_to_cover(&mut self, other: &Rect) {
        self.top_left.x = self.top_left.x.min(other.top_left.x);
        self.top_left.y = self.top_left.y.min(other.top_left.y);
        self.bottom_right.x = self.bottom_right.x.max(other.bottom_right.x);
        self.bottom_right.y = self.bottom_right.y.max(other.bottom_right.y);
    }

    /// Returns a copy of this rectangle translated by `offset`.
    pub fn translated(&self, offset: Point) -> Rect {
        Rect::new(self.top_left + offset, self.bottom_right + offset)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
