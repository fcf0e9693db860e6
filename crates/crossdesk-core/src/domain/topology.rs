//! Entity topology: display aggregation, adjacency links, and jump-zone
//! resolution.
//!
//! The topology is an arena: entities are registered once and addressed by
//! [`EntityIdx`] thereafter. Neighbor lists hold indices, never references,
//! so the table is a single ownership root that can sit behind one lock.
//!
//! Adjacency is discovered geometrically. For each entity, four strips of
//! `jump_buffer` width hug the *outside* of its `total_bounds`; any other
//! entity whose bounds touch a strip becomes a neighbor in that direction,
//! and the mirror link is recorded on the other entity's opposite list.

use thiserror::Error;
use tracing::debug;

use crate::domain::display::Display;
use crate::geometry::{Point, Rect};

/// Default width, in pixels, of the jump zone outside an entity's bounds.
pub const DEFAULT_JUMP_BUFFER: i32 = 20;

/// Stable handle for an entity registered in an [`EntityTopology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityIdx(pub usize);

impl std::fmt::Display for EntityIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The four directions the cursor can leave an entity in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Errors from topology lookups.
#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    /// The index does not name a registered entity.
    #[error("unknown entity index: {0}")]
    UnknownEntity(EntityIdx),
}

/// The result of a successful jump-zone resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jump {
    /// The entity the cursor should hop to.
    pub entity: EntityIdx,
    /// Which edge of the source entity was crossed.
    pub direction: JumpDirection,
    /// Where the cursor lands, in shared desktop coordinates: the
    /// perpendicular coordinate sits `jump_buffer` past the crossed edge.
    pub point: Point,
}

/// One registered entity: its displays, global offset, cached bounds, and
/// neighbor lists in each direction.
#[derive(Debug, Clone)]
struct EntityNode {
    id: String,
    displays: Vec<Display>,
    offset: Point,
    total_bounds: Rect,
    top: Vec<EntityIdx>,
    bottom: Vec<EntityIdx>,
    left: Vec<EntityIdx>,
    right: Vec<EntityIdx>,
}

impl EntityNode {
    fn new(id: String) -> Self {
        Self {
            id,
            displays: Vec::new(),
            offset: Point::new(0, 0),
            total_bounds: Rect::inverted(),
            top: Vec::new(),
            bottom: Vec::new(),
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    fn neighbors(&self, direction: JumpDirection) -> &Vec<EntityIdx> {
        match direction {
            JumpDirection::Up => &self.top,
            JumpDirection::Down => &self.bottom,
            JumpDirection::Left => &self.left,
            JumpDirection::Right => &self.right,
        }
    }

    fn neighbors_mut(&mut self, direction: JumpDirection) -> &mut Vec<EntityIdx> {
        match direction {
            JumpDirection::Up => &mut self.top,
            JumpDirection::Down => &mut self.bottom,
            JumpDirection::Left => &mut self.left,
            JumpDirection::Right => &mut self.right,
        }
    }

    fn contains_point(&self, p: Point) -> bool {
        self.displays.iter().any(|d| d.contains(p))
    }
}

/// The arena of all known entities and their adjacency links.
pub struct EntityTopology {
    nodes: Vec<EntityNode>,
    jump_buffer: i32,
}

impl Default for EntityTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityTopology {
    /// Creates an empty topology with the default jump buffer.
    pub fn new() -> Self {
        Self::with_jump_buffer(DEFAULT_JUMP_BUFFER)
    }

    /// Creates an empty topology with a custom jump-buffer width.
    pub fn with_jump_buffer(jump_buffer: i32) -> Self {
        Self { nodes: Vec::new(), jump_buffer }
    }

    /// Registers a new entity and returns its handle. Indices are assigned
    /// in registration order and never reused.
    pub fn add_entity(&mut self, id: impl Into<String>) -> EntityIdx {
        self.nodes.push(EntityNode::new(id.into()));
        EntityIdx(self.nodes.len() - 1)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks an entity up by its string identifier.
    pub fn find_by_id(&self, id: &str) -> Option<EntityIdx> {
        self.nodes.iter().position(|n| n.id == id).map(EntityIdx)
    }

    /// The entity's string identifier.
    pub fn entity_id(&self, idx: EntityIdx) -> Result<&str, TopologyError> {
        Ok(&self.node(idx)?.id)
    }

    /// The entity's current global offset.
    pub fn offset(&self, idx: EntityIdx) -> Result<Point, TopologyError> {
        Ok(self.node(idx)?.offset)
    }

    /// The union of the entity's display collision rects. Grows as displays
    /// are added; only [`set_display_offsets`](Self::set_display_offsets)
    /// recomputes it from scratch.
    pub fn total_bounds(&self, idx: EntityIdx) -> Result<Rect, TopologyError> {
        Ok(self.node(idx)?.total_bounds)
    }

    // ── Display aggregation ───────────────────────────────────────────────────

    /// Adds a display to the entity and expands its `total_bounds` by the
    /// display's collision rect.
    pub fn add_display(&mut self, idx: EntityIdx, mut display: Display) -> Result<(), TopologyError> {
        let node = self.node_mut(idx)?;
        display.offset = node.offset;
        node.total_bounds.expand_to_cover(&display.collision());
        node.displays.push(display);
        Ok(())
    }

    /// Removes a display by its OS-native identifier, if present.
    ///
    /// `total_bounds` is deliberately left unchanged: a stale, larger bound
    /// only makes jump zones more permissive, and the next
    /// [`set_display_offsets`](Self::set_display_offsets) recomputes it.
    pub fn remove_display(&mut self, idx: EntityIdx, display_id: u32) -> Result<(), TopologyError> {
        let node = self.node_mut(idx)?;
        node.displays.retain(|d| d.id != display_id);
        Ok(())
    }

    /// Sets the entity's global offset, propagates it to every display, and
    /// rebuilds `total_bounds` from scratch. Idempotent: applying the same
    /// offset twice leaves the topology unchanged.
    pub fn set_display_offsets(&mut self, idx: EntityIdx, offset: Point) -> Result<(), TopologyError> {
        let node = self.node_mut(idx)?;
        node.offset = offset;
        node.total_bounds = Rect::inverted();
        for display in &mut node.displays {
            display.offset = offset;
            let collision = display.collision();
            node.total_bounds.expand_to_cover(&collision);
        }
        Ok(())
    }

    /// The first display, in registration order, containing `p`.
    pub fn display_for_point(&self, idx: EntityIdx, p: Point) -> Result<Option<&Display>, TopologyError> {
        Ok(self.node(idx)?.displays.iter().find(|d| d.contains(p)))
    }

    /// Returns `true` if any of the entity's displays contains `p`.
    pub fn point_intersects_entity(&self, idx: EntityIdx, p: Point) -> Result<bool, TopologyError> {
        Ok(self.node(idx)?.contains_point(p))
    }

    // ── Adjacency links ───────────────────────────────────────────────────────

    /// Tests whether `other` sits in one of the jump-zone strips just
    /// outside `of`'s bounds, and records the link (and its mirror) for
    /// every direction that matches. An entity never links to itself.
    pub fn link_if_adjacent(&mut self, of: EntityIdx, other: EntityIdx) -> Result<(), TopologyError> {
        if of == other {
            return Ok(());
        }
        let bounds = self.node(of)?.total_bounds;
        let other_bounds = self.node(other)?.total_bounds;
        let j = self.jump_buffer;

        let strips = [
            // Strip hugging the outside of each edge, spanning the full
            // parallel extent of the bounds.
            (
                JumpDirection::Up,
                Rect::new(
                    Point::new(bounds.top_left.x, bounds.top_left.y - j),
                    Point::new(bounds.bottom_right.x, bounds.top_left.y),
                ),
            ),
            (
                JumpDirection::Down,
                Rect::new(
                    Point::new(bounds.top_left.x, bounds.bottom_right.y),
                    Point::new(bounds.bottom_right.x, bounds.bottom_right.y + j),
                ),
            ),
            (
                JumpDirection::Left,
                Rect::new(
                    Point::new(bounds.top_left.x - j, bounds.top_left.y),
                    Point::new(bounds.top_left.x, bounds.bottom_right.y),
                ),
            ),
            (
                JumpDirection::Right,
                Rect::new(
                    Point::new(bounds.bottom_right.x, bounds.top_left.y),
                    Point::new(bounds.bottom_right.x + j, bounds.bottom_right.y),
                ),
            ),
        ];

        for (direction, strip) in strips {
            if strip.intersects(&other_bounds) {
                self.record_link(of, other, direction);
            }
        }
        Ok(())
    }

    /// Drops every neighbor list on every entity.
    pub fn clear_links(&mut self) {
        for node in &mut self.nodes {
            node.top.clear();
            node.bottom.clear();
            node.left.clear();
            node.right.clear();
        }
    }

    /// Clears all links, then re-runs pairwise adjacency over every entity
    /// pair. O(n²); call after bounds or offsets change.
    pub fn rebuild_links(&mut self) {
        self.clear_links();
        for a in 0..self.nodes.len() {
            for b in 0..self.nodes.len() {
                if a != b {
                    // Indices are in range by construction.
                    let _ = self.link_if_adjacent(EntityIdx(a), EntityIdx(b));
                }
            }
        }
        debug!(entities = self.nodes.len(), "adjacency links rebuilt");
    }

    // ── Jump resolution ───────────────────────────────────────────────────────

    /// Resolves a cursor position inside the entity's jump zone to the
    /// neighbor the cursor should hop to.
    ///
    /// Edges are tested in fixed order top, bottom, left, right; the first
    /// edge within `jump_buffer` of `p` wins. That edge's neighbor list is
    /// scanned in insertion order for an entity whose displays contain the
    /// point projected `jump_buffer` past the edge. Returns `None` if no
    /// edge is near or no neighbor claims the projected point.
    pub fn jump_target(&self, idx: EntityIdx, p: Point) -> Result<Option<Jump>, TopologyError> {
        let node = self.node(idx)?;
        let bounds = node.total_bounds;
        let j = self.jump_buffer;

        let candidates = [
            (
                JumpDirection::Up,
                p.y < bounds.top_left.y + j,
                Point::new(p.x, bounds.top_left.y - j),
            ),
            (
                JumpDirection::Down,
                p.y > bounds.bottom_right.y - j,
                Point::new(p.x, bounds.bottom_right.y + j),
            ),
            (
                JumpDirection::Left,
                p.x < bounds.top_left.x + j,
                Point::new(bounds.top_left.x - j, p.y),
            ),
            (
                JumpDirection::Right,
                p.x > bounds.bottom_right.x - j,
                Point::new(bounds.bottom_right.x + j, p.y),
            ),
        ];

        for (direction, in_zone, projected) in candidates {
            if !in_zone {
                continue;
            }
            for &neighbor in node.neighbors(direction) {
                if self.node(neighbor)?.contains_point(projected) {
                    return Ok(Some(Jump { entity: neighbor, direction, point: projected }));
                }
            }
        }
        Ok(None)
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn record_link(&mut self, of: EntityIdx, other: EntityIdx, direction: JumpDirection) {
        let forward = self.nodes[of.0].neighbors_mut(direction);
        if !forward.contains(&other) {
            forward.push(other);
        }
        let opposite = match direction {
            JumpDirection::Up => JumpDirection::Down,
            JumpDirection::Down => JumpDirection::Up,
            JumpDirection::Left => JumpDirection::Right,
            JumpDirection::Right => JumpDirection::Left,
        };
        let mirror = self.nodes[other.0].neighbors_mut(opposite);
        if !mirror.contains(&of) {
            mirror.push(of);
        }
    }

    fn node(&self, idx: EntityIdx) -> Result<&EntityNode, TopologyError> {
        self.nodes.get(idx.0).ok_or(TopologyError::UnknownEntity(idx))
    }

    fn node_mut(&mut self, idx: EntityIdx) -> Result<&mut EntityNode, TopologyError> {
        self.nodes.get_mut(idx.0).ok_or(TopologyError::UnknownEntity(idx))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(l: i32, t: i32, r: i32, b: i32) -> Rect {
        Rect::new(Point::new(l, t), Point::new(r, b))
    }

    /// Two side-by-side 1000×1000 entities: A at the origin, B offset to
    /// start exactly where A ends.
    fn side_by_side() -> (EntityTopology, EntityIdx, EntityIdx) {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("machine-a");
        let b = topo.add_entity("machine-b");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(b, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.set_display_offsets(b, Point::new(1000, 0)).unwrap();
        topo.rebuild_links();
        (topo, a, b)
    }

    // ── Display aggregation ───────────────────────────────────────────────────

    #[test]
    fn test_add_display_expands_total_bounds() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        topo.add_display(a, Display::new(0, rect(0, 0, 1920, 1080))).unwrap();
        assert_eq!(topo.total_bounds(a).unwrap(), rect(0, 0, 1920, 1080));

        topo.add_display(a, Display::new(1, rect(1920, 0, 3840, 1080))).unwrap();
        assert_eq!(topo.total_bounds(a).unwrap(), rect(0, 0, 3840, 1080));
    }

    #[test]
    fn test_remove_display_does_not_shrink_bounds() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        topo.add_display(a, Display::new(0, rect(0, 0, 1920, 1080))).unwrap();
        topo.add_display(a, Display::new(1, rect(1920, 0, 3840, 1080))).unwrap();

        topo.remove_display(a, 1).unwrap();

        // Point tests no longer see the removed display...
        assert!(!topo.point_intersects_entity(a, Point::new(3000, 500)).unwrap());
        // ...but the cached bounds still cover it.
        assert_eq!(topo.total_bounds(a).unwrap(), rect(0, 0, 3840, 1080));
    }

    #[test]
    fn test_set_display_offsets_recomputes_bounds_from_scratch() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        topo.add_display(a, Display::new(0, rect(0, 0, 1920, 1080))).unwrap();
        topo.add_display(a, Display::new(1, rect(1920, 0, 3840, 1080))).unwrap();
        topo.remove_display(a, 1).unwrap();

        topo.set_display_offsets(a, Point::new(0, 0)).unwrap();

        // Recompute drops the removed display's contribution.
        assert_eq!(topo.total_bounds(a).unwrap(), rect(0, 0, 1920, 1080));
    }

    #[test]
    fn test_set_display_offsets_is_idempotent() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();

        topo.set_display_offsets(a, Point::new(500, -200)).unwrap();
        let first = topo.total_bounds(a).unwrap();
        topo.set_display_offsets(a, Point::new(500, -200)).unwrap();

        assert_eq!(topo.total_bounds(a).unwrap(), first);
        assert_eq!(first, rect(500, -200, 1500, 800));
    }

    #[test]
    fn test_display_for_point_prefers_registration_order() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        // Two displays deliberately covering the same area.
        topo.add_display(a, Display::new(7, rect(0, 0, 100, 100))).unwrap();
        topo.add_display(a, Display::new(8, rect(0, 0, 100, 100))).unwrap();

        let found = topo.display_for_point(a, Point::new(50, 50)).unwrap();
        assert_eq!(found.map(|d| d.id), Some(7));
    }

    #[test]
    fn test_display_for_point_returns_none_outside_all_displays() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        topo.add_display(a, Display::new(0, rect(0, 0, 100, 100))).unwrap();
        assert!(topo.display_for_point(a, Point::new(500, 500)).unwrap().is_none());
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    #[test]
    fn test_find_by_id_returns_registration_index() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("alpha");
        let b = topo.add_entity("beta");
        assert_eq!(topo.find_by_id("alpha"), Some(a));
        assert_eq!(topo.find_by_id("beta"), Some(b));
        assert_eq!(topo.find_by_id("gamma"), None);
    }

    #[test]
    fn test_unknown_index_is_an_error() {
        let topo = EntityTopology::new();
        assert_eq!(
            topo.total_bounds(EntityIdx(3)),
            Err(TopologyError::UnknownEntity(EntityIdx(3)))
        );
    }

    // ── Adjacency links ───────────────────────────────────────────────────────

    #[test]
    fn test_side_by_side_entities_link_symmetrically() {
        let (topo, a, b) = side_by_side();
        // A sees B to its right, B sees A to its left.
        assert_eq!(topo.nodes[a.0].right, vec![b]);
        assert_eq!(topo.nodes[b.0].left, vec![a]);
        assert!(topo.nodes[a.0].left.is_empty());
        assert!(topo.nodes[b.0].right.is_empty());
    }

    #[test]
    fn test_distant_entities_do_not_link() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        let b = topo.add_entity("b");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(b, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        // Gap of 100 px, well past the 20 px jump buffer.
        topo.set_display_offsets(b, Point::new(1100, 0)).unwrap();
        topo.rebuild_links();

        assert!(topo.nodes[a.0].right.is_empty());
        assert!(topo.nodes[b.0].left.is_empty());
    }

    #[test]
    fn test_entity_within_jump_buffer_gap_still_links() {
        let mut topo = EntityTopology::with_jump_buffer(20);
        let a = topo.add_entity("a");
        let b = topo.add_entity("b");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(b, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        // 15 px gap fits inside the 20 px strip.
        topo.set_display_offsets(b, Point::new(1015, 0)).unwrap();
        topo.rebuild_links();

        assert_eq!(topo.nodes[a.0].right, vec![b]);
    }

    #[test]
    fn test_vertical_stack_links_top_and_bottom() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        let b = topo.add_entity("b");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(b, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.set_display_offsets(b, Point::new(0, 1000)).unwrap();
        topo.rebuild_links();

        assert_eq!(topo.nodes[a.0].bottom, vec![b]);
        assert_eq!(topo.nodes[b.0].top, vec![a]);
    }

    #[test]
    fn test_diagonal_neighbor_links_on_two_edges_at_once() {
        // B's top-left corner touches A's bottom-right corner. Both the
        // right and bottom strips reach it, and each match is recorded
        // independently, so the pair links in two directions.
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        let b = topo.add_entity("b");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(b, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.set_display_offsets(b, Point::new(1000, 1000)).unwrap();
        topo.rebuild_links();

        assert_eq!(topo.nodes[a.0].right, vec![b]);
        assert_eq!(topo.nodes[a.0].bottom, vec![b]);
        assert_eq!(topo.nodes[b.0].left, vec![a]);
        assert_eq!(topo.nodes[b.0].top, vec![a]);
    }

    #[test]
    fn test_entity_never_links_to_itself() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.rebuild_links();

        assert!(topo.nodes[a.0].top.is_empty());
        assert!(topo.nodes[a.0].bottom.is_empty());
        assert!(topo.nodes[a.0].left.is_empty());
        assert!(topo.nodes[a.0].right.is_empty());
    }

    #[test]
    fn test_clear_links_drops_all_neighbor_lists() {
        let (mut topo, a, b) = side_by_side();
        topo.clear_links();
        assert!(topo.nodes[a.0].right.is_empty());
        assert!(topo.nodes[b.0].left.is_empty());
    }

    #[test]
    fn test_rebuild_links_is_stable_under_repetition() {
        let (mut topo, a, b) = side_by_side();
        topo.rebuild_links();
        topo.rebuild_links();
        // No duplicate neighbors accumulate.
        assert_eq!(topo.nodes[a.0].right, vec![b]);
        assert_eq!(topo.nodes[b.0].left, vec![a]);
    }

    // ── Jump resolution ───────────────────────────────────────────────────────

    #[test]
    fn test_jump_right_projects_past_the_crossed_edge() {
        let (topo, a, b) = side_by_side();

        let jump = topo
            .jump_target(a, Point::new(995, 500))
            .unwrap()
            .expect("cursor in right jump zone must resolve");

        assert_eq!(jump.entity, b);
        assert_eq!(jump.direction, JumpDirection::Right);
        // Landing is measured from the edge, not the cursor: 1000 + 20.
        assert_eq!(jump.point, Point::new(1020, 500));
    }

    #[test]
    fn test_jump_left_from_the_neighbor_comes_back() {
        let (topo, a, b) = side_by_side();

        let jump = topo
            .jump_target(b, Point::new(1005, 500))
            .unwrap()
            .expect("cursor in left jump zone must resolve");

        assert_eq!(jump.entity, a);
        assert_eq!(jump.direction, JumpDirection::Left);
        assert_eq!(jump.point, Point::new(980, 500));
    }

    #[test]
    fn test_no_jump_when_cursor_is_central() {
        let (topo, a, _) = side_by_side();
        assert_eq!(topo.jump_target(a, Point::new(500, 500)).unwrap(), None);
    }

    #[test]
    fn test_no_jump_when_no_neighbor_claims_projected_point() {
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.rebuild_links();

        // In the right jump zone, but there is nothing to the right.
        assert_eq!(topo.jump_target(a, Point::new(995, 500)).unwrap(), None);
    }

    #[test]
    fn test_edge_test_order_prefers_top_over_left_in_corners() {
        // B above A and C to A's left; the top-left corner of A is in both
        // jump zones at once, and the fixed edge order picks top first.
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        let b = topo.add_entity("b");
        let c = topo.add_entity("c");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(b, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(c, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.set_display_offsets(b, Point::new(0, -1000)).unwrap();
        topo.set_display_offsets(c, Point::new(-1000, 0)).unwrap();
        topo.rebuild_links();

        let jump = topo
            .jump_target(a, Point::new(5, 5))
            .unwrap()
            .expect("corner must resolve");
        assert_eq!(jump.entity, b);
        assert_eq!(jump.direction, JumpDirection::Up);
    }

    #[test]
    fn test_first_registered_neighbor_wins_ties_on_one_edge() {
        // Two entities stacked on the right both contain the projected
        // point's column; insertion order breaks the tie.
        let mut topo = EntityTopology::new();
        let a = topo.add_entity("a");
        let b = topo.add_entity("b");
        let c = topo.add_entity("c");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        // b and c overlap vertically so both contain the projected point.
        topo.add_display(b, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(c, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.set_display_offsets(b, Point::new(1000, 0)).unwrap();
        topo.set_display_offsets(c, Point::new(1000, 0)).unwrap();
        topo.rebuild_links();

        let jump = topo
            .jump_target(a, Point::new(995, 500))
            .unwrap()
            .expect("must resolve");
        assert_eq!(jump.entity, b, "first-registered neighbor takes the jump");
    }

    #[test]
    fn test_jump_respects_custom_jump_buffer() {
        let mut topo = EntityTopology::with_jump_buffer(50);
        let a = topo.add_entity("a");
        let b = topo.add_entity("b");
        topo.add_display(a, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.add_display(b, Display::new(0, rect(0, 0, 1000, 1000))).unwrap();
        topo.set_display_offsets(b, Point::new(1000, 0)).unwrap();
        topo.rebuild_links();

        // x=960 is outside a 20 px zone but inside a 50 px one.
        let jump = topo.jump_target(a, Point::new(960, 500)).unwrap().expect("must resolve");
        assert_eq!(jump.point, Point::new(1050, 500));
    }
}
