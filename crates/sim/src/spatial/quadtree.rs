//! Region-subdivision quadtree over axis-aligned bounding boxes.
//!
//! Nodes live in an arena `Vec`; each item is addressed by its entity id
//! through an id-to-node map, so there are no back-pointers to dangle when
//! an entity is tombstoned. A leaf splits into four children once it holds
//! more than `max_items` records; sparse regions are never re-merged.
//!
//! Queries hand out box snapshots as of the call. Callers that mutate the
//! world in response must collect ids first and resolve afterwards; resolving
//! while a traversal is in flight is how an index desyncs from the registry.

use std::collections::HashMap;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Create bounds from center and size.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, size: f32) -> Self {
        Self {
            min_x: cx - size,
            min_y: cy - size,
            max_x: cx + size,
            max_y: cy + size,
        }
    }

    /// Check if two bounds intersect.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.min_x >= self.max_x
            || other.max_x <= self.min_x
            || other.min_y >= self.max_y
            || other.max_y <= self.min_y)
    }

    /// Check if `other` lies fully inside these bounds.
    #[inline]
    pub fn contains(&self, other: &Bounds) -> bool {
        self.min_x <= other.min_x
            && other.max_x <= self.max_x
            && self.min_y <= other.min_y
            && other.max_y <= self.max_y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }
}

/// An item stored in the tree. Exactly one record exists per indexed entity.
#[derive(Debug, Clone, Copy)]
pub struct QuadItem {
    /// Owning entity id.
    pub id: u32,
    /// Current position X.
    pub x: f32,
    /// Current position Y.
    pub y: f32,
    /// Current size (radius).
    pub size: f32,
    /// Bounding box (cached).
    pub bound: Bounds,
}

impl QuadItem {
    #[inline]
    pub fn new(id: u32, x: f32, y: f32, size: f32) -> Self {
        Self {
            id,
            x,
            y,
            size,
            bound: Bounds::from_center(x, y, size),
        }
    }

    /// Update position and size, recalculating bounds.
    #[inline]
    pub fn update(&mut self, x: f32, y: f32, size: f32) {
        self.x = x;
        self.y = y;
        self.size = size;
        self.bound = Bounds::from_center(x, y, size);
    }
}

/// A region node: either four child regions or a bounded list of item ids.
#[derive(Debug)]
struct Node {
    bound: Bounds,
    level: u32,
    children: Option<[usize; 4]>,
    items: Vec<u32>,
}

impl Node {
    fn leaf(bound: Bounds, level: u32) -> Self {
        Self {
            bound,
            level,
            children: None,
            items: Vec::new(),
        }
    }
}

/// QuadTree for efficient spatial queries.
pub struct QuadTree {
    nodes: Vec<Node>,
    items: HashMap<u32, QuadItem>,
    /// Item id to the index of the node currently holding it.
    locations: HashMap<u32, usize>,
    max_items: usize,
    max_level: u32,
}

impl QuadTree {
    /// Create a new QuadTree over the given bounds.
    pub fn new(bound: Bounds, max_items: usize, max_level: u32) -> Self {
        Self {
            nodes: vec![Node::leaf(bound, 0)],
            items: HashMap::with_capacity(1024),
            locations: HashMap::with_capacity(1024),
            max_items,
            max_level,
        }
    }

    /// Create a QuadTree sized for the game world.
    pub fn for_world(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self::new(Bounds::new(min_x, min_y, max_x, max_y), 64, 8)
    }

    /// Insert a new item. Inserting an id twice is a caller bug.
    pub fn insert(&mut self, item: QuadItem) {
        assert!(
            !self.items.contains_key(&item.id),
            "quadtree: item {} inserted twice",
            item.id
        );
        debug_assert!(item.size > 0.0, "quadtree: non-positive item size");
        let idx = self.descend(0, &item.bound);
        let id = item.id;
        self.items.insert(id, item);
        self.nodes[idx].items.push(id);
        self.locations.insert(id, idx);
        self.maybe_split(idx);
    }

    /// Remove an item by id. Removing an unknown id means the index and the
    /// entity registry have desynced, which is unrecoverable.
    pub fn remove(&mut self, id: u32) {
        let Some(idx) = self.locations.remove(&id) else {
            panic!("quadtree: remove of unknown item {id}");
        };
        self.items.remove(&id);
        self.detach(idx, id);
    }

    /// Refresh an item's record after its entity moved or resized. The item
    /// shifts between regions when its box crossed a region boundary.
    pub fn update(&mut self, id: u32, x: f32, y: f32, size: f32) {
        let Some(&idx) = self.locations.get(&id) else {
            panic!("quadtree: update of unknown item {id}");
        };
        let Some(item) = self.items.get_mut(&id) else {
            panic!("quadtree: update of unknown item {id}");
        };
        item.update(x, y, size);
        let bound = item.bound;

        let node = &self.nodes[idx];
        let still_fits = idx == 0 || node.bound.contains(&bound);
        let can_sink = node.children.is_some() && quadrant(&node.bound, &bound).is_some();
        if still_fits && !can_sink {
            return;
        }

        // crossed a region boundary (or a deeper region now fits): relocate
        self.detach(idx, id);
        let new_idx = self.descend(0, &bound);
        self.nodes[new_idx].items.push(id);
        self.locations.insert(id, new_idx);
        self.maybe_split(new_idx);
    }

    /// Visit every item whose box intersects `bound`. Visitation order is
    /// unspecified; the boxes seen are those current at the time of the call.
    pub fn find<F: FnMut(&QuadItem)>(&self, bound: &Bounds, mut visit: F) {
        self.find_in(0, bound, &mut visit);
    }

    /// Early-exit existence query: does any intersecting item satisfy `pred`?
    pub fn any<F: Fn(&QuadItem) -> bool>(&self, bound: &Bounds, pred: F) -> bool {
        self.any_in(0, bound, &pred)
    }

    /// Get an item's record by id.
    #[inline]
    pub fn get(&self, id: u32) -> Option<&QuadItem> {
        self.items.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn find_in(&self, idx: usize, bound: &Bounds, visit: &mut impl FnMut(&QuadItem)) {
        let node = &self.nodes[idx];
        for &id in &node.items {
            let item = &self.items[&id];
            if item.bound.intersects(bound) {
                visit(item);
            }
        }
        if let Some(children) = node.children {
            for child in children {
                if self.nodes[child].bound.intersects(bound) {
                    self.find_in(child, bound, visit);
                }
            }
        }
    }

    fn any_in(&self, idx: usize, bound: &Bounds, pred: &impl Fn(&QuadItem) -> bool) -> bool {
        let node = &self.nodes[idx];
        for &id in &node.items {
            let item = &self.items[&id];
            if item.bound.intersects(bound) && pred(item) {
                return true;
            }
        }
        if let Some(children) = node.children {
            for child in children {
                if self.nodes[child].bound.intersects(bound) && self.any_in(child, bound, pred) {
                    return true;
                }
            }
        }
        false
    }

    /// Walk down to the deepest node whose region fully contains `bound`.
    fn descend(&self, mut idx: usize, bound: &Bounds) -> usize {
        loop {
            let node = &self.nodes[idx];
            let Some(children) = node.children else {
                return idx;
            };
            match quadrant(&node.bound, bound) {
                Some(q) => idx = children[q],
                None => return idx,
            }
        }
    }

    /// Drop `id` from the item list of node `idx`.
    fn detach(&mut self, idx: usize, id: u32) {
        let items = &mut self.nodes[idx].items;
        let Some(pos) = items.iter().position(|&i| i == id) else {
            panic!("quadtree: location map desynced for item {id}");
        };
        items.swap_remove(pos);
    }

    /// Split an over-capacity leaf into four children and redistribute the
    /// items that fully fit inside one of them. Straddling items stay put.
    fn maybe_split(&mut self, idx: usize) {
        {
            let node = &self.nodes[idx];
            if node.children.is_some()
                || node.items.len() <= self.max_items
                || node.level >= self.max_level
            {
                return;
            }
        }

        let (bound, level) = (self.nodes[idx].bound, self.nodes[idx].level);
        let cx = bound.center_x();
        let cy = bound.center_y();
        let base = self.nodes.len();
        self.nodes.push(Node::leaf(Bounds::new(bound.min_x, bound.min_y, cx, cy), level + 1));
        self.nodes.push(Node::leaf(Bounds::new(cx, bound.min_y, bound.max_x, cy), level + 1));
        self.nodes.push(Node::leaf(Bounds::new(bound.min_x, cy, cx, bound.max_y), level + 1));
        self.nodes.push(Node::leaf(Bounds::new(cx, cy, bound.max_x, bound.max_y), level + 1));
        let children = [base, base + 1, base + 2, base + 3];
        self.nodes[idx].children = Some(children);

        let ids = std::mem::take(&mut self.nodes[idx].items);
        for id in ids {
            let item_bound = self.items[&id].bound;
            match quadrant(&bound, &item_bound) {
                Some(q) => {
                    let child = children[q];
                    self.nodes[child].items.push(id);
                    self.locations.insert(id, child);
                }
                None => self.nodes[idx].items.push(id),
            }
        }
        for child in children {
            self.maybe_split(child);
        }
    }
}

/// Which child quadrant of `node` fully contains `bound`, if any.
/// Order: top-left, top-right, bottom-left, bottom-right.
fn quadrant(node: &Bounds, bound: &Bounds) -> Option<usize> {
    let cx = node.center_x();
    let cy = node.center_y();
    let west = bound.max_x <= cx;
    let east = bound.min_x >= cx;
    let north = bound.max_y <= cy;
    let south = bound.min_y >= cy;
    match (west, east, north, south) {
        (true, _, true, _) => Some(0),
        (_, true, true, _) => Some(1),
        (true, _, _, true) => Some(2),
        (_, true, _, true) => Some(3),
        _ => None,
    }
}

impl std::fmt::Debug for QuadTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadTree")
            .field("items", &self.items.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn world_tree() -> QuadTree {
        QuadTree::for_world(-1000.0, -1000.0, 1000.0, 1000.0)
    }

    fn collect(tree: &QuadTree, bound: &Bounds) -> HashSet<u32> {
        let mut found = HashSet::new();
        tree.find(bound, |item| {
            found.insert(item.id);
        });
        found
    }

    #[test]
    fn test_bounds_intersects() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, 5.0, 15.0, 15.0);
        let c = Bounds::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
    }

    #[test]
    fn test_insert_find() {
        let mut tree = world_tree();
        tree.insert(QuadItem::new(1, 0.0, 0.0, 10.0));
        tree.insert(QuadItem::new(2, 500.0, 500.0, 10.0));
        tree.insert(QuadItem::new(3, -500.0, -500.0, 10.0));
        assert_eq!(tree.len(), 3);

        let near_origin = collect(&tree, &Bounds::from_center(0.0, 0.0, 20.0));
        assert_eq!(near_origin, HashSet::from([1]));

        let near_far = collect(&tree, &Bounds::from_center(500.0, 500.0, 20.0));
        assert_eq!(near_far, HashSet::from([2]));
    }

    #[test]
    fn full_box_query_returns_every_live_item() {
        let mut tree = QuadTree::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 4, 8);
        let full = Bounds::new(-100.0, -100.0, 100.0, 100.0);

        for id in 0..200u32 {
            let x = -90.0 + (id % 20) as f32 * 9.0;
            let y = -90.0 + (id / 20) as f32 * 18.0;
            tree.insert(QuadItem::new(id, x, y, 2.0));
        }
        for id in (0..200u32).step_by(3) {
            tree.remove(id);
        }
        for id in (1..200u32).step_by(3) {
            tree.update(id, 0.0, 0.0, 2.0);
        }

        let expected: HashSet<u32> = (0..200).filter(|id| id % 3 != 0).collect();
        assert_eq!(collect(&tree, &full), expected);

        // boxes reflect the last update
        let moved = tree.get(1).expect("item 1 present");
        assert_eq!((moved.x, moved.y), (0.0, 0.0));
    }

    #[test]
    fn update_relocates_across_regions() {
        // capacity 1 forces splits immediately
        let mut tree = QuadTree::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 1, 8);
        tree.insert(QuadItem::new(1, -50.0, -50.0, 5.0));
        tree.insert(QuadItem::new(2, 50.0, 50.0, 5.0));
        tree.insert(QuadItem::new(3, 50.0, -50.0, 5.0));

        tree.update(1, 50.0, 48.0, 5.0);
        let found = collect(&tree, &Bounds::from_center(50.0, 50.0, 10.0));
        assert!(found.contains(&1));
        assert!(found.contains(&2));
        assert!(!found.contains(&3));

        // nothing left in the old region
        let old = collect(&tree, &Bounds::from_center(-50.0, -50.0, 10.0));
        assert!(old.is_empty());
    }

    #[test]
    fn growing_item_climbs_out_of_its_region() {
        let mut tree = QuadTree::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 1, 8);
        for id in 0..4 {
            let sign_x = if id % 2 == 0 { -1.0 } else { 1.0 };
            let sign_y = if id < 2 { -1.0 } else { 1.0 };
            tree.insert(QuadItem::new(id, sign_x * 50.0, sign_y * 50.0, 4.0));
        }
        // item 0 grows until it straddles every quadrant
        tree.update(0, -10.0, -10.0, 60.0);
        let found = collect(&tree, &Bounds::from_center(40.0, 40.0, 15.0));
        assert!(found.contains(&0));
        assert!(found.contains(&3));
    }

    #[test]
    fn any_respects_predicate() {
        let mut tree = world_tree();
        tree.insert(QuadItem::new(7, 0.0, 0.0, 10.0));
        let probe = Bounds::from_center(0.0, 0.0, 5.0);
        assert!(tree.any(&probe, |_| true));
        assert!(!tree.any(&probe, |item| item.id != 7));
        assert!(!tree.any(&Bounds::from_center(900.0, 900.0, 5.0), |_| true));
    }

    #[test]
    #[should_panic(expected = "inserted twice")]
    fn double_insert_panics() {
        let mut tree = world_tree();
        tree.insert(QuadItem::new(1, 0.0, 0.0, 10.0));
        tree.insert(QuadItem::new(1, 5.0, 5.0, 10.0));
    }

    #[test]
    #[should_panic(expected = "remove of unknown item")]
    fn remove_unknown_panics() {
        let mut tree = world_tree();
        tree.remove(42);
    }
}
