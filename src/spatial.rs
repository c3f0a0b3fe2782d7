//! Bounded-capacity quadtree over 2-D points
//!
//! Nodes and items live in flat arenas owned by the tree and refer to each
//! other by index, so traversal is a simple loop with an explicit stack.
//! A node is either a leaf holding up to `capacity` items or an internal node
//! with exactly four children; a leaf becomes internal the first time it
//! overflows and never turns back.

use log::trace;

use crate::error::{MapError, Result};
use crate::geometry::{Point, Rectangle, Shape};

/// Index of a node in the tree's node arena
pub type NodeId = usize;

/// Index of an item in the tree's item arena
pub type ItemId = usize;

/// Items a leaf holds before it splits
pub const DEFAULT_CAPACITY: usize = 3;

/// Deepest level a node may be created at
///
/// Guards against endless subdivision when more than `capacity` items share
/// (nearly) the same position.
pub const MAX_DEPTH: usize = 64;

const ROOT: NodeId = 0;

/// A value stored in the tree together with its id and position
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem<T> {
    pub value: T,
    pub id: u64,
    pub position: Point,
}

/// Contents of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    /// Directly held items, at most `capacity` of them
    Leaf(Vec<ItemId>),
    /// Children in quadrant order: top-left, top-right, bottom-left, bottom-right
    Internal([NodeId; 4]),
}

/// A node of the quadtree
#[derive(Debug, Clone)]
pub struct QuadNode {
    bounds: Rectangle,
    depth: usize,
    state: NodeState,
}

impl QuadNode {
    fn leaf(bounds: Rectangle, depth: usize, capacity: usize) -> Self {
        Self {
            bounds,
            depth,
            state: NodeState::Leaf(Vec::with_capacity(capacity)),
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    /// Distance from the root (the root has depth 0)
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.state, NodeState::Leaf(_))
    }

    /// Items held directly by this node (always empty for internal nodes)
    pub fn items(&self) -> &[ItemId] {
        match &self.state {
            NodeState::Leaf(items) => items,
            NodeState::Internal(_) => &[],
        }
    }

    /// Child nodes, if this node has been split
    pub fn children(&self) -> Option<[NodeId; 4]> {
        match self.state {
            NodeState::Leaf(_) => None,
            NodeState::Internal(children) => Some(children),
        }
    }
}

/// Point quadtree bounded to a half-open rectangle
///
/// # Example
///
/// ```
/// use fractal_worldmap::{Circle, Point, QuadTree, Rectangle, Shape};
///
/// let bounds = Rectangle::new(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
/// let mut tree = QuadTree::new(bounds);
/// tree.insert("harbour", 1, Point::new(10.0, 10.0)).unwrap();
/// tree.insert("mill", 2, Point::new(80.0, 40.0)).unwrap();
///
/// let near = tree.query(&Shape::Circle(Circle::new(Point::new(12.0, 12.0), 5.0))).unwrap();
/// assert_eq!(near, vec![&"harbour"]);
/// ```
#[derive(Debug, Clone)]
pub struct QuadTree<T> {
    capacity: usize,
    nodes: Vec<QuadNode>,
    items: Vec<IndexedItem<T>>,
}

impl<T> QuadTree<T> {
    /// Create an empty tree with the default leaf capacity of 3
    pub fn new(bounds: Rectangle) -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            nodes: vec![QuadNode::leaf(bounds, 0, DEFAULT_CAPACITY)],
            items: Vec::new(),
        }
    }

    /// Create an empty tree with a custom leaf capacity
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `capacity` is 0
    pub fn with_capacity(bounds: Rectangle, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MapError::InvalidConfig(
                "quadtree capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            capacity,
            nodes: vec![QuadNode::leaf(bounds, 0, capacity)],
            items: Vec::new(),
        })
    }

    /// Insert a value at a position
    ///
    /// A full leaf is split into four equal quadrants, its items are moved
    /// into them, and insertion continues in the matching child.
    ///
    /// # Errors
    ///
    /// - `Bounds` if the root rectangle does not contain `position`
    /// - `Split` if a split cannot place every item in a child, or the node
    ///   can no longer be halved. The whole chain of splits is planned before
    ///   any is applied, so on error neither nodes nor items change.
    pub fn insert(&mut self, value: T, id: u64, position: Point) -> Result<()> {
        if !self.bounds().contains(position) {
            return Err(MapError::Bounds { position });
        }

        let mut node_id = ROOT;
        let mut planned = false;
        loop {
            match &self.nodes[node_id].state {
                NodeState::Internal(children) => {
                    node_id = self
                        .child_containing(children, position)
                        .ok_or(MapError::Split { position })?;
                }
                NodeState::Leaf(held) if held.len() < self.capacity => {
                    let item_id = self.items.len();
                    self.items.push(IndexedItem {
                        value,
                        id,
                        position,
                    });
                    if let NodeState::Leaf(held) = &mut self.nodes[node_id].state {
                        held.push(item_id);
                    }
                    return Ok(());
                }
                NodeState::Leaf(_) => {
                    if !planned {
                        self.plan_splits(node_id, position)?;
                        planned = true;
                    }
                    self.split(node_id, position)?;
                }
            }
        }
    }

    /// Follow the splits that inserting `incoming` into the full leaf
    /// `node_id` would cause, without changing the tree
    ///
    /// New children start empty, so only the items sharing the incoming
    /// item's quadrant can force another split below it.
    fn plan_splits(&self, node_id: NodeId, incoming: Point) -> Result<()> {
        let node = &self.nodes[node_id];
        let mut bounds = node.bounds;
        let mut depth = node.depth;
        let mut crowd: Vec<Point> = node
            .items()
            .iter()
            .map(|&item_id| self.items[item_id].position)
            .collect();

        loop {
            if depth >= MAX_DEPTH || !bounds.can_subdivide() {
                return Err(MapError::Split { position: incoming });
            }

            let quadrants = bounds.quadrants();
            let quadrant_of = |position: Point| quadrants.iter().position(|q| q.contains(position));
            if let Some(&stray) = crowd.iter().find(|&&position| quadrant_of(position).is_none()) {
                return Err(MapError::Split { position: stray });
            }
            let target = quadrant_of(incoming).ok_or(MapError::Split { position: incoming })?;

            crowd.retain(|&position| quadrant_of(position) == Some(target));
            if crowd.len() < self.capacity {
                return Ok(());
            }
            bounds = quadrants[target];
            depth += 1;
        }
    }

    /// Turn a full leaf into an internal node with four children
    fn split(&mut self, node_id: NodeId, incoming: Point) -> Result<()> {
        let node = &self.nodes[node_id];
        if node.depth >= MAX_DEPTH || !node.bounds.can_subdivide() {
            return Err(MapError::Split { position: incoming });
        }

        let quadrants = node.bounds.quadrants();
        let quadrant_of = |position: Point| quadrants.iter().position(|q| q.contains(position));

        let mut placements = Vec::with_capacity(node.items().len());
        for &item_id in node.items() {
            let position = self.items[item_id].position;
            let quadrant = quadrant_of(position).ok_or(MapError::Split { position })?;
            placements.push((quadrant, item_id));
        }
        if quadrant_of(incoming).is_none() {
            return Err(MapError::Split { position: incoming });
        }

        let depth = node.depth + 1;
        let first_child = self.nodes.len();
        for quadrant in quadrants {
            self.nodes.push(QuadNode::leaf(quadrant, depth, self.capacity));
        }
        for (quadrant, item_id) in placements {
            if let NodeState::Leaf(held) = &mut self.nodes[first_child + quadrant].state {
                held.push(item_id);
            }
        }
        self.nodes[node_id].state = NodeState::Internal([
            first_child,
            first_child + 1,
            first_child + 2,
            first_child + 3,
        ]);

        trace!("Split quad {} at depth {}", node_id, depth - 1);
        Ok(())
    }

    fn child_containing(&self, children: &[NodeId; 4], position: Point) -> Option<NodeId> {
        children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].bounds.contains(position))
    }

    /// Values of all items whose position lies within `shape`
    ///
    /// Only subtrees whose rectangle touches the shape are visited. The order
    /// of the result follows the tree layout, not insertion order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownShape` if the shape is malformed
    pub fn query(&self, shape: &Shape) -> Result<Vec<&T>> {
        Ok(self
            .query_items(shape)?
            .into_iter()
            .map(|item| &item.value)
            .collect())
    }

    /// Like [`QuadTree::query`], but returns the full items
    pub fn query_items(&self, shape: &Shape) -> Result<Vec<&IndexedItem<T>>> {
        shape.validate()?;

        let mut found = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id];
            if !shape.touches_rect(&node.bounds) {
                continue;
            }
            match &node.state {
                NodeState::Leaf(held) => found.extend(
                    held.iter()
                        .map(|&item_id| &self.items[item_id])
                        .filter(|item| shape.contains(item.position)),
                ),
                NodeState::Internal(children) => stack.extend(children.iter().rev()),
            }
        }
        Ok(found)
    }

    /// Number of stored items
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Root rectangle; inserts outside of it fail
    #[inline]
    pub fn bounds(&self) -> Rectangle {
        self.nodes[ROOT].bounds
    }

    #[inline]
    pub fn root(&self) -> &QuadNode {
        &self.nodes[ROOT]
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&QuadNode> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest node
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(QuadNode::depth).max().unwrap_or(0)
    }

    #[inline]
    pub fn item(&self, id: ItemId) -> Option<&IndexedItem<T>> {
        self.items.get(id)
    }

    /// All items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &IndexedItem<T>> {
        self.items.iter()
    }
}
