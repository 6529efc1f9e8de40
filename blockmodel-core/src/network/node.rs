//! The polymorphic node entity shared by every level of the hierarchy.
//!
//! A level-0 node is an observed data node; anything above is a block. The
//! `level` field is the only thing telling them apart — there is no separate
//! block type.

use fxhash::{FxHashMap, FxHashSet};

/// Stable handle to a node in a [`Network`](crate::Network) arena.
///
/// Handles stay valid for the lifetime of the node they name. Slots of
/// deleted blocks are never reused, so a handle to a pruned block is
/// detectably dead rather than silently aliased.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeKey(usize);

impl NodeKey {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

/// Counted multiset of leaf neighbours, keyed by leaf handle.
pub(crate) type NeighbourMap = FxHashMap<NodeKey, usize>;

/// A node in the typed hierarchy: a data node at level 0 or a block above.
///
/// Neighbour lists always hold **level-0 leaf handles** with multiplicities:
/// a block's list is the multiset union of its descendants' edge endpoints,
/// kept consistent incrementally by `set_parent`. `degree` caches the total
/// multiplicity across all per-type lists; a self-edge contributes two.
#[derive(Clone, Debug)]
pub struct Node {
    id: String,
    level: usize,
    node_type: usize,
    parent: Option<NodeKey>,
    children: FxHashSet<NodeKey>,
    neighbours: Vec<NeighbourMap>,
    degree: usize,
}

impl Node {
    pub(crate) fn new(id: String, level: usize, node_type: usize, num_types: usize) -> Self {
        Self {
            id,
            level,
            node_type,
            parent: None,
            children: FxHashSet::default(),
            neighbours: vec![NeighbourMap::default(); num_types],
            degree: 0,
        }
    }

    /// Identifier, unique within `(level, type)`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hierarchy level; 0 for data nodes.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Type tag in `[0, T)`.
    #[must_use]
    pub fn node_type(&self) -> usize {
        self.node_type
    }

    /// Handle of the parent block, or `None` at the top level.
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Total neighbour multiplicity; equals the sum of descendant leaf
    /// degrees.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of direct children.
    #[must_use]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Whether this node has no children. Always true for data nodes.
    #[must_use]
    pub fn is_childless(&self) -> bool {
        self.children.is_empty()
    }

    /// Read-only view of the direct children.
    pub fn children(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.children.iter().copied()
    }

    /// Read-only view of the leaf-neighbour multiset for one type.
    ///
    /// # Panics
    /// Panics when `node_type` is not a registered type index.
    #[must_use]
    pub fn neighbours_of_type(&self, node_type: usize) -> &FxHashMap<NodeKey, usize> {
        &self.neighbours[node_type]
    }

    pub(crate) fn set_parent_link(&mut self, parent: Option<NodeKey>) {
        self.parent = parent;
    }

    pub(crate) fn insert_child(&mut self, child: NodeKey) {
        self.children.insert(child);
    }

    pub(crate) fn remove_child(&mut self, child: NodeKey) {
        self.children.remove(&child);
    }

    pub(crate) fn neighbour_maps(&self) -> &[NeighbourMap] {
        &self.neighbours
    }

    pub(crate) fn take_neighbour_maps(&mut self) -> Vec<NeighbourMap> {
        std::mem::take(&mut self.neighbours)
    }

    pub(crate) fn restore_neighbour_maps(&mut self, maps: Vec<NeighbourMap>) {
        self.neighbours = maps;
    }

    /// Record `count` occurrences of the leaf `neighbour` (of type
    /// `neighbour_type`) against this node.
    pub(crate) fn add_neighbour(&mut self, neighbour: NodeKey, neighbour_type: usize, count: usize) {
        *self.neighbours[neighbour_type].entry(neighbour).or_insert(0) += count;
        self.degree += count;
    }

    /// Fold a child's whole neighbour multiset into this node's lists.
    pub(crate) fn add_neighbour_mass(&mut self, maps: &[NeighbourMap], mass: usize) {
        for (type_index, map) in maps.iter().enumerate() {
            for (&leaf, &count) in map {
                *self.neighbours[type_index].entry(leaf).or_insert(0) += count;
            }
        }
        self.degree += mass;
    }

    /// Subtract a child's whole neighbour multiset from this node's lists.
    ///
    /// # Panics
    /// Panics when the subtraction would underflow: the child's entries must
    /// be a sub-multiset of this node's, which holds whenever the child is a
    /// descendant.
    pub(crate) fn remove_neighbour_mass(&mut self, maps: &[NeighbourMap], mass: usize) {
        for (type_index, map) in maps.iter().enumerate() {
            for (&leaf, &count) in map {
                let entry = self.neighbours[type_index]
                    .get_mut(&leaf)
                    .expect("ancestor must hold every descendant neighbour entry");
                *entry = entry
                    .checked_sub(count)
                    .expect("ancestor neighbour multiplicity must cover the descendant's");
                if *entry == 0 {
                    self.neighbours[type_index].remove(&leaf);
                }
            }
        }
        self.degree -= mass;
    }
}
