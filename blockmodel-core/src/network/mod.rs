//! Multi-level container of typed nodes.
//!
//! The network owns every node in a single arena and groups handles by
//! `(level, type)`. Level 0 holds the observed data nodes; each level above
//! holds blocks whose neighbour lists and degrees are maintained
//! incrementally as children are reassigned.

mod hierarchy;
mod node;
mod state;

use fxhash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::{
    error::{NetworkError, Result},
    sampler::Sampler,
};

pub use self::node::{Node, NodeKey};
pub use self::state::{NO_PARENT, StateDump, StateRow};

/// A hierarchical, typed multigraph with one owner for every node.
///
/// # Examples
/// ```
/// use blockmodel_core::Network;
///
/// let mut net = Network::new(&["a", "b"], 42);
/// net.add_node("a1", "a", 0).expect("type is registered");
/// net.add_node("b1", "b", 0).expect("type is registered");
/// net.add_edge("a1", "b1").expect("both leaves exist");
/// net.initialize_blocks(None, 0).expect("level 0 is the top level");
/// assert_eq!(net.num_levels(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct Network {
    types: Vec<String>,
    type_lookup: FxHashMap<String, usize>,
    levels: Vec<Vec<Vec<NodeKey>>>,
    slots: Vec<Option<Node>>,
    index: FxHashMap<(usize, String), NodeKey>,
    allowed_edges: Option<FxHashSet<(usize, usize)>>,
    sampler: Sampler,
    block_counter: usize,
}

impl Network {
    /// Creates an empty network with the given node types and sampler seed.
    #[must_use]
    pub fn new(type_names: &[&str], seed: u64) -> Self {
        let types: Vec<String> = type_names.iter().map(|name| (*name).to_owned()).collect();
        let type_lookup = types
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        let mut network = Self {
            types,
            type_lookup,
            levels: Vec::new(),
            slots: Vec::new(),
            index: FxHashMap::default(),
            allowed_edges: None,
            sampler: Sampler::new(seed),
            block_counter: 0,
        };
        network.build_level();
        network
    }

    // =========================================================================
    // Information
    // =========================================================================

    /// Number of node types.
    #[must_use]
    pub fn num_types(&self) -> usize {
        self.types.len()
    }

    /// Registered type names, in index order.
    #[must_use]
    pub fn type_names(&self) -> &[String] {
        &self.types
    }

    /// Name of the type with index `type_index`.
    ///
    /// # Panics
    /// Panics when `type_index` is not a registered type index.
    #[must_use]
    pub fn type_name(&self, type_index: usize) -> &str {
        &self.types[type_index]
    }

    /// Resolves a type name to its index.
    ///
    /// # Errors
    /// Returns [`NetworkError::UnknownType`] for unregistered names.
    pub fn type_index(&self, name: &str) -> Result<usize> {
        self.type_lookup
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::UnknownType {
                name: name.to_owned(),
            })
    }

    /// Number of levels, including the data level.
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of nodes at `level` across all types.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] when the level does not exist.
    pub fn num_nodes_at_level(&self, level: usize) -> Result<usize> {
        Ok(self.level_slots(level)?.iter().map(Vec::len).sum())
    }

    /// Number of nodes of one type at `level`.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] or
    /// [`NetworkError::UnknownType`] on bad coordinates.
    pub fn num_nodes_of_type_at_level(&self, type_name: &str, level: usize) -> Result<usize> {
        let type_index = self.type_index(type_name)?;
        Ok(self.level_slots(level)?[type_index].len())
    }

    /// Borrow of the node behind `key`.
    ///
    /// # Panics
    /// Panics when `key` names a deleted block; handles returned by the
    /// public API are live until the block is pruned or its level deleted.
    #[must_use]
    pub fn node(&self, key: NodeKey) -> &Node {
        self.slots[key.index()]
            .as_ref()
            .expect("node handle must name a live node")
    }

    /// Borrow of the node behind `key`, or `None` for deleted blocks.
    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.slots.get(key.index()).and_then(Option::as_ref)
    }

    /// Looks up a node by id at a level.
    ///
    /// # Errors
    /// Returns [`NetworkError::UnknownNode`] on a miss.
    pub fn find_node(&self, id: &str, level: usize) -> Result<NodeKey> {
        self.index
            .get(&(level, id.to_owned()))
            .copied()
            .ok_or_else(|| NetworkError::UnknownNode {
                id: id.to_owned(),
                level,
            })
    }

    /// Handles of every node of one type at a level, in insertion order.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] or
    /// [`NetworkError::UnknownType`] on bad coordinates.
    pub fn nodes_of_type_at_level(&self, type_name: &str, level: usize) -> Result<Vec<NodeKey>> {
        let type_index = self.type_index(type_name)?;
        Ok(self.level_slots(level)?[type_index].clone())
    }

    /// Handles of every node at a level, across types.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] when the level does not exist.
    pub fn nodes_at_level(&self, level: usize) -> Result<Vec<NodeKey>> {
        Ok(self.level_slots(level)?.iter().flatten().copied().collect())
    }

    // =========================================================================
    // Modification
    // =========================================================================

    /// Adds a data node (`level == 0`) or block to the network.
    ///
    /// A duplicate `(id, level)` is a non-fatal warning; the existing handle
    /// is returned and the insertion is skipped. Adding at
    /// `level == num_levels()` appends a fresh level first.
    ///
    /// # Errors
    /// Returns [`NetworkError::UnknownType`] for unregistered type names and
    /// [`NetworkError::LevelOutOfRange`] when `level > num_levels()`.
    pub fn add_node(&mut self, id: &str, type_name: &str, level: usize) -> Result<NodeKey> {
        let type_index = self.type_index(type_name)?;
        if level > self.num_levels() {
            return Err(NetworkError::LevelOutOfRange {
                level,
                num_levels: self.num_levels(),
            });
        }
        if level == self.num_levels() {
            self.build_level();
        }
        if let Some(&existing) = self.index.get(&(level, id.to_owned())) {
            warn!(id, level, "duplicate node id ignored; keeping the first");
            return Ok(existing);
        }
        Ok(self.insert_node(id.to_owned(), type_index, level))
    }

    /// Connects two data nodes by id. Multi-edges and self-edges are allowed.
    ///
    /// # Errors
    /// Returns [`NetworkError::UnknownNode`] when either id is missing at
    /// level 0 and [`NetworkError::ForbiddenEdgeType`] when an edge-type
    /// whitelist is present and excludes this pair of types.
    pub fn add_edge(&mut self, id_a: &str, id_b: &str) -> Result<()> {
        let a = self.find_node(id_a, 0)?;
        let b = self.find_node(id_b, 0)?;
        let type_a = self.node(a).node_type();
        let type_b = self.node(b).node_type();
        if let Some(allowed) = &self.allowed_edges {
            if !allowed.contains(&(type_a, type_b)) {
                return Err(NetworkError::ForbiddenEdgeType {
                    from: self.types[type_a].clone(),
                    to: self.types[type_b].clone(),
                });
            }
        }
        self.connect(a, b)
    }

    /// Enables the edge-type whitelist and allows every `(from, to)` pair in
    /// the cross product, in both orientations.
    ///
    /// # Errors
    /// Returns [`NetworkError::UnknownType`] for unregistered names.
    pub fn add_edge_types(&mut self, from_types: &[&str], to_types: &[&str]) -> Result<()> {
        let mut pairs = Vec::with_capacity(from_types.len() * to_types.len());
        for from in from_types {
            for to in to_types {
                pairs.push((self.type_index(from)?, self.type_index(to)?));
            }
        }
        let allowed = self.allowed_edges.get_or_insert_with(FxHashSet::default);
        for (from, to) in pairs {
            allowed.insert((from, to));
            allowed.insert((to, from));
        }
        Ok(())
    }

    /// Appends an empty level and returns its index.
    pub fn build_level(&mut self) -> usize {
        self.levels.push(vec![Vec::new(); self.num_types()]);
        self.levels.len() - 1
    }

    /// Removes the top block level, detaching its children.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] when only the data level
    /// remains.
    pub fn delete_block_level(&mut self) -> Result<()> {
        if self.num_levels() == 1 {
            return Err(NetworkError::LevelOutOfRange {
                level: 1,
                num_levels: 1,
            });
        }
        let top = self
            .levels
            .pop()
            .expect("network always has at least one level");
        for key in top.into_iter().flatten() {
            let node = self.node_mut(key);
            let id = node.id().to_owned();
            let children: Vec<NodeKey> = node.children().collect();
            let level = node.level();
            for child in children {
                self.node_mut(child).set_parent_link(None);
            }
            self.index.remove(&(level, id));
            self.slots[key.index()] = None;
        }
        Ok(())
    }

    /// Removes every block level, keeping only the data nodes.
    pub fn delete_all_blocks(&mut self) {
        while self.num_levels() > 1 {
            self.delete_block_level()
                .expect("block levels above the data level can always be deleted");
        }
    }

    /// Builds a block level above `level` and partitions each type's nodes.
    ///
    /// `num_blocks == None` gives every node its own block (the identity
    /// partition, in insertion order). Otherwise children are shuffled and
    /// dealt round-robin over `num_blocks` fresh blocks per type.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] unless `level` is the
    /// current top level, and [`NetworkError::TooManyBlocks`] when a
    /// populated type has fewer children than requested blocks (or a zero
    /// request).
    pub fn initialize_blocks(&mut self, num_blocks: Option<usize>, level: usize) -> Result<()> {
        if level + 1 != self.num_levels() {
            return Err(NetworkError::LevelOutOfRange {
                level,
                num_levels: self.num_levels(),
            });
        }
        // Validate every type before touching the level stack so a failure
        // leaves the network unchanged.
        for type_index in 0..self.num_types() {
            let available = self.levels[level][type_index].len();
            let requested = num_blocks.unwrap_or(available);
            if requested > available || (requested == 0 && available > 0) {
                return Err(NetworkError::TooManyBlocks {
                    requested,
                    available,
                    node_type: self.types[type_index].clone(),
                });
            }
        }

        let block_level = self.build_level();
        for type_index in 0..self.num_types() {
            let mut children = self.levels[level][type_index].clone();
            let count = num_blocks.unwrap_or(children.len());
            if count == 0 {
                continue;
            }
            let blocks: Vec<NodeKey> = (0..count)
                .map(|_| self.create_block(type_index, block_level))
                .collect();
            if num_blocks.is_some() {
                self.sampler.shuffle(&mut children);
            }
            for (position, child) in children.into_iter().enumerate() {
                self.set_parent(child, blocks[position % count])?;
            }
        }
        Ok(())
    }

    /// Detaches and deletes every childless block, scanning levels bottom-up
    /// so cascades clear in a single call. Returns the removed block ids.
    /// Idempotent.
    pub fn prune_empty_blocks(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        for level in 1..self.num_levels() {
            for type_index in 0..self.num_types() {
                let empties: Vec<NodeKey> = self.levels[level][type_index]
                    .iter()
                    .copied()
                    .filter(|&key| self.node(key).is_childless())
                    .collect();
                if empties.is_empty() {
                    continue;
                }
                let empty_set: FxHashSet<NodeKey> = empties.iter().copied().collect();
                self.levels[level][type_index].retain(|key| !empty_set.contains(key));
                for key in empties {
                    let node = self.node(key);
                    debug_assert_eq!(node.degree(), 0, "childless block must have no edges");
                    let id = node.id().to_owned();
                    if let Some(parent) = node.parent() {
                        self.node_mut(parent).remove_child(key);
                    }
                    self.index.remove(&(level, id.clone()));
                    self.slots[key.index()] = None;
                    removed.push(id);
                }
            }
        }
        removed
    }

    // =========================================================================
    // Internal plumbing
    // =========================================================================

    pub(crate) fn keys_of_type_at_level(&self, type_index: usize, level: usize) -> &[NodeKey] {
        &self.levels[level][type_index]
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> &mut Node {
        self.slots[key.index()]
            .as_mut()
            .expect("node handle must name a live node")
    }

    pub(crate) fn sampler_mut(&mut self) -> &mut Sampler {
        &mut self.sampler
    }

    /// Creates a block with a generated `"{type}-{level}_{n}"` id.
    pub(crate) fn create_block(&mut self, type_index: usize, level: usize) -> NodeKey {
        let id = format!("{type_index}-{level}_{}", self.block_counter);
        self.block_counter += 1;
        self.insert_node(id, type_index, level)
    }

    fn insert_node(&mut self, id: String, type_index: usize, level: usize) -> NodeKey {
        let key = NodeKey::new(self.slots.len());
        self.slots.push(Some(Node::new(
            id.clone(),
            level,
            type_index,
            self.num_types(),
        )));
        self.levels[level][type_index].push(key);
        self.index.insert((level, id), key);
        key
    }

    fn level_slots(&self, level: usize) -> Result<&Vec<Vec<NodeKey>>> {
        self.levels
            .get(level)
            .ok_or(NetworkError::LevelOutOfRange {
                level,
                num_levels: self.levels.len(),
            })
    }
}
