//! Hierarchy mutation and traversal.
//!
//! `set_parent` is the single write path for block assignments: it detaches
//! the child from its old ancestor chain, subtracting the child's neighbour
//! multiset and degree from every ancestor, then folds both into the new
//! chain. Block degrees and neighbour tallies therefore stay O(1) to read
//! during the MCMC hot loop, at O(degree) cost per reassignment.

use fxhash::FxHashMap;

use crate::error::{NetworkError, Result};

use super::{Network, NodeKey};

impl Network {
    /// Connects two data nodes with an undirected edge.
    ///
    /// Multi-edges are repeated calls; `connect(a, a)` records a self-edge,
    /// which appears twice in the node's own neighbour list. New entries are
    /// propagated up any ancestor chains already in place.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelMismatch`] unless both nodes are at
    /// level 0.
    pub fn connect(&mut self, a: NodeKey, b: NodeKey) -> Result<()> {
        for key in [a, b] {
            let level = self.node(key).level();
            if level != 0 {
                return Err(NetworkError::LevelMismatch {
                    expected: 0,
                    found: level,
                });
            }
        }
        let type_a = self.node(a).node_type();
        let type_b = self.node(b).node_type();
        if a == b {
            self.record_endpoint(a, a, type_a, 2);
        } else {
            self.record_endpoint(a, b, type_b, 1);
            self.record_endpoint(b, a, type_a, 1);
        }
        Ok(())
    }

    /// Moves `child` under `new_parent`, updating neighbour lists and
    /// degrees along both ancestor chains. A no-op when the child is already
    /// under `new_parent`.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelMismatch`] unless the parent sits exactly
    /// one level above the child, and [`NetworkError::TypeMismatch`] when
    /// their types differ.
    pub fn set_parent(&mut self, child: NodeKey, new_parent: NodeKey) -> Result<()> {
        let child_level = self.node(child).level();
        let child_type = self.node(child).node_type();
        let child_degree = self.node(child).degree();
        let parent_level = self.node(new_parent).level();
        let parent_type = self.node(new_parent).node_type();
        if parent_level != child_level + 1 {
            return Err(NetworkError::LevelMismatch {
                expected: child_level + 1,
                found: parent_level,
            });
        }
        if parent_type != child_type {
            return Err(NetworkError::TypeMismatch {
                child_type: self.type_name(child_type).to_owned(),
                parent_type: self.type_name(parent_type).to_owned(),
            });
        }

        let old_parent = self.node(child).parent();
        if old_parent == Some(new_parent) {
            return Ok(());
        }

        let maps = self.node_mut(child).take_neighbour_maps();
        if let Some(old) = old_parent {
            self.node_mut(old).remove_child(child);
            let mut cursor = Some(old);
            while let Some(key) = cursor {
                let ancestor = self.node_mut(key);
                ancestor.remove_neighbour_mass(&maps, child_degree);
                cursor = ancestor.parent();
            }
        }
        self.node_mut(new_parent).insert_child(child);
        let mut cursor = Some(new_parent);
        while let Some(key) = cursor {
            let ancestor = self.node_mut(key);
            ancestor.add_neighbour_mass(&maps, child_degree);
            cursor = ancestor.parent();
        }
        let child_node = self.node_mut(child);
        child_node.restore_neighbour_maps(maps);
        child_node.set_parent_link(Some(new_parent));
        Ok(())
    }

    /// Id-based variant of [`Network::set_parent`], creating the parent
    /// block with the child's type when it does not exist yet.
    ///
    /// # Errors
    /// Returns [`NetworkError::UnknownNode`] when the child is missing and
    /// propagates [`Network::set_parent`] validation failures.
    pub fn set_parent_by_id(
        &mut self,
        child_id: &str,
        parent_id: &str,
        child_level: usize,
    ) -> Result<()> {
        let child = self.find_node(child_id, child_level)?;
        let parent_level = child_level + 1;
        let parent = match self.find_node(parent_id, parent_level) {
            Ok(existing) => existing,
            Err(_) => {
                let child_type = self.node(child).node_type();
                if parent_level == self.num_levels() {
                    self.build_level();
                }
                self.insert_node(parent_id.to_owned(), child_type, parent_level)
            }
        };
        self.set_parent(child, parent)
    }

    /// Walks parent links from `key` until reaching `level`.
    ///
    /// A node is its own ancestor at its own level.
    ///
    /// # Errors
    /// Returns [`NetworkError::NoSuchAncestor`] when `level` lies below the
    /// node or above the top of its chain.
    pub fn ancestor_at_level(&self, key: NodeKey, level: usize) -> Result<NodeKey> {
        let node = self.node(key);
        if level < node.level() {
            return Err(NetworkError::NoSuchAncestor {
                id: node.id().to_owned(),
                level: node.level(),
                requested: level,
            });
        }
        let mut current = key;
        while self.node(current).level() < level {
            current =
                self.node(current)
                    .parent()
                    .ok_or_else(|| NetworkError::NoSuchAncestor {
                        id: node.id().to_owned(),
                        level: node.level(),
                        requested: level,
                    })?;
        }
        Ok(current)
    }

    /// Tallies, for each distinct ancestor-at-`level` of this node's
    /// neighbours, how many neighbour entries map to it. The counts sum to
    /// the node's degree.
    ///
    /// # Errors
    /// Returns [`NetworkError::NoSuchAncestor`] when some neighbour has no
    /// ancestor at `level`.
    pub fn gather_neighbour_blocks(
        &self,
        key: NodeKey,
        level: usize,
    ) -> Result<FxHashMap<NodeKey, usize>> {
        let mut tally = FxHashMap::default();
        for map in self.node(key).neighbour_maps() {
            for (&leaf, &count) in map {
                let ancestor = self.ancestor_at_level(leaf, level)?;
                *tally.entry(ancestor).or_insert(0) += count;
            }
        }
        Ok(tally)
    }

    /// Draws a uniformly random entry from the node's neighbour multiset, or
    /// `None` for an isolated node.
    pub(crate) fn random_neighbour_entry(&mut self, key: NodeKey) -> Result<Option<NodeKey>> {
        let degree = self.node(key).degree();
        if degree == 0 {
            return Ok(None);
        }
        let target = self.sampler.int_in(degree)?;
        let mut seen = 0_usize;
        for map in self.node(key).neighbour_maps() {
            for (&leaf, &count) in map {
                seen += count;
                if target < seen {
                    return Ok(Some(leaf));
                }
            }
        }
        unreachable!("degree disagrees with the neighbour multiset");
    }

    /// Draws a uniformly random entry from the node's neighbour multiset
    /// restricted to `type_index`, or `None` when that list is empty.
    pub(crate) fn random_neighbour_entry_of_type(
        &mut self,
        key: NodeKey,
        type_index: usize,
    ) -> Result<Option<NodeKey>> {
        let total: usize = self.node(key).neighbours_of_type(type_index).values().sum();
        if total == 0 {
            return Ok(None);
        }
        let target = self.sampler.int_in(total)?;
        let mut seen = 0_usize;
        for (&leaf, &count) in self.node(key).neighbours_of_type(type_index) {
            seen += count;
            if target < seen {
                return Ok(Some(leaf));
            }
        }
        unreachable!("type tally disagrees with the neighbour multiset");
    }

    fn record_endpoint(
        &mut self,
        node: NodeKey,
        neighbour: NodeKey,
        neighbour_type: usize,
        count: usize,
    ) {
        let mut cursor = Some(node);
        while let Some(key) = cursor {
            let entry = self.node_mut(key);
            entry.add_neighbour(neighbour, neighbour_type, count);
            cursor = entry.parent();
        }
    }
}
