//! Dumping and restoring block assignments.
//!
//! A dump is an ordered table of `(id, parent, type, level)` rows covering
//! every node in the network; parents of top-level nodes serialize as
//! `"none"`. The dump fully determines the hierarchy above the data layer
//! (edges are stored separately and are not part of it).

use tracing::warn;

use crate::error::{NetworkError, Result};

use super::Network;

/// Sentinel parent id for nodes at the top of their chain.
pub const NO_PARENT: &str = "none";

/// One assignment row of a [`StateDump`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateRow {
    /// Node id.
    pub id: String,
    /// Parent block id, or [`NO_PARENT`].
    pub parent: String,
    /// Type name.
    pub node_type: String,
    /// Hierarchy level of the node itself.
    pub level: usize,
}

/// Ordered snapshot of every node assignment in a network.
///
/// Rows are ordered by (level ascending, type ascending, id ascending), so
/// two dumps of identical hierarchies compare equal.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StateDump {
    rows: Vec<StateRow>,
}

impl StateDump {
    /// Builds a dump from pre-assembled rows (e.g. a parsed table).
    #[must_use]
    pub fn from_rows(rows: Vec<StateRow>) -> Self {
        Self { rows }
    }

    /// The assignment rows in dump order.
    #[must_use]
    pub fn rows(&self) -> &[StateRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dump holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Network {
    /// Exports the current assignment of every node.
    ///
    /// # Errors
    /// Returns [`NetworkError::StateUnavailable`] when no block level exists.
    pub fn state(&self) -> Result<StateDump> {
        if self.num_levels() == 1 {
            return Err(NetworkError::StateUnavailable { level: 0 });
        }
        let mut keyed: Vec<(usize, usize, String, String)> = Vec::new();
        for level in 0..self.num_levels() {
            for type_index in 0..self.num_types() {
                for &key in self.keys_of_type_at_level(type_index, level) {
                    let node = self.node(key);
                    let parent = node
                        .parent()
                        .map_or_else(|| NO_PARENT.to_owned(), |p| self.node(p).id().to_owned());
                    keyed.push((level, type_index, node.id().to_owned(), parent));
                }
            }
        }
        keyed.sort();
        let rows = keyed
            .into_iter()
            .map(|(level, type_index, id, parent)| StateRow {
                id,
                parent,
                node_type: self.type_name(type_index).to_owned(),
                level,
            })
            .collect();
        Ok(StateDump { rows })
    }

    /// Clears every block level and rebuilds the hierarchy from `dump`.
    ///
    /// Rows are applied child-level-first; parents are created implicitly
    /// the first time they are named. Unknown parents of top-level rows are
    /// harmless. Ends with a [`Network::prune_empty_blocks`] pass.
    ///
    /// # Errors
    /// Returns [`NetworkError::UnknownNode`] when a row names a child that
    /// does not exist (and was not created by a lower row),
    /// [`NetworkError::UnknownType`] for unregistered type names, and
    /// [`NetworkError::TypeMismatch`] when a row's type disagrees with the
    /// node it names.
    pub fn load_state(&mut self, dump: &StateDump) -> Result<()> {
        self.delete_all_blocks();

        let mut rows: Vec<&StateRow> = dump.rows().iter().collect();
        rows.sort_by_key(|row| row.level);

        for row in rows {
            let row_type = self.type_index(&row.node_type)?;
            if row.parent == NO_PARENT {
                // Top-of-chain marker; the node was either a leaf or already
                // created as some lower row's parent.
                if self.find_node(&row.id, row.level).is_err() {
                    warn!(id = %row.id, level = row.level, "top-level row names an unknown node");
                }
                continue;
            }
            let child = self.find_node(&row.id, row.level)?;
            let child_type = self.node(child).node_type();
            if child_type != row_type {
                return Err(NetworkError::TypeMismatch {
                    child_type: self.type_name(child_type).to_owned(),
                    parent_type: row.node_type.clone(),
                });
            }
            let parent_level = row.level + 1;
            let parent = match self.find_node(&row.parent, parent_level) {
                Ok(existing) => existing,
                Err(_) => {
                    if parent_level == self.num_levels() {
                        self.build_level();
                    }
                    self.insert_node(row.parent.clone(), child_type, parent_level)
                }
            };
            self.set_parent(child, parent)?;
        }

        self.prune_empty_blocks();
        Ok(())
    }
}
