//! Degree-corrected microcanonical entropy of a blocking.
//!
//! The model entropy at level `L` is the description length
//!
//! ```text
//! S(L) = -( E + Σ_k N_k·ln k! + ½·Σ_{r,s} h(e_rs, d_r, d_s) )
//! ```
//!
//! where `E` is the total number of leaf edges, `N_k` counts level-`L` nodes
//! of degree `k`, the symmetric sum runs over ordered pairs of blocks at
//! `L + 1`, and diagonal counts carry the doubled convention (each intra-pair
//! edge appears from both endpoints, each self-edge twice). The per-block
//! gathers produce exactly that ordered sum, so no correction terms are
//! needed beyond the global ½.

use fxhash::FxHashMap;

use crate::{
    error::{NetworkError, Result},
    network::{Network, NodeKey},
};

/// Per-block-pair entropy contribution `e·ln(e / (d_r·d_s))`.
///
/// Zero when the edge count or either degree is zero, matching the
/// `0·ln 0 = 0` convention of the microcanonical description length.
#[must_use]
pub fn partial_entropy(edges: f64, degree_r: f64, degree_s: f64) -> f64 {
    if edges <= 0.0 || degree_r <= 0.0 || degree_s <= 0.0 {
        return 0.0;
    }
    edges * (edges / (degree_r * degree_s)).ln()
}

/// `ln k!` via the log-gamma function.
#[must_use]
pub(crate) fn ln_factorial(k: usize) -> f64 {
    libm::lgamma(k as f64 + 1.0)
}

/// Edge count between one unordered pair of blocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockEdgeCount {
    /// First block id of the unordered pair.
    pub block_a: String,
    /// Second block id of the unordered pair (equal to `block_a` on the
    /// diagonal).
    pub block_b: String,
    /// Number of leaf edges with one endpoint under each block; diagonal
    /// entries count intra-block edges (and self-edges) once each.
    pub count: usize,
}

/// Edge count from one node to a single block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeEdgeCount {
    /// Block id the edges lead to.
    pub id: String,
    /// Number of the node's neighbour entries mapping to that block.
    pub count: usize,
}

impl Network {
    /// Computes the model entropy at `level`.
    ///
    /// # Errors
    /// Returns [`NetworkError::StateUnavailable`] when no block level exists
    /// above `level`, and [`NetworkError::NoSuchAncestor`] when some leaf is
    /// not assigned all the way up to the block level.
    pub fn entropy(&self, level: usize) -> Result<f64> {
        let block_level = level + 1;
        if block_level >= self.num_levels() {
            return Err(NetworkError::StateUnavailable { level });
        }

        let leaf_degree_sum: usize = self
            .nodes_at_level(0)?
            .into_iter()
            .map(|key| self.node(key).degree())
            .sum();
        let total_edges = (leaf_degree_sum / 2) as f64;

        let degree_term: f64 = self
            .nodes_at_level(level)?
            .into_iter()
            .map(|key| ln_factorial(self.node(key).degree()))
            .sum();

        let mut pair_term = 0.0_f64;
        for block in self.nodes_at_level(block_level)? {
            let block_degree = self.node(block).degree() as f64;
            for (peer, edges) in self.gather_neighbour_blocks(block, block_level)? {
                let peer_degree = self.node(peer).degree() as f64;
                pair_term += partial_entropy(edges as f64, block_degree, peer_degree);
            }
        }

        Ok(-(total_edges + degree_term + 0.5 * pair_term))
    }

    /// Edge counts between every unordered pair of blocks at `level`.
    ///
    /// Off-diagonal raw tallies appear once from each side and are halved by
    /// counting from the lexicographically smaller handle only; diagonal
    /// tallies arrive doubled and are halved directly.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] unless `level` names an
    /// existing block level, and [`NetworkError::NoSuchAncestor`] when some
    /// leaf is not assigned up to `level`.
    pub fn block_edge_counts(&self, level: usize) -> Result<Vec<BlockEdgeCount>> {
        if level == 0 || level >= self.num_levels() {
            return Err(NetworkError::LevelOutOfRange {
                level,
                num_levels: self.num_levels(),
            });
        }
        let mut tally: FxHashMap<(NodeKey, NodeKey), usize> = FxHashMap::default();
        for block in self.nodes_at_level(level)? {
            for (peer, edges) in self.gather_neighbour_blocks(block, level)? {
                if block == peer {
                    tally.insert((block, block), edges / 2);
                } else if block < peer {
                    tally.insert((block, peer), edges);
                }
            }
        }
        Ok(tally
            .into_iter()
            .map(|((a, b), count)| BlockEdgeCount {
                block_a: self.node(a).id().to_owned(),
                block_b: self.node(b).id().to_owned(),
                count,
            })
            .collect())
    }

    /// Edge counts from the node `id` at `node_level` to every block at
    /// `connections_level` it touches.
    ///
    /// # Errors
    /// Returns [`NetworkError::UnknownNode`] on a lookup miss and
    /// [`NetworkError::NoSuchAncestor`] when some neighbour is not assigned
    /// up to `connections_level`.
    pub fn node_edge_counts(
        &self,
        id: &str,
        node_level: usize,
        connections_level: usize,
    ) -> Result<Vec<NodeEdgeCount>> {
        let key = self.find_node(id, node_level)?;
        Ok(self
            .gather_neighbour_blocks(key, connections_level)?
            .into_iter()
            .map(|(block, count)| NodeEdgeCount {
                id: self.node(block).id().to_owned(),
                count,
            })
            .collect())
    }
}
