//! Move proposals and Metropolis–Hastings acceptance.
//!
//! `propose_move` draws a candidate block for a node with the
//! neighbour-biased kernel: follow a random edge to a neighbour, look at the
//! neighbour's block `t`, and either jump uniformly (with the ergodicity
//! probability `ε·B / (d_t + ε·B)`) or adopt the block behind a random one of
//! `t`'s own edges. `decide` scores the candidate by the exact change it
//! would cause to the model entropy, forms the detailed-balance acceptance
//! ratio, and applies the reassignment when the draw accepts.

use fxhash::FxHashSet;

use crate::{
    error::{NetworkError, Result},
    network::{Network, NodeKey},
};

use super::entropy::partial_entropy;

/// Report of one [`Network::decide`] evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProposalOutcome {
    /// Exact change to the model entropy if the move is applied.
    pub entropy_delta: f64,
    /// Metropolis–Hastings acceptance probability, clamped to at most 1.
    pub prob_accept: f64,
    /// Whether the move was drawn as accepted (and therefore applied).
    pub accepted: bool,
}

impl ProposalOutcome {
    const fn rejected_in_place() -> Self {
        Self {
            entropy_delta: 0.0,
            prob_accept: 0.0,
            accepted: false,
        }
    }
}

impl Network {
    /// Proposes a destination block at the node's parent level.
    ///
    /// Isolated nodes fall back to a uniformly random block of the node's
    /// type, as does the conditional branch when the intermediate block has
    /// no edges back into the node's type.
    ///
    /// # Errors
    /// Returns [`NetworkError::StateUnavailable`] when no block level exists
    /// above the node, [`NetworkError::Sampler`] when the node's type has no
    /// blocks at all, and [`NetworkError::NoSuchAncestor`] when a neighbour
    /// is not assigned up to the block level.
    pub fn propose_move(&mut self, node: NodeKey, eps: f64) -> Result<NodeKey> {
        let level = self.node(node).level();
        let node_type = self.node(node).node_type();
        let block_level = level + 1;
        if block_level >= self.num_levels() {
            return Err(NetworkError::StateUnavailable { level });
        }
        let blocks: Vec<NodeKey> = self.keys_of_type_at_level(node_type, block_level).to_vec();

        let Some(neighbour) = self.random_neighbour_entry(node)? else {
            return Ok(*self.sampler_mut().choose(&blocks)?);
        };
        let via = self.ancestor_at_level(neighbour, block_level)?;
        let via_degree = self.node(via).degree() as f64;
        let eps_blocks = eps * blocks.len() as f64;
        let p_random = eps_blocks / (via_degree + eps_blocks);
        if self.sampler_mut().uniform() < p_random {
            return Ok(*self.sampler_mut().choose(&blocks)?);
        }
        match self.random_neighbour_entry_of_type(via, node_type)? {
            Some(peer) => self.ancestor_at_level(peer, block_level),
            None => Ok(*self.sampler_mut().choose(&blocks)?),
        }
    }

    /// Scores moving `node` under `new_block` and, when `calc_accept` is
    /// set, draws the accept/reject decision and applies an accepted move.
    ///
    /// Proposing the node's current block reports a zero delta and no
    /// acceptance. The entropy delta is exact: it equals the difference of
    /// [`Network::entropy`] computed before and after the reassignment.
    ///
    /// # Errors
    /// Returns [`NetworkError::NoSuchAncestor`] when `node` has no parent,
    /// [`NetworkError::LevelMismatch`] / [`NetworkError::TypeMismatch`] when
    /// `new_block` is not a valid parent for `node`, and propagates
    /// bookkeeping failures from the gathers.
    pub fn decide(
        &mut self,
        node: NodeKey,
        new_block: NodeKey,
        eps: f64,
        calc_accept: bool,
    ) -> Result<ProposalOutcome> {
        let level = self.node(node).level();
        let block_level = level + 1;
        let node_type = self.node(node).node_type();
        let old_block = self
            .node(node)
            .parent()
            .ok_or_else(|| NetworkError::NoSuchAncestor {
                id: self.node(node).id().to_owned(),
                level,
                requested: block_level,
            })?;
        if old_block == new_block {
            return Ok(ProposalOutcome::rejected_in_place());
        }
        let target_level = self.node(new_block).level();
        if target_level != block_level {
            return Err(NetworkError::LevelMismatch {
                expected: block_level,
                found: target_level,
            });
        }
        let target_type = self.node(new_block).node_type();
        if target_type != node_type {
            return Err(NetworkError::TypeMismatch {
                child_type: self.type_name(node_type).to_owned(),
                parent_type: self.type_name(target_type).to_owned(),
            });
        }

        let degree = self.node(node).degree();
        let node_tally = self.gather_neighbour_blocks(node, block_level)?;
        let old_tally = self.gather_neighbour_blocks(old_block, block_level)?;
        let new_tally = self.gather_neighbour_blocks(new_block, block_level)?;
        // Edges from the mover into its own subtree (self-edges for a leaf,
        // intra-block edges for a block) stay internal on both sides of the
        // move and must not be counted as r--s traffic.
        let self_mass = self.self_edge_mass(node)?;

        let to_old = node_tally.get(&old_block).copied().unwrap_or(0);
        let to_new = node_tally.get(&new_block).copied().unwrap_or(0);
        let to_old_external = to_old - self_mass;

        let d_old = self.node(old_block).degree();
        let d_new = self.node(new_block).degree();
        let d_old_post = d_old - degree;
        let d_new_post = d_new + degree;

        // Pairs {old,t} and {new,t} for every block touching the trio, plus
        // the {old,new} pair and both diagonals, change; everything else is
        // untouched by the move.
        let mut peers: FxHashSet<NodeKey> = FxHashSet::default();
        peers.extend(node_tally.keys().copied());
        peers.extend(old_tally.keys().copied());
        peers.extend(new_tally.keys().copied());
        peers.remove(&old_block);
        peers.remove(&new_block);

        let mut pair_delta = 0.0_f64;
        for peer in peers {
            let d_peer = self.node(peer).degree() as f64;
            let via_node = node_tally.get(&peer).copied().unwrap_or(0);
            let e_old_pre = old_tally.get(&peer).copied().unwrap_or(0);
            let e_new_pre = new_tally.get(&peer).copied().unwrap_or(0);
            let e_old_post = e_old_pre - via_node;
            let e_new_post = e_new_pre + via_node;
            pair_delta += partial_entropy(e_old_post as f64, d_old_post as f64, d_peer)
                - partial_entropy(e_old_pre as f64, d_old as f64, d_peer);
            pair_delta += partial_entropy(e_new_post as f64, d_new_post as f64, d_peer)
                - partial_entropy(e_new_pre as f64, d_new as f64, d_peer);
        }

        let e_between_pre = old_tally.get(&new_block).copied().unwrap_or(0);
        let e_between_post = e_between_pre + to_old_external - to_new;
        pair_delta += partial_entropy(
            e_between_post as f64,
            d_old_post as f64,
            d_new_post as f64,
        ) - partial_entropy(e_between_pre as f64, d_old as f64, d_new as f64);

        let e_old_diag_pre = old_tally.get(&old_block).copied().unwrap_or(0);
        let e_old_diag_post = e_old_diag_pre - 2 * to_old_external - self_mass;
        pair_delta += 0.5
            * (partial_entropy(e_old_diag_post as f64, d_old_post as f64, d_old_post as f64)
                - partial_entropy(e_old_diag_pre as f64, d_old as f64, d_old as f64));

        let e_new_diag_pre = new_tally.get(&new_block).copied().unwrap_or(0);
        let e_new_diag_post = e_new_diag_pre + 2 * to_new + self_mass;
        pair_delta += 0.5
            * (partial_entropy(e_new_diag_post as f64, d_new_post as f64, d_new_post as f64)
                - partial_entropy(e_new_diag_pre as f64, d_new as f64, d_new as f64));

        let entropy_delta = -pair_delta;
        if !calc_accept {
            return Ok(ProposalOutcome {
                entropy_delta,
                prob_accept: 0.0,
                accepted: false,
            });
        }

        let block_count = self.keys_of_type_at_level(node_type, block_level).len();
        let eps_blocks = eps * block_count as f64;
        let mut p_move = 0.0_f64;
        let mut p_reverse = 0.0_f64;
        for (&peer, &via_node) in &node_tally {
            let fraction = via_node as f64 / degree as f64;
            let d_peer = self.node(peer).degree();
            let e_new_pre = new_tally.get(&peer).copied().unwrap_or(0);
            p_move += fraction * (e_new_pre as f64 + eps) / (d_peer as f64 + eps_blocks);

            let (e_old_post, d_peer_post) = if peer == old_block {
                (e_old_diag_post, d_old_post)
            } else if peer == new_block {
                (e_between_post, d_new_post)
            } else {
                (
                    old_tally.get(&peer).copied().unwrap_or(0) - via_node,
                    d_peer,
                )
            };
            p_reverse += fraction * (e_old_post as f64 + eps) / (d_peer_post as f64 + eps_blocks);
        }

        let ratio = if degree == 0 {
            // Isolated node: every assignment is equally likely either way.
            1.0
        } else if p_move > 0.0 {
            p_reverse / p_move
        } else {
            1.0
        };
        let prob_accept = ((-entropy_delta).exp() * ratio).min(1.0);
        let accepted = self.sampler_mut().uniform() < prob_accept;
        if accepted {
            self.set_parent(node, new_block)?;
        }
        Ok(ProposalOutcome {
            entropy_delta,
            prob_accept,
            accepted,
        })
    }

    /// Multiplicity of the node's neighbour entries that fall inside its own
    /// subtree.
    fn self_edge_mass(&self, node: NodeKey) -> Result<usize> {
        let level = self.node(node).level();
        let mut mass = 0_usize;
        for map in self.node(node).neighbour_maps() {
            for (&leaf, &count) in map {
                if self.ancestor_at_level(leaf, level)? == node {
                    mass += count;
                }
            }
        }
        Ok(mass)
    }
}
