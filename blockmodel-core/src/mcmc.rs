//! The Metropolis–Hastings sweep driver.
//!
//! A sweep visits every node at the target level once, in an order freshly
//! shuffled by the network's sampler, giving each a chance to change block.
//! Sweeps are strictly sequential: each accepted move reshapes the
//! proposal landscape for the nodes after it.

use tracing::{debug, instrument};

use crate::{
    consensus::{PairConsensus, PairCount},
    error::{NetworkError, Result},
    network::{Network, NodeKey},
};

/// Configuration for [`Network::mcmc_sweep`].
#[derive(Clone, Debug)]
pub struct SweepOptions {
    /// Number of consecutive sweeps to run.
    pub num_sweeps: usize,
    /// Ergodicity parameter ε of the move proposer.
    pub eps: f64,
    /// Extend each proposal's block set with a fresh empty block, letting
    /// the chain change the number of blocks; empty blocks are pruned as
    /// proposals resolve.
    pub variable_num_blocks: bool,
    /// Accumulate a pair-consensus table across the sweeps.
    pub track_pairs: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            num_sweeps: 1,
            eps: 0.1,
            variable_num_blocks: false,
            track_pairs: false,
        }
    }
}

impl SweepOptions {
    /// Overrides the number of sweeps.
    #[must_use]
    pub fn with_num_sweeps(mut self, num_sweeps: usize) -> Self {
        self.num_sweeps = num_sweeps;
        self
    }

    /// Overrides the ergodicity parameter.
    #[must_use]
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Enables or disables variable block counts.
    #[must_use]
    pub fn with_variable_num_blocks(mut self, enabled: bool) -> Self {
        self.variable_num_blocks = enabled;
        self
    }

    /// Enables or disables pair-consensus tracking.
    #[must_use]
    pub fn with_track_pairs(mut self, enabled: bool) -> Self {
        self.track_pairs = enabled;
        self
    }
}

/// Summary of one sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepInfo {
    /// Sum of the entropy deltas of the sweep's accepted moves.
    pub entropy_delta: f64,
    /// Number of nodes that changed block during the sweep.
    pub num_nodes_moved: usize,
}

/// Results of a [`Network::mcmc_sweep`] run.
#[derive(Clone, Debug, Default)]
pub struct SweepResults {
    /// Ids of moved nodes, in move order across all sweeps.
    pub nodes_moved: Vec<String>,
    /// One summary per sweep.
    pub sweeps: Vec<SweepInfo>,
    /// Pair-consensus table, present when tracking was requested.
    pub pairing_counts: Option<Vec<PairCount>>,
}

impl SweepResults {
    /// Total number of accepted moves across all sweeps.
    #[must_use]
    pub fn total_moved(&self) -> usize {
        self.sweeps.iter().map(|info| info.num_nodes_moved).sum()
    }

    /// Total entropy change across all sweeps.
    #[must_use]
    pub fn total_entropy_delta(&self) -> f64 {
        self.sweeps.iter().map(|info| info.entropy_delta).sum()
    }
}

impl Network {
    /// Runs `options.num_sweeps` Metropolis–Hastings sweeps over the nodes
    /// at `level`.
    ///
    /// # Errors
    /// Returns [`NetworkError::StateUnavailable`] when no block level exists
    /// above `level`, and propagates proposal and bookkeeping failures.
    #[instrument(
        name = "mcmc.sweep",
        skip(self, options),
        fields(
            level,
            num_sweeps = options.num_sweeps,
            eps = options.eps,
            variable = options.variable_num_blocks,
        ),
    )]
    pub fn mcmc_sweep(&mut self, level: usize, options: &SweepOptions) -> Result<SweepResults> {
        let block_level = level + 1;
        if block_level >= self.num_levels() {
            return Err(NetworkError::StateUnavailable { level });
        }

        let mut consensus = if options.track_pairs {
            Some(PairConsensus::initialize(self, level)?)
        } else {
            None
        };
        let mut results = SweepResults::default();

        for sweep in 0..options.num_sweeps {
            let mut order = self.nodes_at_level(level)?;
            self.sampler_mut().shuffle(&mut order);

            let mut moved = 0_usize;
            let mut delta_sum = 0.0_f64;
            for node in order {
                // A block swept at level >= 1 can be emptied and pruned by an
                // earlier move in the same sweep.
                if self.get(node).is_none() {
                    continue;
                }
                if options.variable_num_blocks {
                    let node_type = self.node(node).node_type();
                    self.create_block(node_type, block_level);
                }
                let proposal = self.propose_move(node, options.eps)?;
                let current =
                    self.node(node)
                        .parent()
                        .ok_or_else(|| NetworkError::NoSuchAncestor {
                            id: self.node(node).id().to_owned(),
                            level,
                            requested: block_level,
                        })?;
                if proposal == current {
                    if options.variable_num_blocks {
                        self.prune_empty_blocks();
                    }
                    continue;
                }

                let former: Vec<NodeKey> = if consensus.is_some() {
                    self.node(current)
                        .children()
                        .filter(|&member| member != node)
                        .collect()
                } else {
                    Vec::new()
                };

                let outcome = self.decide(node, proposal, options.eps, true)?;
                if outcome.accepted {
                    moved += 1;
                    delta_sum += outcome.entropy_delta;
                    results.nodes_moved.push(self.node(node).id().to_owned());
                    if let Some(tracker) = consensus.as_mut() {
                        let incoming: Vec<NodeKey> = self
                            .node(proposal)
                            .children()
                            .filter(|&member| member != node)
                            .collect();
                        tracker.record_move(node, &former, &incoming);
                    }
                }
                if options.variable_num_blocks {
                    self.prune_empty_blocks();
                }
            }

            if let Some(tracker) = consensus.as_mut() {
                tracker.tally_sweep();
            }
            debug!(sweep, moved, delta = delta_sum, "sweep complete");
            results.sweeps.push(SweepInfo {
                entropy_delta: delta_sum,
                num_nodes_moved: moved,
            });
        }

        results.pairing_counts = consensus.map(|tracker| tracker.into_counts(self));
        Ok(results)
    }
}
