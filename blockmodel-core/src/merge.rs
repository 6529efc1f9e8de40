//! Agglomerative block merging and the collapse driver.
//!
//! A merge step temporarily isolates every block under its own meta-block,
//! scores candidate absorptions with the same delta engine the MCMC uses,
//! and applies the best non-conflicting merges from a priority queue. The
//! collapse driver repeats merge steps, optionally interleaved with
//! equilibration sweeps, until the block count reaches a target.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fxhash::FxHashSet;
use tracing::{debug, instrument, warn};

use crate::{
    error::{NetworkError, Result},
    mcmc::SweepOptions,
    network::{Network, NodeKey, StateDump},
};

/// Configuration for [`Network::agglomerative_merge`].
#[derive(Clone, Debug)]
pub struct MergeOptions {
    /// Maximum number of absorptions to apply in the step.
    pub num_merges: usize,
    /// Proposer draws per block when not scoring greedily.
    pub num_checks_per_block: usize,
    /// Ergodicity parameter ε for sampled candidate draws.
    pub eps: f64,
    /// Score every same-type peer instead of sampling candidates.
    pub greedy: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            num_merges: 1,
            num_checks_per_block: 5,
            eps: 0.1,
            greedy: false,
        }
    }
}

/// Result of one merge step.
#[derive(Clone, Debug)]
pub struct MergeStep {
    /// Sum of the scored deltas of the applied absorptions.
    pub entropy_delta: f64,
    /// Model entropy below the merged level, recomputed after the step.
    pub entropy: f64,
    /// Applied absorptions as `(absorbed_id, surviving_id)` pairs.
    pub merges: Vec<(String, String)>,
    /// Blocks remaining at the merged level after pruning.
    pub num_blocks: usize,
}

/// Configuration for [`Network::collapse_blocks`] and
/// [`Network::collapse_run`].
#[derive(Clone, Debug)]
pub struct CollapseOptions {
    /// Equilibration sweeps between merge steps; 0 disables MCMC entirely.
    pub num_mcmc_sweeps: usize,
    /// Stop once the total block count is at or below this.
    pub target_num_blocks: usize,
    /// Proposer draws per block when not scoring greedily.
    pub num_checks_per_block: usize,
    /// Collapse rate σ: each step keeps roughly `B/σ` blocks.
    pub sigma: f64,
    /// Ergodicity parameter ε shared by merge scoring and sweeps.
    pub eps: f64,
    /// Score every same-type peer instead of sampling candidates.
    pub greedy: bool,
    /// Record a step report after every merge, not just at the end.
    pub report_all_steps: bool,
}

impl Default for CollapseOptions {
    fn default() -> Self {
        Self {
            num_mcmc_sweeps: 0,
            target_num_blocks: 1,
            num_checks_per_block: 5,
            sigma: 2.0,
            eps: 0.1,
            greedy: false,
            report_all_steps: false,
        }
    }
}

/// One recorded point of a collapse run.
#[derive(Clone, Debug)]
pub struct CollapseStep {
    /// Sum of the scored deltas of the step's absorptions.
    pub entropy_delta: f64,
    /// Model entropy at the collapsed node level.
    pub entropy: f64,
    /// Full assignment snapshot at this point.
    pub state: StateDump,
    /// Blocks remaining above the node level.
    pub num_blocks: usize,
}

/// Queue entry ranking a candidate absorption; orders by delta, with the
/// handles as deterministic tie-breakers.
#[derive(Clone, Copy, Debug)]
struct ScoredMerge {
    delta: f64,
    from: NodeKey,
    into: NodeKey,
}

impl PartialEq for ScoredMerge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredMerge {}

impl PartialOrd for ScoredMerge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredMerge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.delta
            .total_cmp(&other.delta)
            .then_with(|| self.from.cmp(&other.from))
            .then_with(|| self.into.cmp(&other.into))
    }
}

impl Network {
    /// Runs one agglomerative merge step over the blocks at `block_level`.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] unless `block_level` is the
    /// top block level, [`NetworkError::InsufficientBlocks`] when a populated
    /// type has fewer than two blocks, and propagates scoring failures.
    #[instrument(
        name = "merge.step",
        skip(self, options),
        fields(block_level, num_merges = options.num_merges, greedy = options.greedy),
    )]
    pub fn agglomerative_merge(
        &mut self,
        block_level: usize,
        options: &MergeOptions,
    ) -> Result<MergeStep> {
        if block_level == 0 || block_level + 1 != self.num_levels() {
            return Err(NetworkError::LevelOutOfRange {
                level: block_level,
                num_levels: self.num_levels(),
            });
        }
        for type_index in 0..self.num_types() {
            let found = self.keys_of_type_at_level(type_index, block_level).len();
            let populated = !self.keys_of_type_at_level(type_index, block_level - 1).is_empty();
            if populated && found < 2 {
                return Err(NetworkError::InsufficientBlocks {
                    node_type: self.type_name(type_index).to_owned(),
                    found,
                });
            }
        }

        // Isolate every block under its own meta-block so absorptions can be
        // scored as ordinary reassignments one level up.
        self.initialize_blocks(None, block_level)?;
        let meta_level = block_level + 1;

        let mut queue: BinaryHeap<std::cmp::Reverse<ScoredMerge>> = BinaryHeap::new();
        for type_index in 0..self.num_types() {
            let blocks: Vec<NodeKey> = self.keys_of_type_at_level(type_index, block_level).to_vec();
            let metas: Vec<NodeKey> = self.keys_of_type_at_level(type_index, meta_level).to_vec();
            for &block in &blocks {
                let own_meta = self
                    .node(block)
                    .parent()
                    .expect("identity partition assigns every block a meta-block");
                let mut candidates: FxHashSet<NodeKey> = FxHashSet::default();
                if options.greedy {
                    candidates.extend(metas.iter().copied().filter(|&meta| meta != own_meta));
                } else {
                    for _ in 0..options.num_checks_per_block {
                        let candidate = self.propose_move(block, options.eps)?;
                        if candidate != own_meta {
                            candidates.insert(candidate);
                        }
                    }
                }
                for meta in candidates {
                    let target = self
                        .node(meta)
                        .children()
                        .next()
                        .expect("pre-merge meta-blocks hold exactly one block");
                    let outcome = self.decide(block, meta, options.eps, false)?;
                    queue.push(std::cmp::Reverse(ScoredMerge {
                        delta: outcome.entropy_delta,
                        from: block,
                        into: target,
                    }));
                }
            }
        }

        let mut absorbed: FxHashSet<NodeKey> = FxHashSet::default();
        let mut merges = Vec::new();
        let mut delta_sum = 0.0_f64;
        while merges.len() < options.num_merges {
            let Some(std::cmp::Reverse(best)) = queue.pop() else {
                break;
            };
            if absorbed.contains(&best.from) || absorbed.contains(&best.into) {
                continue;
            }
            let from_id = self.node(best.from).id().to_owned();
            let into_id = self.node(best.into).id().to_owned();
            let members: Vec<NodeKey> = self.node(best.from).children().collect();
            for member in members {
                self.set_parent(member, best.into)?;
            }
            absorbed.insert(best.from);
            delta_sum += best.delta;
            debug!(from = %from_id, into = %into_id, delta = best.delta, "merged blocks");
            merges.push((from_id, into_id));
        }

        self.prune_empty_blocks();
        self.delete_block_level()?;

        Ok(MergeStep {
            entropy_delta: delta_sum,
            entropy: self.entropy(block_level - 1)?,
            merges,
            num_blocks: self.num_nodes_at_level(block_level)?,
        })
    }

    /// Collapses the blocks above `node_level` down to
    /// `options.target_num_blocks`, interleaving merge steps with optional
    /// equilibration sweeps.
    ///
    /// When no block level exists yet, every node first receives its own
    /// block. The driver stops gracefully when merging runs out of
    /// candidates; a final step is always recorded.
    ///
    /// # Errors
    /// Returns [`NetworkError::LevelOutOfRange`] when deeper meta levels sit
    /// above the block level, and propagates sweep and scoring failures.
    #[instrument(
        name = "merge.collapse",
        skip(self, options),
        fields(
            node_level,
            target = options.target_num_blocks,
            sigma = options.sigma,
            sweeps = options.num_mcmc_sweeps,
        ),
    )]
    pub fn collapse_blocks(
        &mut self,
        node_level: usize,
        options: &CollapseOptions,
    ) -> Result<Vec<CollapseStep>> {
        let block_level = node_level + 1;
        if block_level == self.num_levels() {
            self.initialize_blocks(None, node_level)?;
        } else if block_level + 1 != self.num_levels() {
            return Err(NetworkError::LevelOutOfRange {
                level: block_level,
                num_levels: self.num_levels(),
            });
        }

        let mut steps = Vec::new();
        loop {
            let num_blocks = self.num_nodes_at_level(block_level)?;
            if num_blocks <= options.target_num_blocks {
                break;
            }
            let keep = (num_blocks as f64 / options.sigma).floor() as usize;
            let num_merges = num_blocks
                .saturating_sub(keep)
                .max(1)
                .min(num_blocks - options.target_num_blocks);
            let merge_options = MergeOptions {
                num_merges,
                num_checks_per_block: options.num_checks_per_block,
                eps: options.eps,
                greedy: options.greedy,
            };
            let step = match self.agglomerative_merge(block_level, &merge_options) {
                Ok(step) => step,
                Err(NetworkError::InsufficientBlocks { node_type, found }) => {
                    warn!(%node_type, found, "collapse exhausted; stopping early");
                    break;
                }
                Err(error) => return Err(error),
            };
            if step.merges.is_empty() {
                warn!("merge step applied nothing; stopping early");
                break;
            }
            if options.num_mcmc_sweeps > 0 {
                let sweep_options = SweepOptions {
                    num_sweeps: options.num_mcmc_sweeps,
                    eps: options.eps,
                    variable_num_blocks: false,
                    track_pairs: false,
                };
                self.mcmc_sweep(node_level, &sweep_options)?;
                self.prune_empty_blocks();
            }
            debug!(
                blocks = self.num_nodes_at_level(block_level)?,
                delta = step.entropy_delta,
                "collapse step complete"
            );
            if options.report_all_steps {
                steps.push(CollapseStep {
                    entropy_delta: step.entropy_delta,
                    entropy: self.entropy(node_level)?,
                    state: self.state()?,
                    num_blocks: self.num_nodes_at_level(block_level)?,
                });
            }
        }

        if !options.report_all_steps || steps.is_empty() {
            steps.push(CollapseStep {
                entropy_delta: 0.0,
                entropy: self.entropy(node_level)?,
                state: self.state()?,
                num_blocks: self.num_nodes_at_level(block_level)?,
            });
        }
        Ok(steps)
    }

    /// Collapses progressively through each target in `block_nums`,
    /// returning one final step per target (largest target first).
    ///
    /// # Errors
    /// Propagates [`Network::collapse_blocks`] failures.
    pub fn collapse_run(
        &mut self,
        node_level: usize,
        options: &CollapseOptions,
        block_nums: &[usize],
    ) -> Result<Vec<CollapseStep>> {
        let mut targets = block_nums.to_vec();
        targets.sort_unstable_by(|a, b| b.cmp(a));
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let stage_options = CollapseOptions {
                target_num_blocks: target,
                report_all_steps: false,
                ..options.clone()
            };
            let mut steps = self.collapse_blocks(node_level, &stage_options)?;
            if let Some(final_step) = steps.pop() {
                results.push(final_step);
            }
        }
        Ok(results)
    }
}
