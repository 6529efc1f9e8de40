//! Degree-corrected hierarchical stochastic block model inference.
//!
//! The crate fits block (community) structure to multi-type networks by
//! combining agglomerative block merging with Metropolis–Hastings sweeps
//! that optimize a degree-corrected microcanonical entropy.
//!
//! The central type is [`Network`]: a multi-level container of typed nodes
//! where level 0 holds the observed graph and each level above holds a
//! blocking of the level below. Reassigning a node with
//! [`Network::set_parent`] keeps every ancestor's edge tallies and degree
//! consistent incrementally, which is what makes the per-move entropy delta
//! of [`Network::decide`] cheap to evaluate inside the samplers.
//!
//! A typical fit builds the graph with [`Network::add_node`] /
//! [`Network::add_edge`], then calls [`Network::collapse_blocks`] to drive
//! the number of blocks down to a target, optionally polishing with
//! [`Network::mcmc_sweep`].
//!
//! All randomness flows through a single seeded [`Sampler`] owned by the
//! network, so runs are reproducible; there is no global generator state.

mod consensus;
mod entropy;
mod error;
mod mcmc;
mod merge;
mod network;
mod partition;
mod proposal;
mod sampler;

pub use crate::{
    consensus::PairCount,
    entropy::{BlockEdgeCount, NodeEdgeCount, partial_entropy},
    error::{
        NetworkError, NetworkErrorCode, Result, SamplerError, SamplerErrorCode,
    },
    mcmc::{SweepInfo, SweepOptions, SweepResults},
    merge::{CollapseOptions, CollapseStep, MergeOptions, MergeStep},
    network::{NO_PARENT, Network, Node, NodeKey, StateDump, StateRow},
    partition::{
        PartitionAgreement, PartitionError, adjusted_rand_index, normalized_mutual_information,
        partition_agreement,
    },
    proposal::ProposalOutcome,
    sampler::Sampler,
};
