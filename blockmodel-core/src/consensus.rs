//! Pair-consensus bookkeeping for MCMC sweeps.
//!
//! Tracks, for unordered pairs of swept nodes, whether the pair currently
//! shares a block and how many sweeps ended with them co-resident. Only
//! pairs involving a moved node and a member of the departed or arriving
//! block can change state, so the per-move update is local.

use fxhash::FxHashMap;

use crate::{
    error::Result,
    network::{Network, NodeKey},
};

#[derive(Clone, Copy, Debug, Default)]
struct PairStatus {
    connected: bool,
    times_connected: u32,
}

/// Consensus tally for one unordered node pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PairCount {
    /// The two node ids, lexicographically ordered.
    pub pair: (String, String),
    /// Number of sweeps that ended with the pair sharing a block.
    pub times_connected: u32,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PairConsensus {
    statuses: FxHashMap<(NodeKey, NodeKey), PairStatus>,
}

fn pair_key(a: NodeKey, b: NodeKey) -> (NodeKey, NodeKey) {
    if a <= b { (a, b) } else { (b, a) }
}

impl PairConsensus {
    /// Seeds the tracker with every currently co-resident pair at `level`.
    pub(crate) fn initialize(network: &Network, level: usize) -> Result<Self> {
        let mut statuses = FxHashMap::default();
        for block in network.nodes_at_level(level + 1)? {
            let members: Vec<NodeKey> = network.node(block).children().collect();
            for (index, &left) in members.iter().enumerate() {
                for &right in &members[index + 1..] {
                    statuses.insert(
                        pair_key(left, right),
                        PairStatus {
                            connected: true,
                            times_connected: 0,
                        },
                    );
                }
            }
        }
        Ok(Self { statuses })
    }

    /// Applies one accepted move: pairs with the departed block's members
    /// disconnect, pairs with the arriving block's members connect.
    pub(crate) fn record_move(&mut self, node: NodeKey, former: &[NodeKey], incoming: &[NodeKey]) {
        for &member in former {
            self.statuses
                .entry(pair_key(node, member))
                .or_default()
                .connected = false;
        }
        for &member in incoming {
            self.statuses
                .entry(pair_key(node, member))
                .or_default()
                .connected = true;
        }
    }

    /// Credits every currently connected pair with one sweep. Called once
    /// per sweep, after all of that sweep's flips.
    pub(crate) fn tally_sweep(&mut self) {
        for status in self.statuses.values_mut() {
            if status.connected {
                status.times_connected += 1;
            }
        }
    }

    #[cfg(test)]
    fn is_connected(&self, a: NodeKey, b: NodeKey) -> bool {
        self.statuses
            .get(&pair_key(a, b))
            .is_some_and(|status| status.connected)
    }

    /// Converts the tracker into reportable rows, sorted by pair ids.
    pub(crate) fn into_counts(self, network: &Network) -> Vec<PairCount> {
        let mut counts: Vec<PairCount> = self
            .statuses
            .into_iter()
            .map(|((left, right), status)| {
                let mut ids = (
                    network.node(left).id().to_owned(),
                    network.node(right).id().to_owned(),
                );
                if ids.1 < ids.0 {
                    ids = (ids.1, ids.0);
                }
                PairCount {
                    pair: ids,
                    times_connected: status.times_connected,
                }
            })
            .collect();
        counts.sort_by(|a, b| a.pair.cmp(&b.pair));
        counts
    }
}
