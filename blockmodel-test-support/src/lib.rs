//! Shared test utilities for the blockmodel crates.

pub mod logging {
    //! One-shot tracing initialization for tests.

    use std::sync::Once;

    /// Installs a fmt subscriber writing through the test harness. Safe to
    /// call from every test; only the first call installs anything.
    pub fn init() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_max_level(tracing_subscriber::filter::LevelFilter::INFO)
                .with_test_writer()
                .try_init();
        });
    }
}

pub mod graphs {
    //! Seeded synthetic graphs with known community structure.
    //!
    //! Generators emit plain node-id and edge lists so they stay independent
    //! of any particular graph container; tests feed them into whatever they
    //! are exercising.

    use rand::{Rng, SeedableRng, rngs::SmallRng};

    /// A generated graph together with its ground-truth communities.
    #[derive(Clone, Debug)]
    pub struct PlantedPartition {
        /// Node ids, one per generated node.
        pub node_ids: Vec<String>,
        /// Undirected edges as id pairs.
        pub edges: Vec<(String, String)>,
        /// Ground-truth community label per node, aligned with `node_ids`.
        pub labels: Vec<usize>,
    }

    /// Shape of a [`planted_partition`] draw.
    #[derive(Clone, Copy, Debug)]
    pub struct PlantedPartitionConfig {
        /// Number of planted communities.
        pub num_blocks: usize,
        /// Nodes in each community.
        pub nodes_per_block: usize,
        /// Probability of an edge inside a community.
        pub p_within: f64,
        /// Probability of an edge across communities.
        pub p_between: f64,
    }

    impl Default for PlantedPartitionConfig {
        fn default() -> Self {
            Self {
                num_blocks: 3,
                nodes_per_block: 40,
                p_within: 0.3,
                p_between: 0.02,
            }
        }
    }

    /// Draws a unipartite planted-partition graph.
    ///
    /// Every unordered node pair receives an independent Bernoulli edge with
    /// the within- or between-community probability. The draw is a pure
    /// function of `seed` and `config`.
    #[must_use]
    pub fn planted_partition(seed: u64, config: &PlantedPartitionConfig) -> PlantedPartition {
        let mut rng = SmallRng::seed_from_u64(seed);
        let total = config.num_blocks * config.nodes_per_block;
        let node_ids: Vec<String> = (0..total).map(|index| format!("n{index}")).collect();
        let labels: Vec<usize> = (0..total)
            .map(|index| index / config.nodes_per_block)
            .collect();

        let mut edges = Vec::new();
        for left in 0..total {
            for right in (left + 1)..total {
                let probability = if labels[left] == labels[right] {
                    config.p_within
                } else {
                    config.p_between
                };
                if rng.gen_bool(probability) {
                    edges.push((node_ids[left].clone(), node_ids[right].clone()));
                }
            }
        }

        PlantedPartition {
            node_ids,
            edges,
            labels,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn same_seed_reproduces_the_same_graph() {
            let config = PlantedPartitionConfig::default();
            let left = planted_partition(99, &config);
            let right = planted_partition(99, &config);
            assert_eq!(left.edges, right.edges);
            assert_eq!(left.labels, right.labels);
        }

        #[test]
        fn block_sizes_match_the_config() {
            let config = PlantedPartitionConfig {
                num_blocks: 4,
                nodes_per_block: 10,
                ..PlantedPartitionConfig::default()
            };
            let graph = planted_partition(7, &config);
            assert_eq!(graph.node_ids.len(), 40);
            for block in 0..4 {
                assert_eq!(
                    graph.labels.iter().filter(|&&label| label == block).count(),
                    10
                );
            }
        }

        #[test]
        fn within_edges_dominate_between_edges() {
            let config = PlantedPartitionConfig::default();
            let graph = planted_partition(3, &config);
            let index_of = |id: &str| {
                graph
                    .node_ids
                    .iter()
                    .position(|candidate| candidate == id)
                    .expect("edge endpoints come from node_ids")
            };
            let (within, between): (Vec<_>, Vec<_>) = graph
                .edges
                .iter()
                .partition(|(a, b)| graph.labels[index_of(a)] == graph.labels[index_of(b)]);
            assert!(within.len() > between.len());
        }
    }
}
