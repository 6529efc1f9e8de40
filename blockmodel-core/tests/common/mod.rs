//! Shared network builders for the integration tests.

#![allow(dead_code)]

use blockmodel_core::Network;

/// Reassigns `child_id` under `parent_id`, one level up.
pub fn assign(net: &mut Network, child_id: &str, child_level: usize, parent_id: &str) {
    let child = net
        .find_node(child_id, child_level)
        .expect("child id must exist");
    let parent = net
        .find_node(parent_id, child_level + 1)
        .expect("parent id must exist");
    net.set_parent(child, parent).expect("assignment is legal");
}

/// The small bipartite fixture: four nodes per type, eight edges, and a
/// three-blocks-per-type partition.
///
/// Block degrees: a11=2, a12=5, a13=1, b11=6, b12=1, b13=1. The model
/// entropy at level 0 works out to
/// `-(8 + (2·ln2! + 3·ln3!) + (2·ln(2/12) + 4·ln(4/30) + ln(1/5) + ln1))
///  = -1.509004`.
pub fn simple_bipartite() -> Network {
    let mut net = Network::new(&["a", "b"], 42);
    for id in ["a1", "a2", "a3", "a4"] {
        net.add_node(id, "a", 0).expect("type is registered");
    }
    for id in ["b1", "b2", "b3", "b4"] {
        net.add_node(id, "b", 0).expect("type is registered");
    }
    for (from, to) in [
        ("a1", "b1"),
        ("a1", "b2"),
        ("a2", "b1"),
        ("a2", "b2"),
        ("a3", "b1"),
        ("a3", "b2"),
        ("a3", "b4"),
        ("a4", "b3"),
    ] {
        net.add_edge(from, to).expect("both leaves exist");
    }
    for (id, type_name) in [
        ("a11", "a"),
        ("a12", "a"),
        ("a13", "a"),
        ("b11", "b"),
        ("b12", "b"),
        ("b13", "b"),
    ] {
        net.add_node(id, type_name, 1).expect("type is registered");
    }
    for (child, parent) in [
        ("a1", "a11"),
        ("a2", "a12"),
        ("a3", "a12"),
        ("a4", "a13"),
        ("b1", "b11"),
        ("b2", "b11"),
        ("b3", "b12"),
        ("b4", "b13"),
    ] {
        assign(&mut net, child, 0, parent);
    }
    net
}

/// Four bipartite nodes, three edges, one block per node.
///
/// With blocks A1..B2 mirroring the nodes, the entropy at level 0 is
/// `-(3 + 2·ln2 + (ln(1/4) + 2·ln(1/2))) = -1.6137056`.
pub fn spec_four_node() -> Network {
    let mut net = Network::new(&["a", "b"], 42);
    for id in ["a1", "a2"] {
        net.add_node(id, "a", 0).expect("type is registered");
    }
    for id in ["b1", "b2"] {
        net.add_node(id, "b", 0).expect("type is registered");
    }
    for (from, to) in [("a1", "b1"), ("a1", "b2"), ("a2", "b1")] {
        net.add_edge(from, to).expect("both leaves exist");
    }
    for (id, type_name) in [("A1", "a"), ("A2", "a"), ("B1", "b"), ("B2", "b")] {
        net.add_node(id, type_name, 1).expect("type is registered");
    }
    for (child, parent) in [("a1", "A1"), ("a2", "A2"), ("b1", "B1"), ("b2", "B2")] {
        assign(&mut net, child, 0, parent);
    }
    net
}

/// Three unipartite nodes with a triangle plus a self-edge on `n1`, grouped
/// into blocks `a = {n1, n2}` and `b = {n3}`.
///
/// Leaf degrees are (4, 2, 2) and the doubled diagonal gives `e_aa = 4`,
/// `e_ab = 2`, so the entropy at level 0 is
/// `-(4 + (ln4! + 2·ln2!) + ½·(4·ln(4/36) + 2·(2·ln(2/12)))) = -0.586380`.
pub fn unipartite_with_self_edge() -> Network {
    let mut net = Network::new(&["node"], 42);
    for id in ["n1", "n2", "n3"] {
        net.add_node(id, "node", 0).expect("type is registered");
    }
    for (from, to) in [("n1", "n2"), ("n1", "n3"), ("n2", "n3"), ("n1", "n1")] {
        net.add_edge(from, to).expect("both leaves exist");
    }
    for id in ["a", "b"] {
        net.add_node(id, "node", 1).expect("type is registered");
    }
    for (child, parent) in [("n1", "a"), ("n2", "a"), ("n3", "b")] {
        assign(&mut net, child, 0, parent);
    }
    net
}

/// The merge fixture: the four-node bipartite graph of [`spec_four_node`]
/// grown by `a3` with edges to `b2` and a fresh `b3`, one block per node.
pub fn merge_fixture() -> Network {
    let mut net = Network::new(&["a", "b"], 42);
    for id in ["a1", "a2", "a3"] {
        net.add_node(id, "a", 0).expect("type is registered");
    }
    for id in ["b1", "b2", "b3"] {
        net.add_node(id, "b", 0).expect("type is registered");
    }
    for (from, to) in [
        ("a1", "b1"),
        ("a1", "b2"),
        ("a2", "b1"),
        ("a3", "b2"),
        ("a3", "b3"),
    ] {
        net.add_edge(from, to).expect("both leaves exist");
    }
    for (id, type_name) in [
        ("A1", "a"),
        ("A2", "a"),
        ("A3", "a"),
        ("B1", "b"),
        ("B2", "b"),
        ("B3", "b"),
    ] {
        net.add_node(id, type_name, 1).expect("type is registered");
    }
    for (child, parent) in [
        ("a1", "A1"),
        ("a2", "A2"),
        ("a3", "A3"),
        ("b1", "B1"),
        ("b2", "B2"),
        ("b3", "B3"),
    ] {
        assign(&mut net, child, 0, parent);
    }
    net
}

/// Brute-force model entropy delta of moving `node_id` under `block_id`.
///
/// Applies the move, differences [`Network::entropy`], then restores the
/// original parent.
pub fn brute_force_delta(net: &mut Network, node_id: &str, block_id: &str) -> f64 {
    let node = net.find_node(node_id, 0).expect("node exists");
    let target = net.find_node(block_id, 1).expect("block exists");
    let original = net.node(node).parent().expect("node is assigned");
    let before = net.entropy(0).expect("block level exists");
    net.set_parent(node, target).expect("move is legal");
    let after = net.entropy(0).expect("block level exists");
    net.set_parent(node, original).expect("restore is legal");
    after - before
}
