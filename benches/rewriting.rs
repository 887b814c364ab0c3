//! Benchmarks for matching and rewriting.
//!
//! Measures:
//! - pattern matching on a chain graph (first match vs. full enumeration)
//! - a clone-heavy rewrite on a star graph
//! - merge of a node class

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use regraph::prelude::*;

/// A chain `n0 -> n1 -> … -> n{len-1}` with no attributes.
fn chain(len: usize) -> Graph {
    let mut graph = Graph::new();
    for i in 0..len {
        graph
            .add_node(format!("n{:05}", i), Attributes::new())
            .expect("fresh node");
    }
    for i in 1..len {
        graph
            .add_edge(
                format!("n{:05}", i - 1),
                format!("n{:05}", i),
                Attributes::new(),
            )
            .expect("fresh edge");
    }
    graph
}

/// A star with `arms` leaves around a hub.
fn star(arms: usize) -> Graph {
    let mut graph = Graph::new();
    graph.add_node("hub", Attributes::new()).expect("fresh node");
    for i in 0..arms {
        let leaf = format!("leaf{:04}", i);
        graph.add_node(leaf.clone(), Attributes::new()).expect("fresh node");
        graph
            .add_edge("hub", leaf, Attributes::new())
            .expect("fresh edge");
    }
    graph
}

fn bench_matching_chain(c: &mut Criterion) {
    let graph = chain(1_000);
    let pattern = Graph::from_elements(["x", "y", "z"], [("x", "y"), ("y", "z")]).unwrap();

    c.bench_function("match_first_on_1k_chain", |b| {
        b.iter(|| {
            let first = black_box(&graph).find_matching(&pattern).next();
            black_box(first)
        })
    });

    c.bench_function("match_all_on_1k_chain", |b| {
        b.iter(|| {
            let count = black_box(&graph).find_matching(&pattern).count();
            black_box(count)
        })
    });
}

fn bench_clone_rewrite(c: &mut Criterion) {
    let graph = star(200);
    let mut rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
    rule.inject_clone_node(&NodeId::from("x"), None).unwrap();
    let instance = mapping([("x", "hub")]);

    c.bench_function("clone_hub_of_200_star", |b| {
        b.iter(|| {
            let mut scratch = graph.clone();
            scratch.rewrite(&rule, &instance).unwrap();
            black_box(scratch.node_count())
        })
    });
}

fn bench_merge_rewrite(c: &mut Criterion) {
    let graph = star(64);
    let leaves = Graph::from_elements(["a", "b", "c", "d"], []).unwrap();
    let mut rule = Rule::from_pattern(leaves);
    rule.inject_merge_nodes(
        &[
            NodeId::from("a"),
            NodeId::from("b"),
            NodeId::from("c"),
            NodeId::from("d"),
        ],
        None,
    )
    .unwrap();
    let instance = mapping([
        ("a", "leaf0000"),
        ("b", "leaf0001"),
        ("c", "leaf0002"),
        ("d", "leaf0003"),
    ]);

    c.bench_function("merge_four_leaves_of_64_star", |b| {
        b.iter(|| {
            let mut scratch = graph.clone();
            scratch.rewrite(&rule, &instance).unwrap();
            black_box(scratch.node_count())
        })
    });
}

criterion_group!(
    benches,
    bench_matching_chain,
    bench_clone_rewrite,
    bench_merge_rewrite
);
criterion_main!(benches);
