// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Benchmark: indexing random algebra trees
//!
//! Generates trees with the deterministic xorshift generator (fixed seed) and
//! measures:
//!
//! - `index_sequential/N`: fresh index of one tree, explicit-stack walk
//! - `index_parallel/N`: same tree, forking per child for the top two levels
//! - `reindex_noop/N`: indexing a tree already present (all inserts no-op)
//!
//! Throughput "elements" are the number of nodes in the input tree.
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use std::{hint::black_box, time::Duration};
use subex_core::{SubExpressionIndexer, SubObjectMaps, Value};
use subex_dry_tests::{random_tree, XorShift64};

const SEED: u64 = 0x5eed;
const FANOUT: usize = 3;

fn count_nodes(tree: &Value) -> u64 {
    let children = match tree {
        Value::Map(entries) => entries
            .iter()
            .find(|(k, _)| k.as_text() == Some("children"))
            .and_then(|(_, v)| v.as_array()),
        _ => None,
    };
    1 + children.map_or(0, |c| c.iter().map(count_nodes).sum())
}

fn bench_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("index");
    group
        .warm_up_time(Duration::from_secs(2))
        .measurement_time(Duration::from_secs(6))
        .sample_size(50);

    let sequential = SubExpressionIndexer::default();
    let parallel = SubExpressionIndexer::default().with_parallel_depth(2);

    for &depth in &[4usize, 6, 8, 10] {
        let tree = random_tree(&mut XorShift64::new(SEED), depth, FANOUT);
        let nodes = count_nodes(&tree);
        group.throughput(Throughput::Elements(nodes));

        group.bench_with_input(
            BenchmarkId::new("index_sequential", nodes),
            &tree,
            |b, tree| {
                b.iter(|| {
                    let maps = sequential.build_index(tree);
                    black_box(maps.map(|m| m.len()).unwrap_or_default())
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("index_parallel", nodes), &tree, |b, tree| {
            b.iter(|| {
                let maps = parallel.build_index_parallel(tree);
                black_box(maps.map(|m| m.len()).unwrap_or_default())
            });
        });

        group.bench_with_input(BenchmarkId::new("reindex_noop", nodes), &tree, |b, tree| {
            b.iter_batched(
                || sequential.build_index(tree).unwrap_or_default(),
                |mut maps: SubObjectMaps| {
                    let root = sequential.index_into(tree, &mut maps);
                    black_box(root.is_ok())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_index);
criterion_main!(benches);
