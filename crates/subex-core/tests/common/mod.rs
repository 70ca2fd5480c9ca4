// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code, clippy::panic)]

use subex_core::{CanonicalHash, SubExpressionIndexer, SubObjectMaps, Value};

/// Text value shorthand.
pub fn text(s: &str) -> Value {
    Value::Text(s.to_owned())
}

/// Record with entries in exactly the given order.
pub fn record(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(entries.into_iter().map(|(k, v)| (text(k), v)).collect())
}

/// Linear chain `neg(neg(...value(0)...))` with `edges` edges below the root.
pub fn chain(edges: usize) -> Value {
    let mut node = subex_dry_tests::value(0);
    for _ in 0..edges {
        node = subex_dry_tests::op("neg", vec![node]);
    }
    node
}

/// Index every tree into one map-set and return the root hashes in order.
pub fn index_all(trees: &[Value]) -> (SubObjectMaps, Vec<CanonicalHash>) {
    let indexer = SubExpressionIndexer::default();
    let mut maps = SubObjectMaps::new();
    let roots = trees
        .iter()
        .map(|t| indexer.index_into(t, &mut maps))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| panic!("indexing failed: {e}"));
    (maps, roots)
}

/// Every stored node's children resolve, and the relation holds exactly the
/// distinct (parent, child) pairs the store implies.
pub fn assert_closed(maps: &SubObjectMaps) {
    let mut implied = 0usize;
    for (hash, node) in maps.nodes() {
        let mut distinct: Vec<_> = node.children().to_vec();
        distinct.sort();
        distinct.dedup();
        implied += distinct.len();
        for child in &distinct {
            assert!(maps.contains(child), "dangling child {child} of {hash}");
            assert!(maps.children_of(hash).contains(child));
            assert!(maps.parents_of(child).contains(hash));
        }
        assert_eq!(maps.children_of(hash).len(), distinct.len());
    }
    assert_eq!(maps.relation().len(), implied);

    let members: usize = maps.shapes().map(|(_, m)| m.len()).sum();
    assert_eq!(members, maps.len(), "every node sits in exactly one shape group");
}
