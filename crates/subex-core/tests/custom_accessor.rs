// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Indexing a host-language tree type through a hand-written accessor.

use subex_core::{
    Blake3Hasher, ChildAccessor, IndexError, NodePath, Payload, SharedSubObjectMaps,
    SubExpressionIndexer, Value,
};

#[derive(Debug)]
enum Expr {
    Num(i64),
    Var(&'static str),
    Call(&'static str, Vec<Expr>),
}

struct ExprAccessor;

impl ChildAccessor<Expr> for ExprAccessor {
    fn payload(&self, node: &Expr) -> subex_core::Result<Payload> {
        let entries = match node {
            Expr::Num(n) => vec![
                (Value::Text("type".into()), Value::Text("value".into())),
                (Value::Text("value".into()), Value::Integer((*n).into())),
            ],
            Expr::Var(name) => vec![
                (Value::Text("type".into()), Value::Text("variable".into())),
                (Value::Text("value".into()), Value::Text((*name).into())),
            ],
            Expr::Call(op, _) => vec![(Value::Text("type".into()), Value::Text((*op).into()))],
        };
        Payload::from_entries(entries)
            .map_err(|e| IndexError::malformed(&NodePath::root(), e.to_string()))
    }

    fn children<'n>(&self, node: &'n Expr) -> subex_core::Result<&'n [Expr]> {
        match node {
            Expr::Call(_, args) => Ok(args),
            Expr::Num(_) | Expr::Var(_) => Ok(&[]),
        }
    }
}

fn sample() -> Expr {
    Expr::Call(
        "plus",
        vec![
            Expr::Call("times", vec![Expr::Var("x"), Expr::Num(2)]),
            Expr::Call("times", vec![Expr::Var("x"), Expr::Num(2)]),
        ],
    )
}

#[test]
fn host_tree_hashes_like_the_equivalent_record_tree() {
    use subex_dry_tests::{plus, times, value, variable};

    let typed = SubExpressionIndexer::new(ExprAccessor, Blake3Hasher);
    let records = SubExpressionIndexer::default();
    let expected = times(variable("x"), value(2));

    assert_eq!(
        typed.canonical_hash(&sample()).unwrap(),
        records
            .canonical_hash(&plus(expected.clone(), expected))
            .unwrap()
    );
}

#[test]
fn host_tree_index_shares_subtrees() {
    let typed = SubExpressionIndexer::new(ExprAccessor, Blake3Hasher);
    let maps = typed.build_index(&sample()).unwrap();
    // x, 2, x*2, plus
    assert_eq!(maps.len(), 4);
    assert_eq!(maps.stats().edges, 3);
}

#[test]
fn host_tree_parallel_and_shared_paths_agree() {
    let typed = SubExpressionIndexer::new(ExprAccessor, Blake3Hasher).with_parallel_depth(2);
    let parallel = typed.build_index_parallel(&sample()).unwrap();

    let shared = SharedSubObjectMaps::new();
    let root = shared.index(&typed, &sample()).unwrap();
    assert!(shared.with(|maps| maps.contains(&root)));
    assert_eq!(
        shared.snapshot().digest().unwrap(),
        parallel.digest().unwrap()
    );
}
