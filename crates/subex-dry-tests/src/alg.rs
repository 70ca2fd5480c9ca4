// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Algebra-expression fixtures.
//!
//! Records look like `{type: "plus", children: [...]}`,
//! `{type: "value", value: 1, children: []}`, and
//! `{type: "variable", value: "x", children: []}`. The builders produce CBOR
//! records directly; [`AlgExpr`] is the same tree as a typed serde value.

use ciborium::value::Value;
use serde::Serialize;

/// Operator and atom kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgKind {
    /// `a + b + ...`
    Plus,
    /// `a * b * ...`
    Times,
    /// `a - b`
    Minus,
    /// `a / b`
    Divide,
    /// `a = b`
    Equals,
    /// Numeric literal.
    Value,
    /// Named variable.
    Variable,
}

/// Atom payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlgAtom {
    /// Integer literal.
    Number(i64),
    /// Variable name.
    Name(String),
}

/// Typed algebra expression; serializes to the same records as the builders.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlgExpr {
    /// Node kind.
    #[serde(rename = "type")]
    pub kind: AlgKind,
    /// Atom payload (absent on operators).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AlgAtom>,
    /// Ordered operands.
    pub children: Vec<AlgExpr>,
}

impl AlgExpr {
    /// Numeric literal.
    pub fn number(n: i64) -> Self {
        Self {
            kind: AlgKind::Value,
            value: Some(AlgAtom::Number(n)),
            children: Vec::new(),
        }
    }

    /// Variable reference.
    pub fn var(name: &str) -> Self {
        Self {
            kind: AlgKind::Variable,
            value: Some(AlgAtom::Name(name.to_owned())),
            children: Vec::new(),
        }
    }

    /// Operator node.
    pub fn op(kind: AlgKind, children: Vec<Self>) -> Self {
        Self {
            kind,
            value: None,
            children,
        }
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_owned())
}

/// Operator record of `kind` over `children`.
pub fn op(kind: &str, children: Vec<Value>) -> Value {
    Value::Map(vec![
        (text("type"), text(kind)),
        (text("children"), Value::Array(children)),
    ])
}

/// Numeric literal record.
pub fn value(n: i64) -> Value {
    Value::Map(vec![
        (text("type"), text("value")),
        (text("value"), Value::Integer(n.into())),
        (text("children"), Value::Array(Vec::new())),
    ])
}

/// Variable record.
pub fn variable(name: &str) -> Value {
    Value::Map(vec![
        (text("type"), text("variable")),
        (text("value"), text(name)),
        (text("children"), Value::Array(Vec::new())),
    ])
}

/// `a + b`
pub fn plus(a: Value, b: Value) -> Value {
    op("plus", vec![a, b])
}

/// `a * b`
pub fn times(a: Value, b: Value) -> Value {
    op("times", vec![a, b])
}

/// `a - b`
pub fn minus(a: Value, b: Value) -> Value {
    op("minus", vec![a, b])
}

/// `a / b`
pub fn divide(a: Value, b: Value) -> Value {
    op("divide", vec![a, b])
}

/// `a = b`
pub fn equals(a: Value, b: Value) -> Value {
    op("equals", vec![a, b])
}
