// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic CBOR encoding (canonical subset) for node payloads.
//!
//! Every byte stream that feeds a digest goes through [`encode_value`]. The
//! encoding is a pure function of the value's contents:
//!
//! - integers use the shortest width;
//! - floats use the shortest exact width, integral floats within the CBOR
//!   integer range encode as integers (larger ones stay floats),
//!   and every NaN collapses to the half-precision quiet NaN;
//! - lengths are always definite;
//! - map entries are emitted in ascending order of their *encoded* key
//!   bytes, and duplicate keys are rejected;
//! - tags are rejected.
//!
//! Record field order therefore never changes a hash, while array order
//! (children lists) always does.

use ciborium::value::Value;
use half::f16;

/// Errors raised while producing a canonical encoding.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CanonError {
    /// CBOR tags have no canonical meaning in a payload.
    #[error("[SUBEX_CANON_TAG] tags not allowed in payloads")]
    Tag,
    /// Two map entries encode to the same key bytes.
    #[error("[SUBEX_CANON_DUPLICATE_KEY] duplicate map key")]
    MapKeyDuplicate,
    /// A value kind the canonical subset does not cover.
    #[error("[SUBEX_CANON_UNSUPPORTED] {0}")]
    Unsupported(String),
}

type Result<T> = std::result::Result<T, CanonError>;

/// Integer range CBOR major types 0 and 1 can carry.
const CBOR_INT_MIN: i128 = -0x1_0000_0000_0000_0000;
const CBOR_INT_MAX: i128 = 0xffff_ffff_ffff_ffff;

/// Encode `val` with the canonical CBOR subset.
pub fn encode_value(val: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    enc_value(val, &mut out)?;
    Ok(out)
}

/// Sort map entries into canonical key order, rejecting duplicates.
///
/// Returns the entries paired with their encoded key bytes so callers that
/// go on to encode the map do not pay for key encoding twice.
pub(crate) fn sort_entries(
    entries: impl IntoIterator<Item = (Value, Value)>,
) -> Result<Vec<(Vec<u8>, Value, Value)>> {
    let mut buf = Vec::new();
    for (k, v) in entries {
        let mut kb = Vec::new();
        enc_value(&k, &mut kb)?;
        buf.push((kb, k, v));
    }
    buf.sort_by(|a, b| a.0.cmp(&b.0));
    if buf.windows(2).any(|win| win[0].0 == win[1].0) {
        return Err(CanonError::MapKeyDuplicate);
    }
    Ok(buf)
}

fn enc_value(v: &Value, out: &mut Vec<u8>) -> Result<()> {
    match v {
        Value::Bool(b) => out.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => out.push(0xf6),
        Value::Integer(n) => enc_int(i128::from(*n), out),
        Value::Float(f) => enc_float(*f, out),
        Value::Text(s) => {
            enc_len(3, s.len(), out);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            enc_len(2, b.len(), out);
            out.extend_from_slice(b);
        }
        Value::Array(items) => {
            enc_len(4, items.len(), out);
            for it in items {
                enc_value(it, out)?;
            }
        }
        Value::Map(entries) => {
            let sorted = sort_entries(entries.iter().cloned())?;
            enc_len(5, sorted.len(), out);
            for (kb, _k, v) in sorted {
                out.extend_from_slice(&kb);
                enc_value(&v, out)?;
            }
        }
        Value::Tag(_, _) => return Err(CanonError::Tag),
        other => {
            return Err(CanonError::Unsupported(format!(
                "simple value {other:?}"
            )))
        }
    }
    Ok(())
}

fn enc_len(major: u8, len: usize, out: &mut Vec<u8>) {
    write_major(major, len as u128, out);
}

#[allow(clippy::cast_sign_loss)]
fn enc_int(n: i128, out: &mut Vec<u8>) {
    if n >= 0 {
        write_major(0, n as u128, out);
    } else {
        write_major(1, (-1 - n) as u128, out);
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
fn enc_float(f: f64, out: &mut Vec<u8>) {
    if f.is_nan() {
        write_half(f16::NAN, out);
        return;
    }
    if f.is_infinite() {
        let h = if f.is_sign_positive() {
            f16::INFINITY
        } else {
            f16::NEG_INFINITY
        };
        write_half(h, out);
        return;
    }
    if f.fract() == 0.0 {
        // Integral values outside the CBOR integer range stay floats.
        let i = f as i128;
        if (CBOR_INT_MIN..=CBOR_INT_MAX).contains(&i) && i as f64 == f {
            enc_int(i, out);
            return;
        }
    }
    let h = f16::from_f64(f);
    if h.to_f64() == f {
        write_half(h, out);
        return;
    }
    let single = f as f32;
    if f64::from(single) == f {
        out.push(0xfa);
        out.extend_from_slice(&single.to_be_bytes());
    } else {
        out.push(0xfb);
        out.extend_from_slice(&f.to_be_bytes());
    }
}

fn write_half(h: f16, out: &mut Vec<u8>) {
    out.push(0xf9);
    out.extend_from_slice(&h.to_bits().to_be_bytes());
}

#[allow(clippy::cast_possible_truncation)]
fn write_major(major: u8, n: u128, out: &mut Vec<u8>) {
    debug_assert!(major <= 7);
    match n {
        0..=23 => out.push((major << 5) | n as u8),
        24..=0xff => {
            out.push((major << 5) | 24);
            out.push(n as u8);
        }
        0x100..=0xffff => {
            out.push((major << 5) | 25);
            out.extend_from_slice(&(n as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push((major << 5) | 26);
            out.extend_from_slice(&(n as u32).to_be_bytes());
        }
        _ => {
            out.push((major << 5) | 27);
            out.extend_from_slice(&(n as u64).to_be_bytes());
        }
    }
}
