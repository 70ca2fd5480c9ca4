// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Indexer configuration.
//!
//! JSON shape (every field optional):
//!
//! ```json
//! {
//!   "children_field": "children",
//!   "hash": { "algorithm": "blake3" },
//!   "max_depth": 65536,
//!   "parallel_depth": 0
//! }
//! ```
//!
//! A keyed digest is selected with
//! `{ "algorithm": "blake3-keyed", "key": "<64 hex chars>" }`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::{HashFunction, KeyedBlake3Hasher};
use crate::indexer::{SubExpressionIndexer, DEFAULT_MAX_DEPTH};
use crate::tree::{FieldAccessor, DEFAULT_CHILDREN_FIELD};

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading a config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// `children_field` is empty.
    #[error("children_field must not be empty")]
    EmptyChildrenField,
    /// Keyed digest with a key that is not 32 hex-encoded bytes.
    #[error("invalid blake3 key: {0}")]
    InvalidKey(String),
    /// `max_depth` of zero would reject every tree with children.
    #[error("max_depth must be at least 1")]
    ZeroDepth,
}

/// Digest selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum HashConfig {
    /// Plain BLAKE3.
    #[default]
    Blake3,
    /// BLAKE3 keyed mode.
    Blake3Keyed {
        /// 32-byte key, hex encoded.
        key: String,
    },
}

impl HashConfig {
    /// Build the digest this config names.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidKey`] for a malformed key.
    pub fn build(&self) -> Result<HashFunction, ConfigError> {
        match self {
            Self::Blake3 => Ok(HashFunction::Blake3),
            Self::Blake3Keyed { key } => {
                let bytes = hex::decode(key).map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
                let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
                    ConfigError::InvalidKey(format!("expected 32 bytes, got {}", b.len()))
                })?;
                Ok(HashFunction::Blake3Keyed(KeyedBlake3Hasher::new(key)))
            }
        }
    }
}

/// Indexer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerConfig {
    /// Name of the field holding a node's ordered children.
    pub children_field: String,
    /// Digest selection.
    pub hash: HashConfig,
    /// Maximum number of edges between the root and any node.
    pub max_depth: usize,
    /// Fork per child for nodes shallower than this (0 = sequential).
    pub parallel_depth: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            children_field: DEFAULT_CHILDREN_FIELD.to_owned(),
            hash: HashConfig::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            parallel_depth: 0,
        }
    }
}

impl IndexerConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// JSON or validation errors.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// I/O, JSON, or validation errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(&bytes)
    }

    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// The first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.children_field.is_empty() {
            return Err(ConfigError::EmptyChildrenField);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        self.hash.build().map(|_| ())
    }
}

impl SubExpressionIndexer<FieldAccessor, HashFunction> {
    /// Build an indexer for CBOR record trees from `config`.
    ///
    /// # Errors
    ///
    /// Validation errors.
    pub fn from_config(config: &IndexerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            FieldAccessor::new(config.children_field.clone()),
            config.hash.build()?,
        )
        .with_max_depth(config.max_depth)
        .with_parallel_depth(config.parallel_depth))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = IndexerConfig::from_json_slice(b"{}").unwrap();
        assert_eq!(cfg, IndexerConfig::default());
        assert_eq!(cfg.children_field, "children");
    }

    #[test]
    fn keyed_hash_round_trips_through_json() {
        let json = format!(
            r#"{{"children_field":"components","hash":{{"algorithm":"blake3-keyed","key":"{}"}},"parallel_depth":2}}"#,
            "0f".repeat(32)
        );
        let cfg = IndexerConfig::from_json_slice(json.as_bytes()).unwrap();
        assert_eq!(cfg.children_field, "components");
        assert_eq!(cfg.parallel_depth, 2);
        assert!(matches!(cfg.hash.build().unwrap(), HashFunction::Blake3Keyed(_)));

        let again: IndexerConfig =
            serde_json::from_slice(&serde_json::to_vec(&cfg).unwrap()).unwrap();
        assert_eq!(again, cfg);
    }

    #[test]
    fn short_key_rejected() {
        let json = br#"{"hash":{"algorithm":"blake3-keyed","key":"abcd"}}"#;
        assert!(matches!(
            IndexerConfig::from_json_slice(json),
            Err(ConfigError::InvalidKey(_))
        ));
    }

    #[test]
    fn non_hex_key_rejected() {
        let json = br#"{"hash":{"algorithm":"blake3-keyed","key":"zz"}}"#;
        assert!(matches!(
            IndexerConfig::from_json_slice(json),
            Err(ConfigError::InvalidKey(_))
        ));
    }

    #[test]
    fn constraint_violations() {
        assert!(matches!(
            IndexerConfig::from_json_slice(br#"{"children_field":""}"#),
            Err(ConfigError::EmptyChildrenField)
        ));
        assert!(matches!(
            IndexerConfig::from_json_slice(br#"{"max_depth":0}"#),
            Err(ConfigError::ZeroDepth)
        ));
        assert!(matches!(
            IndexerConfig::from_json_slice(br#"{"childrenKey":"x"}"#),
            Err(ConfigError::Serde(_))
        ));
    }

    #[test]
    fn from_config_applies_settings() {
        let cfg = IndexerConfig {
            children_field: "args".into(),
            max_depth: 7,
            parallel_depth: 1,
            ..IndexerConfig::default()
        };
        let indexer = SubExpressionIndexer::from_config(&cfg).unwrap();
        assert_eq!(indexer.accessor().children_field(), "args");
        assert_eq!(indexer.max_depth(), 7);
        assert_eq!(indexer.parallel_depth(), 1);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = IndexerConfig::load("/nonexistent/subex/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
