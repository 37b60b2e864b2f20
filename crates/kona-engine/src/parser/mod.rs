//! Parse-tree dump decoding
//!
//! The engine never tokenizes surface syntax. It consumes the node dump an
//! external tool produces for an already-parsed script: one record per line,
//! `<spaces><Type>[ <argument>]`, with children nested two spaces deeper.

pub mod ast;
pub mod printer;
pub mod reader;

pub use ast::{Node, NodeKind};
pub use reader::{DumpReader, Marker};

use thiserror::Error;

/// Errors raised while decoding a dump
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The text does not contain a well-formed record where one is required
    #[error("malformed dump at line {line}: {message}")]
    Malformed {
        /// Line of the offending record (1-based)
        line: usize,
        /// What was wrong with it
        message: String,
    },

    /// The record's type token names no known node kind
    #[error("unsupported node kind '{kind}' at line {line}")]
    UnsupportedNodeKind {
        /// The type token as written, without the soak marker
        kind: String,
        /// Line of the offending record (1-based)
        line: usize,
    },
}

/// Decode a full dump into its root node.
///
/// Trailing records that are not part of the root's subtree are ignored.
pub fn decode(text: &str) -> Result<Node, DecodeError> {
    let mut reader = DumpReader::new(text);
    let root = reader.parse()?;

    if !reader.rest().trim().is_empty() {
        tracing::warn!(
            line = reader.line(),
            "ignoring dump content after the root record"
        );
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_is_malformed() {
        let err = decode("").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_decode_unknown_kind() {
        let err = decode("Block\n  Frobnicate").unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnsupportedNodeKind {
                kind: "Frobnicate".to_string(),
                line: 2
            }
        );
    }

    #[test]
    fn test_decode_ignores_trailing_siblings() {
        let root = decode("Block\nBlock").unwrap();
        assert!(matches!(root.kind, NodeKind::Block { ref expressions } if expressions.is_empty()));
    }
}
