//! AST error definitions.
//!
//! Every error here is a structural or caller bug, never an environment
//! failure; nothing is retryable.

use thiserror::Error;

use crate::release::NodeKind;

/// An AST access or teardown error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AstError {
    /// An accessor was invoked against a node whose active variant differs
    /// from the accessor's expected variant.
    #[error("variant mismatch: accessor expects {expected}, node is {found}")]
    VariantMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Release found a node that breaks the single-owner tree shape: a
    /// child referenced by more than one parent, or a handle that does not
    /// belong to the store being released.
    #[error("malformed tree: {kind} node #{index}: {reason}")]
    MalformedTree {
        kind: NodeKind,
        index: u32,
        reason: &'static str,
    },
}

impl AstError {
    pub(crate) fn variant_mismatch(expected: &'static str, found: &'static str) -> Self {
        AstError::VariantMismatch { expected, found }
    }
}
