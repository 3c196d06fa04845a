#![forbid(unsafe_code)]

use thiserror::Error;
use vizkit_reactive::ListenerError;

use crate::transformation::NodeId;

pub type Result<T> = std::result::Result<T, SceneError>;

/// Failures of transformation hierarchy operations.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Attaching `child` under `parent` would make `child` its own ancestor.
    #[error("attaching node {child} under node {parent} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },

    /// A watcher of a recomputed matrix failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Failures while attaching a steering set to a camera.
#[derive(Debug, Error)]
pub enum SteeringError {
    #[error("steering node `{node}` has an invalid configuration: {reason}")]
    InvalidConfig { node: String, reason: String },

    #[error("steering node `{node}` refused to attach: {reason}")]
    Rejected { node: String, reason: String },

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

impl SteeringError {
    #[must_use]
    pub fn invalid(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            node: node.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn rejected(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

/// Shape violations of the boundary data structures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("`{field}` has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}
