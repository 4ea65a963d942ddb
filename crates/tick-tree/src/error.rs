//! Errors returned by tree operations.
//!
//! Only precondition violations and persistence failures are errors. Bad
//! nodes met while ticking degrade to a failed state plus a diagnostic on
//! the tree's [`LogSink`](crate::LogSink) instead.

use thiserror::Error;

use crate::id::{NodeId, NodeKey};

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("the tree has no root node")]
    NoRoot,

    #[error("node {node} cannot have children")]
    NotAParent { node: NodeKey },

    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected { parent: NodeKey, child: NodeKey },

    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    #[error("{context}: node ({id}) not found")]
    NodeNotFound { id: NodeId, context: &'static str },

    #[error("tree id {0:?} cannot be used as a file name")]
    InvalidTreeId(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for TreeError {
    fn from(err: bincode::Error) -> Self {
        TreeError::Serialization(err.to_string())
    }
}
