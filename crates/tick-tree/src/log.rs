//! Structured diagnostics emitted by the engine.
//!
//! The engine never decides how diagnostics are written. It hands a
//! [`TreeLog`] to the [`LogSink`] installed on the tree; the default
//! [`TracingSink`] forwards to the `tracing` ecosystem, and [`MemorySink`]
//! keeps records around for tests and tooling.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use strum::Display;

use crate::id::NodeId;

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Identity of the node a record is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLabel {
    pub id: NodeId,
    pub name: String,
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// One diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLog {
    pub level: LogLevel,
    pub message: String,
    /// `None` for tree-level diagnostics.
    pub node: Option<NodeLabel>,
}

impl fmt::Display for TreeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "[{}]({}) {}", self.level, node, self.message),
            None => write!(f, "[{}] {}", self.level, self.message),
        }
    }
}

/// Destination for engine diagnostics.
pub trait LogSink: Send + Sync {
    fn log(&self, record: TreeLog);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, record: TreeLog) {
        let (node_id, node_name) = match &record.node {
            Some(node) => (node.id.as_str(), node.name.as_str()),
            None => ("", "<tree>"),
        };
        let message = record.message.as_str();
        match record.level {
            LogLevel::Trace => tracing::trace!(node_id, node_name, "{message}"),
            LogLevel::Debug => tracing::debug!(node_id, node_name, "{message}"),
            LogLevel::Info => tracing::info!(node_id, node_name, "{message}"),
            LogLevel::Warn => tracing::warn!(node_id, node_name, "{message}"),
            LogLevel::Error => tracing::error!(node_id, node_name, "{message}"),
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TreeLog>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records collected so far.
    pub fn records(&self) -> Vec<TreeLog> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records at exactly `level`.
    pub fn at_level(&self, level: LogLevel) -> Vec<TreeLog> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, record: TreeLog) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}
