//! Execution state of one tree.
//!
//! The [`TreeRuntime`] owns the running-node cursor, the active [`Trace`],
//! and the table of [`NodeContext`]s. It is owned exclusively by a
//! [`BehaviorTree`](crate::BehaviorTree) and persisted separately from it.

use std::collections::BTreeMap;

use crate::NodeState;
use crate::config::TreeConfig;
use crate::context::NodeContext;
use crate::id::{NodeId, NodeKey};
use crate::trace::Trace;

#[derive(Debug, Clone, Default)]
pub struct TreeRuntime {
    pub(crate) trace: Trace,
    pub(crate) running: Option<NodeKey>,
    pub(crate) contexts: BTreeMap<NodeId, NodeContext>,
}

impl TreeRuntime {
    pub fn new(config: &TreeConfig) -> Self {
        Self {
            trace: Trace::new(config.trace_enabled, config.max_trace_passes),
            running: None,
            contexts: BTreeMap::new(),
        }
    }

    /// The node whose tick is in progress, or `None` when the tree is idle.
    pub fn running_node(&self) -> Option<NodeKey> {
        self.running
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn trace_mut(&mut self) -> &mut Trace {
        &mut self.trace
    }

    pub fn context(&self, id: &NodeId) -> Option<&NodeContext> {
        self.contexts.get(id)
    }

    /// Nodes that have held runtime state, ordered by ID.
    pub fn contexts(&self) -> impl ExactSizeIterator<Item = (&NodeId, &NodeContext)> {
        self.contexts.iter()
    }

    /// State of `id`; nodes without a context are `Unvisited`.
    pub fn state(&self, id: &NodeId) -> NodeState {
        self.contexts
            .get(id)
            .map(NodeContext::state)
            .unwrap_or_default()
    }
}
