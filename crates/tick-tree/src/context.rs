//! Per-node runtime slots.
//!
//! A [`NodeContext`] holds everything that changes while a node runs. It is
//! kept in the [`TreeRuntime`](crate::TreeRuntime) keyed by node ID rather
//! than inside the node, so the static tree and its execution progress can
//! be saved, loaded, and swapped independently.

use serde::{Deserialize, Serialize};

use crate::NodeState;

/// Type-specific execution data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextData {
    #[default]
    Empty,
    /// Index of the active child in the composite's child list.
    Composite { current: Option<usize> },
    /// Completed child runs since the repeater was entered.
    Repeater { executed: u32 },
}

impl ContextData {
    /// Restores the zero value of the current variant.
    pub fn reset(&mut self) {
        match self {
            ContextData::Empty => {}
            ContextData::Composite { current } => *current = None,
            ContextData::Repeater { executed } => *executed = 0,
        }
    }
}

/// Mutable runtime slot of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeContext {
    pub(crate) state: NodeState,
    pub(crate) data: ContextData,
}

impl NodeContext {
    pub fn new(data: ContextData) -> Self {
        Self {
            state: NodeState::Unvisited,
            data,
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn data(&self) -> &ContextData {
        &self.data
    }

    /// Clears the type-specific data. The state is left to the caller.
    pub fn reset(&mut self) {
        self.data.reset();
    }

    pub(crate) fn cursor(&self) -> Option<usize> {
        match self.data {
            ContextData::Composite { current } => current,
            _ => None,
        }
    }

    pub(crate) fn set_cursor(&mut self, index: Option<usize>) {
        self.data = ContextData::Composite { current: index };
    }

    pub(crate) fn executed(&self) -> u32 {
        match self.data {
            ContextData::Repeater { executed } => executed,
            _ => 0,
        }
    }

    pub(crate) fn set_executed(&mut self, executed: u32) {
        self.data = ContextData::Repeater { executed };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_variant() {
        let mut ctx = NodeContext::new(ContextData::Composite { current: None });
        ctx.set_cursor(Some(2));
        ctx.state = NodeState::Running;
        ctx.reset();
        assert_eq!(ctx.data(), &ContextData::Composite { current: None });
        assert_eq!(ctx.state(), NodeState::Running);

        let mut ctx = NodeContext::new(ContextData::Repeater { executed: 0 });
        ctx.set_executed(3);
        ctx.reset();
        assert_eq!(ctx.executed(), 0);
    }
}
