//! State reported by behavior tree nodes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The outcome of a node, as stored in its runtime context.
///
/// # Resumable Semantics
///
/// A node moves through `Unvisited -> Running -> {Success, Failure}` and must
/// be reset back to `Unvisited` before it runs again:
/// - Conditions usually finish within the tick they are entered
/// - Long actions report `Running` and are resumed on the next tick
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum NodeState {
    /// The node has not been entered since its last reset.
    #[default]
    Unvisited,

    /// The node was entered and has not reached a result yet.
    Running,

    /// The node completed successfully.
    Success,

    /// The node failed.
    Failure,
}

impl NodeState {
    /// Returns `true` if this state is `Running`.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, NodeState::Running)
    }

    /// Returns `true` if this state is `Success` or `Failure`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeState::Success | NodeState::Failure)
    }

    /// Swaps `Success` and `Failure`; other states are returned unchanged.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            NodeState::Success => NodeState::Failure,
            NodeState::Failure => NodeState::Success,
            other => other,
        }
    }
}
