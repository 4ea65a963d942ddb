//! Tree configuration.

use serde::{Deserialize, Serialize};

/// Ambient settings of a [`BehaviorTree`](crate::BehaviorTree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Record footprints into the runtime trace (default: true)
    pub trace_enabled: bool,
    /// Passes kept in the trace; `None` keeps every pass (default: 64)
    pub max_trace_passes: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            trace_enabled: true,
            max_trace_passes: Some(64),
        }
    }
}
