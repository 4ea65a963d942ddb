//! Resumable behavior tree engine.
//!
//! A tree is ticked once per control step. Instead of walking down from the
//! root every time, each tick resumes at the node that was left `Running`,
//! so long actions cost one leaf tick per step.
//!
//! - **Running-node cursor**: the runtime remembers the single node in
//!   progress; finished nodes hand the cursor back to their parent
//! - **Separate runtime**: per-node state lives in a [`TreeRuntime`] keyed by
//!   node ID, so structure and progress are saved and swapped independently
//! - **Diagnostics, not panics**: bad nodes met while ticking fail and report
//!   through a [`LogSink`] instead of aborting the tick loop
//!
//! # Architecture
//!
//! - [`BehaviorTree`]: node arena, root, runtime, and structural edits
//! - [`Behavior`]: trait implemented by host leaves ([`CallbackNode`] built in)
//! - [`NodeState`]: Unvisited, Running, Success, or Failure
//! - Composite nodes: [`Flow::Sequence`], [`Flow::Selector`]
//! - Decorator nodes: [`DecoratorKind::Inverter`], [`DecoratorKind::Succeeder`],
//!   [`DecoratorKind::Repeater`], [`DecoratorKind::RepeatUntilFailure`]
//! - [`Trace`]: footprints of every tick, grouped in passes
//! - [`persist`]: bincode blobs for the static tree and the runtime

pub mod behavior;
pub mod builder;
pub mod composite;
pub mod config;
pub mod context;
pub mod decorator;
mod edit;
pub mod error;
pub mod id;
pub mod log;
pub mod node;
pub mod persist;
pub mod runtime;
pub mod status;
pub mod trace;
pub mod tree;

// Re-export core types for ergonomic API
pub use behavior::{Behavior, CallbackNode};
pub use builder::NodeSpec;
pub use composite::Flow;
pub use config::TreeConfig;
pub use context::{ContextData, NodeContext};
pub use decorator::DecoratorKind;
pub use error::{Result, TreeError};
pub use id::{NodeId, NodeKey};
pub use log::{LogLevel, LogSink, MemorySink, NodeLabel, TracingSink, TreeLog};
pub use node::{Node, NodeKind, NodeShape};
pub use persist::{
    ContextRecord, Extra, ExtraValue, NodeLoader, NodeRecord, NodeRegistry, RuntimeRecord,
    TreeFileStore, TreeRecord,
};
pub use runtime::TreeRuntime;
pub use status::NodeState;
pub use trace::{Footprint, Pass, Trace};
pub use tree::{BehaviorTree, Descendants, TreeEvent};
