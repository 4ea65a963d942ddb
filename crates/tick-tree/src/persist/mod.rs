//! Two-tier binary persistence.
//!
//! The static tree and its execution progress are saved as two independent
//! bincode blobs:
//!
//! - [`TreeRecord`]: node records in preorder, so every parent is written
//!   (and therefore loaded) before its children
//! - [`RuntimeRecord`]: the running node and one context per visited node,
//!   resolved by node ID against an already loaded tree
//!
//! Node kinds are rebuilt from their type tag through a [`NodeRegistry`].

pub mod file;
pub mod loader;
pub mod registry;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub use file::TreeFileStore;
pub use loader::NodeLoader;
pub use registry::{NodeFactory, NodeRegistry};

use crate::NodeState;
use crate::context::{ContextData, NodeContext};
use crate::decorator::DecoratorKind;
use crate::error::{Result, TreeError};
use crate::id::{NodeId, NodeKey};
use crate::log::LogLevel;
use crate::node::NodeKind;
use crate::runtime::TreeRuntime;
use crate::tree::{BehaviorTree, TreeEvent};

/// Type-specific fields of a saved node.
pub type Extra = BTreeMap<String, ExtraValue>;

/// Value stored in a node's [`Extra`] map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtraValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl ExtraValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ExtraValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ExtraValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ExtraValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExtraValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ExtraValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

/// Key under which a repeater stores its target count.
pub const REPEATER_TIMES: &str = "times";

/// Static description of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_type: String,
    pub id: NodeId,
    pub name: String,
    pub parent_id: Option<NodeId>,
    pub is_disabled: bool,
    pub extra: Extra,
}

/// Static tree blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub tree_id: String,
    pub root_id: Option<NodeId>,
    /// Parent before child.
    pub nodes: Vec<NodeRecord>,
}

/// Runtime slot of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub node_id: NodeId,
    pub state: NodeState,
    pub data: ContextData,
}

/// Runtime state blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRecord {
    pub tree_id: String,
    pub running_node_id: Option<NodeId>,
    pub contexts: Vec<ContextRecord>,
}

impl<C> BehaviorTree<C> {
    /// Describes the attached tree in preorder.
    pub fn to_record(&self) -> TreeRecord {
        let nodes = self
            .flatten()
            .map(|key| {
                let node = &self.nodes[key.0];
                let mut extra = Extra::new();
                match &node.kind {
                    NodeKind::Decorator(DecoratorKind::Repeater { times }) => {
                        extra.insert(
                            REPEATER_TIMES.to_owned(),
                            ExtraValue::Int(i64::from(*times)),
                        );
                    }
                    NodeKind::Leaf(behavior) => behavior.write_extra(&mut extra),
                    _ => {}
                }
                NodeRecord {
                    node_type: node.type_tag().to_owned(),
                    id: node.id.clone(),
                    name: node.name.clone(),
                    parent_id: node.parent.map(|p| self.nodes[p.0].id.clone()),
                    is_disabled: node.disabled,
                    extra,
                }
            })
            .collect();
        TreeRecord {
            tree_id: self.id.clone(),
            root_id: self.root.map(|r| self.nodes[r.0].id.clone()),
            nodes,
        }
    }

    /// Encodes the static tree.
    pub fn save(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.to_record())?)
    }

    /// Replaces this tree's nodes with the ones in `bytes`.
    ///
    /// The runtime is replaced by an empty one. The config, logger, ID
    /// generator and subscribers of this tree are kept. Subscribers get a
    /// [`TreeEvent::RootChanged`] with no previous root, since keys of the
    /// replaced nodes are not valid any more.
    pub fn load(&mut self, bytes: &[u8], registry: &NodeRegistry<C>) -> Result<()> {
        let record: TreeRecord = bincode::deserialize(bytes)?;
        self.load_record(&record, registry)
    }

    pub fn load_record(&mut self, record: &TreeRecord, registry: &NodeRegistry<C>) -> Result<()> {
        let mut loader = NodeLoader::new(registry, &*self.logger);
        loader.load_all(&record.nodes)?;
        let root = record.root_id.as_ref().and_then(|id| loader.resolve(id));
        let nodes = loader.into_nodes();

        // Keys of the replaced arena mean nothing in the new one.
        self.root = None;
        self.nodes = nodes;
        self.id = record.tree_id.clone();
        self.runtime = TreeRuntime::new(&self.config);

        match root {
            Some(root) => {
                self.root = Some(root);
                self.mark_attached(root, true);
            }
            None => self.log(LogLevel::Warn, None, "loaded tree has no root node"),
        }
        self.emit(TreeEvent::RootChanged {
            previous: None,
            current: self.root,
        });
        tracing::debug!(
            tree_id = %self.id,
            nodes = self.nodes.len(),
            "loaded tree"
        );
        Ok(())
    }

    /// Snapshot of the runtime: running node and every context.
    pub fn runtime_record(&self) -> RuntimeRecord {
        let running_node_id = self.runtime.running.map(|key| self.nodes[key.0].id.clone());
        let contexts = self
            .runtime
            .contexts
            .iter()
            .map(|(id, context)| ContextRecord {
                node_id: id.clone(),
                state: context.state,
                data: context.data,
            })
            .collect();
        RuntimeRecord {
            tree_id: self.id.clone(),
            running_node_id,
            contexts,
        }
    }

    /// Encodes the runtime state.
    pub fn save_runtime(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.runtime_record())?)
    }

    /// Restores runtime state saved from a tree with the same node IDs.
    pub fn load_runtime(&mut self, bytes: &[u8]) -> Result<()> {
        let record: RuntimeRecord = bincode::deserialize(bytes)?;
        self.load_runtime_record(&record)
    }

    /// Installs `record` as the runtime. The current trace is kept.
    ///
    /// # Errors
    ///
    /// [`TreeError::NodeNotFound`] if a context names a node that is not
    /// part of the attached tree. The current runtime is left untouched.
    pub fn load_runtime_record(&mut self, record: &RuntimeRecord) -> Result<()> {
        if record.tree_id != self.id {
            self.log(
                LogLevel::Warn,
                None,
                format!(
                    "runtime of tree {} loaded into tree {}",
                    record.tree_id, self.id
                ),
            );
        }
        let keys: HashMap<&NodeId, NodeKey> = self
            .flatten()
            .map(|key| (&self.nodes[key.0].id, key))
            .collect();

        let mut contexts = BTreeMap::new();
        for context in &record.contexts {
            let Some(&key) = keys.get(&context.node_id) else {
                return Err(TreeError::NodeNotFound {
                    id: context.node_id.clone(),
                    context: "failed loading node context",
                });
            };
            let data = self.checked_context_data(key, context.data);
            contexts.insert(
                context.node_id.clone(),
                NodeContext {
                    state: context.state,
                    data,
                },
            );
        }

        let running = match &record.running_node_id {
            Some(id) => {
                let key = keys.get(id).copied();
                if key.is_none() {
                    self.log(
                        LogLevel::Warn,
                        None,
                        format!("saved running node ({id}) not found"),
                    );
                }
                key
            }
            None => None,
        };

        self.runtime.running = running;
        self.runtime.contexts = contexts;
        Ok(())
    }

    /// `data` if it fits the node's kind, its zero value otherwise.
    ///
    /// A composite cursor must point inside the child list.
    fn checked_context_data(&self, key: NodeKey, data: ContextData) -> ContextData {
        let node = &self.nodes[key.0];
        let expected = node.kind.context_data();
        let fits = match (expected, data) {
            (ContextData::Composite { .. }, ContextData::Composite { current }) => {
                current.is_none_or(|index| index < node.children.len())
            }
            (ContextData::Repeater { .. }, ContextData::Repeater { .. })
            | (ContextData::Empty, ContextData::Empty) => true,
            _ => false,
        };
        if fits {
            return data;
        }
        self.log(
            LogLevel::Warn,
            Some(key),
            format!("saved context data {data:?} does not fit this node, reset"),
        );
        expected
    }
}
