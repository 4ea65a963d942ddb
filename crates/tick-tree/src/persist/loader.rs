//! Rebuilds nodes from saved records.

use std::collections::HashMap;

use crate::decorator::DecoratorKind;
use crate::error::{Result, TreeError};
use crate::id::{NodeId, NodeKey};
use crate::log::{LogLevel, LogSink, TreeLog};
use crate::node::{Node, NodeKind};
use crate::persist::{NodeRecord, NodeRegistry, REPEATER_TIMES};

/// Builds a node arena from records given parent before child.
///
/// Each loaded node is cached by ID so that later records can bind to their
/// parent. A parent that is unknown or cannot take children is reported as
/// a warning and the node stays parentless.
pub struct NodeLoader<'a, C> {
    registry: &'a NodeRegistry<C>,
    logger: &'a dyn LogSink,
    nodes: Vec<Node<C>>,
    cache: HashMap<NodeId, NodeKey>,
}

impl<'a, C> NodeLoader<'a, C> {
    pub fn new(registry: &'a NodeRegistry<C>, logger: &'a dyn LogSink) -> Self {
        Self {
            registry,
            logger,
            nodes: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Forgets every node loaded so far.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.cache.clear();
    }

    pub fn load_all<'r>(
        &mut self,
        records: impl IntoIterator<Item = &'r NodeRecord>,
    ) -> Result<()> {
        for record in records {
            self.load(record)?;
        }
        Ok(())
    }

    /// Loads one record.
    ///
    /// # Errors
    ///
    /// - [`TreeError::DuplicateNodeId`] if the ID was already loaded
    /// - [`TreeError::UnknownNodeType`] if the registry has no such tag
    pub fn load(&mut self, record: &NodeRecord) -> Result<NodeKey> {
        if self.cache.contains_key(&record.id) {
            return Err(TreeError::DuplicateNodeId(record.id.clone()));
        }
        let mut kind = self.registry.create(&record.node_type)?;
        match &mut kind {
            NodeKind::Decorator(DecoratorKind::Repeater { times }) => {
                if let Some(saved) = record.extra.get(REPEATER_TIMES).and_then(|v| v.as_int()) {
                    *times = i32::try_from(saved).unwrap_or(if saved < 0 { -1 } else { i32::MAX });
                }
            }
            NodeKind::Leaf(behavior) => behavior.read_extra(&record.extra),
            _ => {}
        }

        let key = NodeKey(self.nodes.len());
        let mut node = Node::new(record.id.clone(), record.name.clone(), kind);
        node.disabled = record.is_disabled;
        self.nodes.push(node);
        self.cache.insert(record.id.clone(), key);

        if let Some(parent_id) = &record.parent_id {
            self.bind_parent(key, parent_id);
        }
        Ok(key)
    }

    pub fn resolve(&self, id: &NodeId) -> Option<NodeKey> {
        self.cache.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn into_nodes(self) -> Vec<Node<C>> {
        self.nodes
    }

    fn bind_parent(&mut self, key: NodeKey, parent_id: &NodeId) {
        let Some(parent) = self.resolve(parent_id) else {
            self.warn(
                key,
                format!("failed binding saved parent ({parent_id}): not loaded yet"),
            );
            return;
        };
        let slot_taken = match self.nodes[parent.0].kind {
            NodeKind::Composite(_) => false,
            NodeKind::Decorator(_) => !self.nodes[parent.0].children.is_empty(),
            NodeKind::Leaf(_) => {
                self.warn(
                    key,
                    format!("failed binding saved parent ({parent_id}): not a parent"),
                );
                return;
            }
        };
        if slot_taken {
            self.warn(
                key,
                format!("failed binding saved parent ({parent_id}): child slot taken"),
            );
            return;
        }
        self.nodes[parent.0].children.push(key);
        self.nodes[key.0].parent = Some(parent);
    }

    fn warn(&self, key: NodeKey, message: String) {
        self.logger.log(TreeLog {
            level: LogLevel::Warn,
            message,
            node: Some(self.nodes[key.0].label()),
        });
    }
}
