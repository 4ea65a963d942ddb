//! Nodes and the shared tick protocol.
//!
//! Every node kind goes through the same lifecycle:
//!
//! 1. **Enter**: the node was not `Running`; `initialize` runs and the node
//!    becomes the runtime's running node.
//! 2. **Tick**: the node is marked `Running` and does its kind-specific work
//!    (tick the active child, or the leaf behavior).
//! 3. **Exit**: once the node is no longer `Running`, it cleans up, hands the
//!    running-node cursor to its parent, and tells the parent so the parent
//!    can decide its own next state.
//!
//! Resetting a node returns it to `Unvisited` from any state.

use std::fmt;

use crate::NodeState;
use crate::behavior::Behavior;
use crate::composite::Flow;
use crate::context::{ContextData, NodeContext};
use crate::decorator::DecoratorKind;
use crate::id::{NodeId, NodeKey};
use crate::log::{LogLevel, NodeLabel};
use crate::tree::BehaviorTree;

/// What a node does when ticked.
pub enum NodeKind<C> {
    /// Ordered children with AND/OR control flow.
    Composite(Flow),
    /// Exactly one child whose result is transformed.
    Decorator(DecoratorKind),
    /// Host-supplied behavior.
    Leaf(Box<dyn Behavior<C>>),
}

/// Copyable summary of a [`NodeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Composite(Flow),
    Decorator(DecoratorKind),
    Leaf,
}

impl<C> NodeKind<C> {
    pub fn leaf(behavior: impl Behavior<C> + 'static) -> Self {
        NodeKind::Leaf(Box::new(behavior))
    }

    pub fn shape(&self) -> NodeShape {
        match self {
            NodeKind::Composite(flow) => NodeShape::Composite(*flow),
            NodeKind::Decorator(kind) => NodeShape::Decorator(*kind),
            NodeKind::Leaf(_) => NodeShape::Leaf,
        }
    }

    /// Tag written to saved node records.
    pub fn type_tag(&self) -> &'static str {
        match self {
            NodeKind::Composite(flow) => flow.type_tag(),
            NodeKind::Decorator(kind) => kind.type_tag(),
            NodeKind::Leaf(behavior) => behavior.type_tag(),
        }
    }

    pub fn is_parent(&self) -> bool {
        !matches!(self, NodeKind::Leaf(_))
    }

    pub(crate) fn context_data(&self) -> ContextData {
        match self {
            NodeKind::Composite(_) => ContextData::Composite { current: None },
            NodeKind::Decorator(DecoratorKind::Repeater { .. }) => {
                ContextData::Repeater { executed: 0 }
            }
            _ => ContextData::Empty,
        }
    }
}

impl<C> fmt::Debug for NodeKind<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Composite(flow) => f.debug_tuple("Composite").field(flow).finish(),
            NodeKind::Decorator(kind) => f.debug_tuple("Decorator").field(kind).finish(),
            NodeKind::Leaf(behavior) => f.debug_tuple("Leaf").field(&behavior.type_tag()).finish(),
        }
    }
}

/// Static part of a node: identity, structure, and kind.
///
/// Runtime state lives in the tree's [`TreeRuntime`](crate::TreeRuntime).
#[derive(Debug)]
pub struct Node<C> {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) disabled: bool,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    /// Reachable from the tree's root, i.e. the runtime is installed.
    pub(crate) attached: bool,
    pub(crate) kind: NodeKind<C>,
}

impl<C> Node<C> {
    pub(crate) fn new(id: NodeId, name: String, kind: NodeKind<C>) -> Self {
        Self {
            id,
            name,
            disabled: false,
            parent: None,
            children: Vec::new(),
            attached: false,
            kind,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// The single child of a decorator (or the first child of a composite).
    pub fn child(&self) -> Option<NodeKey> {
        self.children.first().copied()
    }

    pub fn kind(&self) -> &NodeKind<C> {
        &self.kind
    }

    pub fn shape(&self) -> NodeShape {
        self.kind.shape()
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn label(&self) -> NodeLabel {
        NodeLabel {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

impl<C> fmt::Display for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.id, self.type_tag())
    }
}

impl<C> BehaviorTree<C> {
    /// Ticks one node directly, resuming it if it is running.
    ///
    /// A node that is not attached to this tree's root has no runtime; the
    /// call is reported as an error diagnostic and does nothing.
    pub fn tick_node(&mut self, key: NodeKey, ctx: &mut C) {
        if !self.nodes[key.0].attached {
            self.log(LogLevel::Error, Some(key), "this node has no runtime");
            return;
        }
        self.run(key, ctx);
    }

    /// Returns `key` to `Unvisited`, running its clean-up if it was visited.
    pub fn reset(&mut self, key: NodeKey) {
        self.footprint(Some(key), "reset");
        if self.state(key) != NodeState::Unvisited {
            self.clean_up(key);
            if let Some(context) = self.runtime.contexts.get_mut(&self.nodes[key.0].id) {
                context.reset();
            }
            self.set_state(key, NodeState::Unvisited);
        }
    }

    pub(crate) fn run(&mut self, key: NodeKey, ctx: &mut C) {
        if self.nodes[key.0].disabled {
            self.set_state(key, NodeState::Unvisited);
            self.footprint(Some(key), "skip: disabled");
            return;
        }
        if !self.state(key).is_running() {
            self.enter(key, ctx);
        }
        self.set_state(key, NodeState::Running);
        self.footprint(Some(key), "tick");
        self.do_tick(key, ctx);
        self.try_exit(key);
    }

    fn enter(&mut self, key: NodeKey, ctx: &mut C) {
        if self.state(key).is_terminal() {
            self.context_mut(key).reset();
            self.set_state(key, NodeState::Unvisited);
        }
        self.footprint(Some(key), "enter");
        self.initialize(key, ctx);
        self.set_running(Some(key));
    }

    fn initialize(&mut self, key: NodeKey, ctx: &mut C) {
        match self.nodes[key.0].shape() {
            NodeShape::Composite(_) => self.composite_initialize(key),
            NodeShape::Decorator(kind) => self.decorator_initialize(key, kind),
            NodeShape::Leaf => {
                if let NodeKind::Leaf(behavior) = &mut self.nodes[key.0].kind {
                    behavior.initialize(ctx);
                }
            }
        }
    }

    fn do_tick(&mut self, key: NodeKey, ctx: &mut C) {
        match self.nodes[key.0].shape() {
            NodeShape::Composite(_) => self.composite_tick(key, ctx),
            NodeShape::Decorator(kind) => self.decorator_tick(key, kind, ctx),
            NodeShape::Leaf => {
                let next = match &mut self.nodes[key.0].kind {
                    NodeKind::Leaf(behavior) => behavior.tick(ctx),
                    _ => return,
                };
                self.set_state(key, next);
            }
        }
    }

    /// Exits `key` if it is the running node and has stopped running.
    ///
    /// A parent whose child finished can be exited twice in one tick: once
    /// from the child's exit notification and once at the end of its own
    /// tick. Only the first call passes the running-node check.
    pub(crate) fn try_exit(&mut self, key: NodeKey) {
        if self.runtime.running != Some(key) || self.state(key).is_running() {
            return;
        }
        self.footprint(Some(key), "exit");
        self.clean_up(key);
        if self.state(key) != NodeState::Unvisited {
            let parent = self.nodes[key.0].parent;
            self.set_running(parent);
            if let Some(parent) = parent {
                self.after_child_exit(parent, key);
            }
        }
    }

    fn after_child_exit(&mut self, parent: NodeKey, child: NodeKey) {
        match self.nodes[parent.0].shape() {
            NodeShape::Composite(flow) => self.composite_after_child_exit(parent, flow, child),
            NodeShape::Decorator(kind) => self.decorator_after_child_exit(parent, kind, child),
            NodeShape::Leaf => {
                self.log(
                    LogLevel::Warn,
                    Some(parent),
                    format!("leaf received exit of child {}", self.nodes[child.0]),
                );
            }
        }
    }

    fn clean_up(&mut self, key: NodeKey) {
        if let NodeKind::Leaf(behavior) = &mut self.nodes[key.0].kind {
            behavior.clean_up();
        }
    }

    pub(crate) fn set_running(&mut self, key: Option<NodeKey>) {
        if self.runtime.running == key {
            return;
        }
        match key {
            Some(key) => self.footprint(Some(key), "becomes running node"),
            None => self.footprint(None, "running node cleared"),
        }
        self.runtime.running = key;
        if let Some(key) = key {
            self.context_mut(key);
        }
    }

    pub(crate) fn context_mut(&mut self, key: NodeKey) -> &mut NodeContext {
        let node = &self.nodes[key.0];
        self.runtime
            .contexts
            .entry(node.id.clone())
            .or_insert_with(|| NodeContext::new(node.kind.context_data()))
    }

    pub(crate) fn set_state(&mut self, key: NodeKey, state: NodeState) {
        let id = &self.nodes[key.0].id;
        if state == NodeState::Unvisited && !self.runtime.contexts.contains_key(id) {
            return;
        }
        let context = self.context_mut(key);
        let previous = context.state;
        context.state = state;
        if previous != state {
            self.footprint(Some(key), format!("state change: {previous} -> {state}"));
        }
    }

    pub(crate) fn footprint(&mut self, key: Option<NodeKey>, message: impl Into<String>) {
        let node = key.map(|k| &self.nodes[k.0]);
        self.runtime
            .trace
            .add(node.map(|n| (&n.id, n.name.as_str())), message);
    }

    pub(crate) fn log(&self, level: LogLevel, key: Option<NodeKey>, message: impl Into<String>) {
        self.logger.log(crate::log::TreeLog {
            level,
            message: message.into(),
            node: key.map(|k| self.nodes[k.0].label()),
        });
    }
}
