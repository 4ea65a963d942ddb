//! The behavior tree: node arena, root, and runtime.

use std::fmt;
use std::sync::Arc;

use crate::NodeState;
use crate::composite::Flow;
use crate::config::TreeConfig;
use crate::context::NodeContext;
use crate::decorator::DecoratorKind;
use crate::error::{Result, TreeError};
use crate::id::{self, IdGenerator, NodeId, NodeKey};
use crate::log::{LogLevel, LogSink, TracingSink};
use crate::node::{Node, NodeKind};
use crate::runtime::TreeRuntime;
use crate::trace::Trace;

/// Structural changes the editing surface subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    RootChanged {
        previous: Option<NodeKey>,
        current: Option<NodeKey>,
    },
    NodeRenamed {
        node: NodeKey,
        previous: String,
        current: String,
    },
}

type Listener = Box<dyn FnMut(&TreeEvent) + Send>;

/// A tree of nodes ticked from a single runtime.
///
/// # Design
///
/// Nodes live in a flat arena owned by the tree and refer to each other by
/// [`NodeKey`]. Parent links are plain back-indices; ownership is the arena.
/// Nodes that are not reachable from the root stay in the arena detached:
/// they have no runtime and are skipped by ticking, flattening, and saving.
///
/// # Ticking
///
/// Each [`tick`](Self::tick) resumes from the runtime's running node instead
/// of the root, so a leaf that reports `Running` is ticked again directly on
/// the next call.
pub struct BehaviorTree<C> {
    pub(crate) id: String,
    pub(crate) nodes: Vec<Node<C>>,
    pub(crate) root: Option<NodeKey>,
    pub(crate) runtime: TreeRuntime,
    pub(crate) config: TreeConfig,
    pub(crate) logger: Arc<dyn LogSink>,
    id_generator: IdGenerator,
    listeners: Vec<Listener>,
}

impl<C> Default for BehaviorTree<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for BehaviorTree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorTree")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("running", &self.runtime.running)
            .finish()
    }
}

impl<C> BehaviorTree<C> {
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        let mut id_generator = id::random();
        Self {
            id: id_generator(),
            nodes: Vec::new(),
            root: None,
            runtime: TreeRuntime::new(&config),
            config,
            logger: Arc::new(TracingSink),
            id_generator,
            listeners: Vec::new(),
        }
    }

    /// Routes diagnostics to `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    /// Uses `generator` for node IDs and draws a fresh tree ID from it.
    pub fn with_id_generator(mut self, mut generator: IdGenerator) -> Self {
        self.id = generator();
        self.id_generator = generator;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn runtime(&self) -> &TreeRuntime {
        &self.runtime
    }

    pub fn trace(&self) -> &Trace {
        &self.runtime.trace
    }

    pub fn running_node(&self) -> Option<NodeKey> {
        self.runtime.running
    }

    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// # Panics
    ///
    /// Panics if `key` was not issued by this tree.
    pub fn node(&self, key: NodeKey) -> &Node<C> {
        &self.nodes[key.0]
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node<C>> {
        self.nodes.get(key.0)
    }

    /// Mutable access to a node's kind, e.g. to reconfigure a leaf.
    pub fn kind_mut(&mut self, key: NodeKey) -> &mut NodeKind<C> {
        &mut self.nodes[key.0].kind
    }

    /// Every node in the arena, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn state(&self, key: NodeKey) -> NodeState {
        self.runtime.state(&self.nodes[key.0].id)
    }

    pub fn context(&self, key: NodeKey) -> Option<&NodeContext> {
        self.runtime.context(&self.nodes[key.0].id)
    }

    pub fn is_attached(&self, key: NodeKey) -> bool {
        self.nodes[key.0].attached
    }

    /// Creates a detached node with a generated ID.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind<C>) -> NodeKey {
        let id = NodeId::new((self.id_generator)());
        self.push_node(Node::new(id, name.into(), kind))
    }

    /// Creates a detached node with the given ID.
    pub fn add_node_with_id(
        &mut self,
        id: impl Into<NodeId>,
        name: impl Into<String>,
        kind: NodeKind<C>,
    ) -> NodeKey {
        self.push_node(Node::new(id.into(), name.into(), kind))
    }

    pub fn sequence(&mut self, name: impl Into<String>) -> NodeKey {
        self.add_node(name, NodeKind::Composite(Flow::Sequence))
    }

    pub fn selector(&mut self, name: impl Into<String>) -> NodeKey {
        self.add_node(name, NodeKind::Composite(Flow::Selector))
    }

    pub fn inverter(&mut self, name: impl Into<String>) -> NodeKey {
        self.add_node(name, NodeKind::Decorator(DecoratorKind::Inverter))
    }

    pub fn succeeder(&mut self, name: impl Into<String>) -> NodeKey {
        self.add_node(name, NodeKind::Decorator(DecoratorKind::Succeeder))
    }

    /// A repeater; negative `times` repeats forever.
    pub fn repeater(&mut self, name: impl Into<String>, times: i32) -> NodeKey {
        self.add_node(name, NodeKind::Decorator(DecoratorKind::Repeater { times }))
    }

    pub fn repeat_until_failure(&mut self, name: impl Into<String>) -> NodeKey {
        self.add_node(name, NodeKind::Decorator(DecoratorKind::RepeatUntilFailure))
    }

    fn push_node(&mut self, node: Node<C>) -> NodeKey {
        let key = NodeKey(self.nodes.len());
        self.nodes.push(node);
        key
    }

    /// Makes `key` the root, installing the runtime on its subtree.
    ///
    /// Any run in progress is interrupted. If `key` had a parent it is
    /// detached from it first; the previous root's subtree is detached.
    pub fn set_root_node(&mut self, key: NodeKey) {
        if self.root == Some(key) {
            return;
        }
        self.interrupt();
        if let Some(parent) = self.nodes[key.0].parent {
            self.unlink(parent, key);
        }
        let previous = self.root.replace(key);
        if let Some(previous) = previous {
            self.cancel_subtree(previous);
            self.mark_attached(previous, false);
        }
        self.mark_attached(key, true);
        self.emit(TreeEvent::RootChanged {
            previous,
            current: Some(key),
        });
    }

    /// Detaches the root, leaving the tree empty.
    pub fn clear_root_node(&mut self) -> Option<NodeKey> {
        let previous = self.root?;
        self.interrupt();
        self.cancel_subtree(previous);
        self.mark_attached(previous, false);
        self.root = None;
        self.emit(TreeEvent::RootChanged {
            previous: Some(previous),
            current: None,
        });
        Some(previous)
    }

    /// Ticks the running node, or the root when the tree is idle.
    ///
    /// A new trace pass starts exactly when the tree was idle before this
    /// call. Returns the root's state after the tick.
    ///
    /// # Errors
    ///
    /// [`TreeError::NoRoot`] if no root node was set.
    pub fn tick(&mut self, ctx: &mut C) -> Result<NodeState> {
        let Some(root) = self.root else {
            self.log(LogLevel::Error, None, "the tree has no root node");
            return Err(TreeError::NoRoot);
        };
        if self.runtime.running.is_none() {
            self.runtime.trace.new_pass();
        }
        let target = self.runtime.running.unwrap_or(root);
        self.run(target, ctx);
        Ok(self.state(root))
    }

    /// Unwinds the run in progress.
    ///
    /// Resets the running node and every ancestor up to the root, then
    /// clears the running node. Nodes off that path are untouched.
    pub fn interrupt(&mut self) {
        let Some(running) = self.runtime.running else {
            return;
        };
        self.footprint(None, "interrupt");
        let mut node = Some(running);
        while let Some(key) = node {
            self.reset(key);
            node = self.nodes[key.0].parent;
        }
        self.set_running(None);
    }

    /// Installs a different runtime and interrupts whatever it was running.
    ///
    /// Returns the runtime that was replaced.
    pub fn replace_runtime(&mut self, runtime: TreeRuntime) -> TreeRuntime {
        let previous = std::mem::replace(&mut self.runtime, runtime);
        self.runtime.running = self
            .runtime
            .running
            .filter(|key| self.nodes.get(key.0).is_some_and(|n| n.attached));
        self.interrupt();
        previous
    }

    /// Preorder walk of the attached tree: root first, then each subtree in
    /// child order.
    pub fn flatten(&self) -> Descendants<'_, C> {
        Descendants {
            nodes: &self.nodes,
            stack: self.root.into_iter().collect(),
        }
    }

    /// Preorder walk of the subtree rooted at `key`.
    pub fn descendants(&self, key: NodeKey) -> Descendants<'_, C> {
        Descendants {
            nodes: &self.nodes,
            stack: vec![key],
        }
    }

    pub fn find_node(&self, id: &str) -> Option<NodeKey> {
        self.flatten()
            .find(|key| self.nodes[key.0].id.as_str() == id)
    }

    pub fn find_node_by_name(&self, name: &str) -> Option<NodeKey> {
        self.flatten().find(|key| self.nodes[key.0].name == name)
    }

    pub fn rename(&mut self, key: NodeKey, name: impl Into<String>) {
        let current = name.into();
        let previous = std::mem::replace(&mut self.nodes[key.0].name, current.clone());
        if previous != current {
            self.emit(TreeEvent::NodeRenamed {
                node: key,
                previous,
                current,
            });
        }
    }

    /// Disabled nodes are skipped by their parents and never run.
    ///
    /// Disabling a node on the running path interrupts the tree first.
    pub fn set_disabled(&mut self, key: NodeKey, disabled: bool) {
        if disabled
            && let Some(running) = self.runtime.running
            && self.is_within(running, key)
        {
            self.interrupt();
        }
        self.nodes[key.0].disabled = disabled;
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TreeEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn emit(&mut self, event: TreeEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// `true` if `key` is `ancestor` or lies below it.
    pub fn is_within(&self, key: NodeKey, ancestor: NodeKey) -> bool {
        let mut node = Some(key);
        while let Some(current) = node {
            if current == ancestor {
                return true;
            }
            node = self.nodes[current.0].parent;
        }
        false
    }

    pub(crate) fn top_of(&self, key: NodeKey) -> NodeKey {
        let mut top = key;
        while let Some(parent) = self.nodes[top.0].parent {
            top = parent;
        }
        top
    }

    pub(crate) fn mark_attached(&mut self, key: NodeKey, attached: bool) {
        let keys: Vec<_> = self.descendants(key).collect();
        for key in keys {
            self.nodes[key.0].attached = attached;
        }
    }

    /// Resets a subtree that is about to change place and drops its
    /// contexts, interrupting the tree if the run is inside it.
    pub(crate) fn cancel_subtree(&mut self, key: NodeKey) {
        if let Some(running) = self.runtime.running
            && self.is_within(running, key)
        {
            self.interrupt();
        }
        let keys: Vec<_> = self.descendants(key).collect();
        for key in keys {
            if self.state(key) != NodeState::Unvisited {
                self.reset(key);
            }
            self.runtime.contexts.remove(&self.nodes[key.0].id);
        }
    }
}

/// Lazy preorder iterator over node keys.
pub struct Descendants<'a, C> {
    nodes: &'a [Node<C>],
    stack: Vec<NodeKey>,
}

impl<C> Iterator for Descendants<'_, C> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let key = self.stack.pop()?;
        self.stack
            .extend(self.nodes[key.0].children.iter().rev().copied());
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{CallbackNode, NodeKind};

    struct TestContext {
        ticks: u32,
    }

    fn leaf(outcome: NodeState) -> NodeKind<TestContext> {
        NodeKind::leaf(CallbackNode::new().on_tick(move |ctx: &mut TestContext| {
            ctx.ticks += 1;
            outcome
        }))
    }

    #[test]
    fn tick_without_root_fails() {
        let mut tree = BehaviorTree::<TestContext>::new();
        let mut ctx = TestContext { ticks: 0 };
        assert!(matches!(tree.tick(&mut ctx), Err(TreeError::NoRoot)));
    }

    #[test]
    fn flatten_is_preorder() {
        let mut tree = BehaviorTree::<TestContext>::new();
        let root = tree.sequence("root");
        let a = tree.selector("a");
        let a1 = tree.add_node("a1", leaf(NodeState::Success));
        let a2 = tree.add_node("a2", leaf(NodeState::Success));
        let b = tree.add_node("b", leaf(NodeState::Success));
        tree.add_children(root, [a, b]).unwrap();
        tree.add_children(a, [a1, a2]).unwrap();
        tree.set_root_node(root);

        let order: Vec<_> = tree.flatten().collect();
        assert_eq!(order, vec![root, a, a1, a2, b]);
        assert_eq!(tree.find_node_by_name("a2"), Some(a2));
        let b_id = tree.node(b).id().as_str().to_owned();
        assert_eq!(tree.find_node(&b_id), Some(b));
        assert_eq!(tree.find_node("missing"), None);
    }

    #[test]
    fn detached_nodes_are_not_flattened() {
        let mut tree = BehaviorTree::<TestContext>::new();
        let root = tree.sequence("root");
        let orphan = tree.add_node("orphan", leaf(NodeState::Success));
        tree.set_root_node(root);
        assert_eq!(tree.flatten().count(), 1);
        assert!(!tree.is_attached(orphan));
        assert_eq!(tree.find_node_by_name("orphan"), None);
    }

    #[test]
    fn root_change_and_rename_are_published() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut tree = BehaviorTree::<TestContext>::new();
        let sink = events.clone();
        tree.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let root = tree.sequence("root");
        tree.set_root_node(root);
        tree.rename(root, "main");
        tree.rename(root, "main");

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                TreeEvent::RootChanged {
                    previous: None,
                    current: Some(root)
                },
                TreeEvent::NodeRenamed {
                    node: root,
                    previous: "root".into(),
                    current: "main".into()
                },
            ]
        );
    }

    #[test]
    fn replacing_root_detaches_previous_subtree() {
        let mut tree = BehaviorTree::<TestContext>::new();
        let first = tree.add_node("first", leaf(NodeState::Running));
        let second = tree.add_node("second", leaf(NodeState::Running));
        tree.set_root_node(first);
        let mut ctx = TestContext { ticks: 0 };
        tree.tick(&mut ctx).unwrap();
        assert_eq!(tree.running_node(), Some(first));

        tree.set_root_node(second);
        assert_eq!(tree.running_node(), None);
        assert!(!tree.is_attached(first));
        assert_eq!(tree.state(first), NodeState::Unvisited);
        assert!(tree.context(first).is_none());
    }

    #[test]
    fn replace_runtime_interrupts() {
        let mut tree = BehaviorTree::<TestContext>::new();
        let root = tree.add_node("leaf", leaf(NodeState::Running));
        tree.set_root_node(root);
        let mut ctx = TestContext { ticks: 0 };
        tree.tick(&mut ctx).unwrap();

        let old = tree.replace_runtime(TreeRuntime::new(&TreeConfig::default()));
        assert_eq!(old.running_node(), Some(root));
        assert_eq!(tree.running_node(), None);
        assert_eq!(tree.state(root), NodeState::Unvisited);
    }

    #[test]
    fn disabling_running_node_interrupts() {
        let mut tree = BehaviorTree::<TestContext>::new();
        let root = tree.sequence("root");
        let child = tree.add_node("child", leaf(NodeState::Running));
        tree.add_child(root, child).unwrap();
        tree.set_root_node(root);
        let mut ctx = TestContext { ticks: 0 };
        tree.tick(&mut ctx).unwrap();
        assert_eq!(tree.running_node(), Some(child));

        tree.set_disabled(child, true);
        assert_eq!(tree.running_node(), None);
        assert_eq!(tree.state(root), NodeState::Unvisited);
    }
}
