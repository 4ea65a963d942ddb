//! Builder utilities for ergonomic behavior tree construction.
//!
//! This module provides helper functions to reduce boilerplate when building
//! behavior trees. Instead of creating every node and attaching it by hand,
//! describe the tree as nested [`NodeSpec`]s and hand it to
//! [`BehaviorTree::build_root`].
//!
//! ```
//! use tick_tree::builder::{callback, selector, sequence, succeeder};
//! use tick_tree::{BehaviorTree, NodeState};
//!
//! let mut tree = BehaviorTree::<u32>::new();
//! let root = tree
//!     .build_root(selector(
//!         "root",
//!         vec![
//!             sequence("attack", vec![callback("in range", |d: &mut u32| {
//!                 if *d < 2 { NodeState::Success } else { NodeState::Failure }
//!             })]),
//!             succeeder("idle", callback("wait", |_: &mut u32| NodeState::Failure)),
//!         ],
//!     ))
//!     .unwrap();
//!
//! let mut distance = 5;
//! assert_eq!(tree.tick(&mut distance).unwrap(), NodeState::Running);
//! assert_eq!(tree.tick(&mut distance).unwrap(), NodeState::Success);
//! # let _ = root;
//! ```

use crate::NodeState;
use crate::behavior::{Behavior, CallbackNode};
use crate::composite::Flow;
use crate::decorator::DecoratorKind;
use crate::error::Result;
use crate::id::{NodeId, NodeKey};
use crate::node::NodeKind;
use crate::tree::BehaviorTree;

/// Blueprint of a node and its subtree.
pub struct NodeSpec<C> {
    id: Option<NodeId>,
    name: String,
    disabled: bool,
    kind: NodeKind<C>,
    children: Vec<NodeSpec<C>>,
}

impl<C> NodeSpec<C> {
    pub fn new(name: impl Into<String>, kind: NodeKind<C>) -> Self {
        Self {
            id: None,
            name: name.into(),
            disabled: false,
            kind,
            children: Vec::new(),
        }
    }

    /// Uses a fixed ID instead of a generated one.
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn child(mut self, child: NodeSpec<C>) -> Self {
        self.children.push(child);
        self
    }
}

/// Creates a sequence node.
#[inline]
pub fn sequence<C>(name: impl Into<String>, children: Vec<NodeSpec<C>>) -> NodeSpec<C> {
    composite(name, Flow::Sequence, children)
}

/// Creates a selector node.
#[inline]
pub fn selector<C>(name: impl Into<String>, children: Vec<NodeSpec<C>>) -> NodeSpec<C> {
    composite(name, Flow::Selector, children)
}

/// Creates an inverter node.
#[inline]
pub fn inverter<C>(name: impl Into<String>, child: NodeSpec<C>) -> NodeSpec<C> {
    decorator(name, DecoratorKind::Inverter, child)
}

/// Creates a succeeder node.
#[inline]
pub fn succeeder<C>(name: impl Into<String>, child: NodeSpec<C>) -> NodeSpec<C> {
    decorator(name, DecoratorKind::Succeeder, child)
}

/// Creates a repeater node; negative `times` repeats forever.
#[inline]
pub fn repeater<C>(name: impl Into<String>, times: i32, child: NodeSpec<C>) -> NodeSpec<C> {
    decorator(name, DecoratorKind::Repeater { times }, child)
}

#[inline]
pub fn repeat_until_failure<C>(name: impl Into<String>, child: NodeSpec<C>) -> NodeSpec<C> {
    decorator(name, DecoratorKind::RepeatUntilFailure, child)
}

/// Creates a leaf node running `behavior`.
#[inline]
pub fn leaf<C>(name: impl Into<String>, behavior: impl Behavior<C> + 'static) -> NodeSpec<C> {
    NodeSpec::new(name, NodeKind::leaf(behavior))
}

/// Creates a [`CallbackNode`] leaf that ticks `f`.
#[inline]
pub fn callback<C: 'static>(
    name: impl Into<String>,
    f: impl FnMut(&mut C) -> NodeState + Send + 'static,
) -> NodeSpec<C> {
    leaf(name, CallbackNode::new().on_tick(f))
}

fn composite<C>(name: impl Into<String>, flow: Flow, children: Vec<NodeSpec<C>>) -> NodeSpec<C> {
    let mut spec = NodeSpec::new(name, NodeKind::Composite(flow));
    spec.children = children;
    spec
}

fn decorator<C>(name: impl Into<String>, kind: DecoratorKind, child: NodeSpec<C>) -> NodeSpec<C> {
    NodeSpec::new(name, NodeKind::Decorator(kind)).child(child)
}

impl<C> BehaviorTree<C> {
    /// Creates the nodes of `spec` in preorder and links them.
    ///
    /// The subtree is left detached. A decorator given several children
    /// keeps the last one.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotAParent`](crate::TreeError::NotAParent) if a leaf
    /// spec has children.
    pub fn build(&mut self, spec: NodeSpec<C>) -> Result<NodeKey> {
        let NodeSpec {
            id,
            name,
            disabled,
            kind,
            children,
        } = spec;
        let key = match id {
            Some(id) => self.add_node_with_id(id, name, kind),
            None => self.add_node(name, kind),
        };
        self.nodes[key.0].disabled = disabled;
        for child in children {
            let child = self.build(child)?;
            self.add_child(key, child)?;
        }
        Ok(key)
    }

    /// Builds `spec` and makes it the root.
    pub fn build_root(&mut self, spec: NodeSpec<C>) -> Result<NodeKey> {
        let root = self.build(spec)?;
        self.set_root_node(root);
        Ok(root)
    }
}
