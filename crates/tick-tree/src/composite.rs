//! Composite behavior nodes.
//!
//! Composite nodes control the execution flow of an ordered list of
//! children. This module provides the fundamental building blocks for
//! creating complex decision trees: [`Flow::Sequence`] (AND logic) and
//! [`Flow::Selector`] (OR logic).
//!
//! A composite keeps a cursor on its current child in its runtime context.
//! Disabled children are invisible to the cursor: they are skipped both when
//! entering and when advancing, without shifting sibling indices.

use crate::NodeState;
use crate::error::{Result, TreeError};
use crate::id::NodeKey;
use crate::log::LogLevel;
use crate::node::NodeShape;
use crate::tree::BehaviorTree;

/// Control flow of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Runs children left to right until one fails.
    ///
    /// - If a child returns `Failure`, the sequence **stops** and fails
    /// - If a child returns `Success`, the sequence **continues** to the next child
    /// - If all children succeed, the sequence succeeds
    ///
    /// This is analogous to a short-circuited logical AND (&&) operation.
    Sequence,

    /// Runs children left to right until one succeeds.
    ///
    /// - If a child returns `Success`, the selector **stops** and succeeds
    /// - If a child returns `Failure`, the selector **continues** to the next child
    /// - If all children fail, the selector fails
    ///
    /// This is analogous to a short-circuited logical OR (||) operation.
    Selector,
}

impl Flow {
    pub const fn type_tag(self) -> &'static str {
        match self {
            Flow::Sequence => "Sequence",
            Flow::Selector => "Selector",
        }
    }
}

impl<C> BehaviorTree<C> {
    /// The child a composite will tick next, skipping disabled children.
    pub fn current_child(&self, key: NodeKey) -> Option<NodeKey> {
        let children = &self.nodes[key.0].children;
        self.resolved_cursor(key).map(|index| children[index])
    }

    /// Moves a child to `index` (clamped to the end of the list).
    ///
    /// A child of another parent is re-homed here, which resets it. Within
    /// the same composite the move keeps the cursor on the same child.
    /// Returns the index the child ended up at. A decorator simply takes
    /// the node as its child.
    pub fn move_child(&mut self, parent: NodeKey, child: NodeKey, index: usize) -> Result<usize> {
        match self.nodes[parent.0].shape() {
            NodeShape::Leaf => return Err(TreeError::NotAParent { node: parent }),
            NodeShape::Decorator(_) => {
                self.add_child(parent, child)?;
                return Ok(0);
            }
            NodeShape::Composite(_) => {}
        }
        if self.nodes[child.0].parent != Some(parent) {
            self.check_link(parent, child)?;
            let index = index.min(self.nodes[parent.0].children.len());
            self.link(parent, child, index);
            return Ok(index);
        }

        let Some(from) = self.child_index(parent, child) else {
            return Ok(index);
        };
        if from == index {
            return Ok(index);
        }
        let current = self.cursor_child(parent);
        let children = &mut self.nodes[parent.0].children;
        children.remove(from);
        let index = if index >= children.len() {
            children.push(child);
            children.len() - 1
        } else {
            children.insert(index, child);
            index
        };
        self.retarget_cursor(parent, current);
        Ok(index)
    }

    /// Same as [`move_child`](Self::move_child); reads better for new nodes.
    pub fn insert_child(&mut self, parent: NodeKey, index: usize, child: NodeKey) -> Result<usize> {
        self.move_child(parent, child, index)
    }

    /// Swaps the children at `a` and `b`. Out-of-range indices do nothing.
    pub fn switch_child(&mut self, parent: NodeKey, a: usize, b: usize) -> bool {
        let len = self.nodes[parent.0].children.len();
        if a >= len || b >= len {
            return false;
        }
        let current = self.cursor_child(parent);
        self.nodes[parent.0].children.swap(a, b);
        self.retarget_cursor(parent, current);
        true
    }

    pub(crate) fn composite_initialize(&mut self, key: NodeKey) {
        self.context_mut(key).set_cursor(None);
        self.go_to_next_child(key);
        self.log(LogLevel::Debug, Some(key), "initialized");
    }

    pub(crate) fn composite_tick(&mut self, key: NodeKey, ctx: &mut C) {
        let Some(child) = self.current_child(key) else {
            self.footprint(Some(key), "no current child");
            self.set_state(key, NodeState::Failure);
            self.log(
                LogLevel::Error,
                Some(key),
                "cannot tick because current child is empty",
            );
            return;
        };
        self.run(child, ctx);
    }

    pub(crate) fn composite_after_child_exit(&mut self, key: NodeKey, flow: Flow, child: NodeKey) {
        let current = self.current_child(key);
        if current != Some(child) {
            self.footprint(Some(key), "skip: child exit");
            let current =
                current.map_or_else(|| "none".to_owned(), |c| self.nodes[c.0].to_string());
            self.log(
                LogLevel::Warn,
                Some(child),
                format!("skip: child exited but the current child is {current}"),
            );
            return;
        }
        self.proceed_child_state(key, flow, child);
        self.try_exit(key);
    }

    fn proceed_child_state(&mut self, key: NodeKey, flow: Flow, child: NodeKey) {
        let next = match (flow, self.state(child)) {
            (_, NodeState::Unvisited) => return,
            (_, NodeState::Running) => NodeState::Running,
            (Flow::Sequence, NodeState::Success) | (Flow::Selector, NodeState::Failure) => {
                match self.go_to_next_child(key) {
                    Some(_) => NodeState::Running,
                    None if flow == Flow::Sequence => NodeState::Success,
                    None => NodeState::Failure,
                }
            }
            (Flow::Sequence, NodeState::Failure) => {
                self.context_mut(key).set_cursor(None);
                NodeState::Failure
            }
            // The cursor stays on the winning child until the next entry.
            (Flow::Selector, NodeState::Success) => NodeState::Success,
        };
        self.set_state(key, next);
    }

    /// Cursor index moved forward past disabled children.
    fn resolved_cursor(&self, key: NodeKey) -> Option<usize> {
        let start = self.context(key)?.cursor()?;
        self.first_enabled_from(key, start)
    }

    fn first_enabled_from(&self, key: NodeKey, start: usize) -> Option<usize> {
        let children = &self.nodes[key.0].children;
        (start..children.len()).find(|&i| !self.nodes[children[i].0].disabled)
    }

    fn go_to_next_child(&mut self, key: NodeKey) -> Option<NodeKey> {
        let raw = self.context(key).and_then(|c| c.cursor());
        let next = match raw {
            None => self.first_enabled_from(key, 0),
            Some(_) => self
                .resolved_cursor(key)
                .and_then(|current| self.first_enabled_from(key, current + 1)),
        };
        self.context_mut(key).set_cursor(next);
        next.map(|index| self.nodes[key.0].children[index])
    }

    /// Child under the raw cursor, before any edit.
    pub(crate) fn cursor_child(&self, key: NodeKey) -> Option<NodeKey> {
        let index = self.context(key)?.cursor()?;
        self.nodes[key.0].children.get(index).copied()
    }

    /// Points the cursor at `child` again after the child list changed.
    pub(crate) fn retarget_cursor(&mut self, key: NodeKey, child: Option<NodeKey>) {
        let Some(child) = child else {
            return;
        };
        let index = self.child_index(key, child);
        if let Some(context) = self.runtime.contexts.get_mut(&self.nodes[key.0].id) {
            context.set_cursor(index);
        }
    }

    /// Keeps the cursor consistent after the child at `removed` was taken out.
    ///
    /// A cursor on the removed child now points at the following sibling.
    pub(crate) fn shift_cursor_after_removal(&mut self, key: NodeKey, removed: usize) {
        let len = self.nodes[key.0].children.len();
        if let Some(context) = self.runtime.contexts.get_mut(&self.nodes[key.0].id)
            && let Some(index) = context.cursor()
        {
            let index = if index > removed { index - 1 } else { index };
            context.set_cursor((index < len).then_some(index));
        }
    }

    /// Keeps the cursor on the same child after an insertion at `inserted`.
    pub(crate) fn shift_cursor_after_insert(&mut self, key: NodeKey, inserted: usize) {
        if let Some(context) = self.runtime.contexts.get_mut(&self.nodes[key.0].id)
            && let Some(index) = context.cursor()
            && index >= inserted
        {
            context.set_cursor(index.checked_add(1));
        }
    }
}
