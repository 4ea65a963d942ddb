//! Structural edits: attaching and detaching children.
//!
//! Both sides of a parent/child link are always updated together. Moving a
//! node to another place is a cancellation boundary: its subtree is reset
//! (interrupting the tree if the run is inside it) before it is re-attached.

use crate::error::{Result, TreeError};
use crate::id::NodeKey;
use crate::node::NodeShape;
use crate::tree::{BehaviorTree, TreeEvent};

impl<C> BehaviorTree<C> {
    /// Attaches `child` under `parent`.
    ///
    /// Composites append the child (a child already in the list stays where
    /// it is). Decorators replace and detach their previous child. If
    /// `child` was the root, the top of `parent`'s hierarchy becomes root.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotAParent`] if `parent` is a leaf
    /// - [`TreeError::CycleDetected`] if `parent` is `child` or lies below it
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.check_link(parent, child)?;
        let children = &self.nodes[parent.0].children;
        match self.nodes[parent.0].shape() {
            NodeShape::Composite(_) => {
                if children.contains(&child) {
                    return Ok(());
                }
                let end = children.len();
                self.link(parent, child, end);
            }
            NodeShape::Decorator(_) => {
                let previous = children.first().copied();
                if previous == Some(child) {
                    return Ok(());
                }
                if let Some(previous) = previous {
                    self.unlink(parent, previous);
                }
                self.link(parent, child, 0);
            }
            NodeShape::Leaf => return Err(TreeError::NotAParent { node: parent }),
        }
        Ok(())
    }

    /// Attaches each of `children` in order.
    pub fn add_children(
        &mut self,
        parent: NodeKey,
        children: impl IntoIterator<Item = NodeKey>,
    ) -> Result<()> {
        for child in children {
            self.add_child(parent, child)?;
        }
        Ok(())
    }

    /// Detaches `child` from `parent`, resetting its subtree.
    ///
    /// Returns `false` if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        self.unlink(parent, child)
    }

    pub fn child_index(&self, parent: NodeKey, child: NodeKey) -> Option<usize> {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
    }

    pub(crate) fn check_link(&self, parent: NodeKey, child: NodeKey) -> Result<()> {
        if !self.nodes[parent.0].kind.is_parent() {
            return Err(TreeError::NotAParent { node: parent });
        }
        if self.is_within(parent, child) {
            return Err(TreeError::CycleDetected { parent, child });
        }
        Ok(())
    }

    /// Inserts a validated `child` into `parent`'s list at `index`.
    pub(crate) fn link(&mut self, parent: NodeKey, child: NodeKey, index: usize) {
        let was_root = self.root == Some(child);
        match self.nodes[child.0].parent {
            Some(previous) => {
                self.unlink(previous, child);
            }
            None => self.cancel_subtree(child),
        }

        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.shift_cursor_after_insert(parent, index);
        self.nodes[child.0].parent = Some(parent);

        if was_root {
            let top = self.top_of(parent);
            self.root = Some(top);
            self.mark_attached(top, true);
            self.emit(TreeEvent::RootChanged {
                previous: Some(child),
                current: Some(top),
            });
        } else {
            let attached = self.nodes[parent.0].attached;
            self.mark_attached(child, attached);
        }
    }

    pub(crate) fn unlink(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        let Some(index) = self.child_index(parent, child) else {
            return false;
        };
        self.cancel_subtree(child);
        self.nodes[parent.0].children.remove(index);
        self.shift_cursor_after_removal(parent, index);
        self.nodes[child.0].parent = None;
        self.mark_attached(child, false);
        true
    }
}
