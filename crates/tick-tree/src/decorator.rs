//! Decorator behavior nodes.
//!
//! Decorators wrap a single child and modify its result or execution.
//! This module provides [`DecoratorKind::Inverter`] (NOT logic),
//! [`DecoratorKind::Succeeder`] (error suppression), and two repeaters.

use crate::NodeState;
use crate::id::NodeKey;
use crate::log::LogLevel;
use crate::node::NodeKind;
use crate::tree::BehaviorTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoratorKind {
    /// Swaps `Success` and `Failure` of the child.
    Inverter,

    /// Always returns `Success` once the child finishes.
    ///
    /// This is useful for optional behaviors that shouldn't cause a
    /// sequence to fail.
    Succeeder,

    /// Runs the child `times` times, then succeeds.
    ///
    /// - A negative value repeats forever
    /// - `0` never runs the child
    ///
    /// Each finished run counts, whether the child succeeded or failed.
    Repeater { times: i32 },

    /// Runs the child again after every success and succeeds on its first
    /// failure.
    RepeatUntilFailure,
}

impl DecoratorKind {
    pub const fn type_tag(self) -> &'static str {
        match self {
            DecoratorKind::Inverter => "Inverter",
            DecoratorKind::Succeeder => "Succeeder",
            DecoratorKind::Repeater { .. } => "Repeater",
            DecoratorKind::RepeatUntilFailure => "RepeatUntilFailure",
        }
    }
}

impl<C> BehaviorTree<C> {
    /// Target count of a repeater, `None` for other nodes.
    pub fn repeat_times(&self, key: NodeKey) -> Option<i32> {
        match self.nodes[key.0].kind {
            NodeKind::Decorator(DecoratorKind::Repeater { times }) => Some(times),
            _ => None,
        }
    }

    /// Changes a repeater's target count. Returns `false` for other nodes.
    pub fn set_repeat_times(&mut self, key: NodeKey, times: i32) -> bool {
        match &mut self.nodes[key.0].kind {
            NodeKind::Decorator(DecoratorKind::Repeater { times: current }) => {
                *current = times;
                true
            }
            _ => false,
        }
    }

    /// Completed child runs of a repeater since it was entered.
    pub fn repeat_count(&self, key: NodeKey) -> u32 {
        self.context(key).map_or(0, |c| c.executed())
    }

    pub(crate) fn decorator_initialize(&mut self, key: NodeKey, kind: DecoratorKind) {
        if let DecoratorKind::Repeater { .. } = kind {
            self.context_mut(key).set_executed(0);
        }
    }

    pub(crate) fn decorator_tick(&mut self, key: NodeKey, kind: DecoratorKind, ctx: &mut C) {
        let child = self.nodes[key.0]
            .child()
            .filter(|child| !self.nodes[child.0].disabled);
        let Some(child) = child else {
            self.footprint(Some(key), "no current child");
            self.set_state(key, NodeState::Failure);
            self.log(
                LogLevel::Error,
                Some(key),
                "failed for no child is available or enabled",
            );
            return;
        };

        if let DecoratorKind::Repeater { times } = kind {
            if self.repeat_done(key, times) {
                self.footprint(Some(key), "repeat ends on target times");
                self.set_state(key, NodeState::Success);
                self.log(
                    LogLevel::Debug,
                    Some(key),
                    format!(
                        "child not run: repeated {} of {times} times",
                        self.repeat_count(key)
                    ),
                );
                return;
            }
            self.set_state(key, NodeState::Running);
        }
        self.run(child, ctx);
    }

    pub(crate) fn decorator_after_child_exit(
        &mut self,
        key: NodeKey,
        kind: DecoratorKind,
        child: NodeKey,
    ) {
        if self.nodes[key.0].child() != Some(child) {
            self.footprint(Some(key), "skip: child exit");
            self.log(
                LogLevel::Warn,
                Some(child),
                "skip: exited child does not match the attached child",
            );
            return;
        }

        let child_state = self.state(child);
        let next = match kind {
            DecoratorKind::Inverter => Some(child_state.invert()),
            DecoratorKind::Succeeder => Some(NodeState::Success),
            DecoratorKind::RepeatUntilFailure => Some(match child_state {
                NodeState::Success => NodeState::Running,
                NodeState::Failure => NodeState::Success,
                other => other,
            }),
            DecoratorKind::Repeater { times } => {
                if child_state.is_terminal() {
                    let executed = self.repeat_count(key).saturating_add(1);
                    self.context_mut(key).set_executed(executed);
                }
                self.repeat_done(key, times).then_some(NodeState::Success)
            }
        };
        if let Some(next) = next {
            self.set_state(key, next);
        }
        self.try_exit(key);
    }

    fn repeat_done(&self, key: NodeKey, times: i32) -> bool {
        u32::try_from(times).is_ok_and(|times| self.repeat_count(key) >= times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallbackNode, MemorySink, NodeKind};
    use std::sync::Arc;

    struct TestContext {
        outcome: NodeState,
        count: u32,
    }

    fn child() -> NodeKind<TestContext> {
        NodeKind::leaf(CallbackNode::new().on_tick(|ctx: &mut TestContext| {
            ctx.count += 1;
            ctx.outcome
        }))
    }

    fn setup(kind: DecoratorKind) -> (BehaviorTree<TestContext>, NodeKey, NodeKey) {
        let mut tree = BehaviorTree::new();
        let node = tree.add_node("decorator", NodeKind::Decorator(kind));
        let leaf = tree.add_node("child", child());
        tree.add_child(node, leaf).unwrap();
        tree.set_root_node(node);
        (tree, node, leaf)
    }

    fn ctx(outcome: NodeState) -> TestContext {
        TestContext { outcome, count: 0 }
    }

    #[test]
    fn inverter_inverts_child_result() {
        let (mut tree, node, _) = setup(DecoratorKind::Inverter);

        tree.tick(&mut ctx(NodeState::Success)).unwrap();
        assert_eq!(tree.state(node), NodeState::Failure);

        tree.tick(&mut ctx(NodeState::Failure)).unwrap();
        assert_eq!(tree.state(node), NodeState::Success);
    }

    #[test]
    fn inverter_passes_running_through() {
        let (mut tree, node, leaf) = setup(DecoratorKind::Inverter);
        tree.tick(&mut ctx(NodeState::Running)).unwrap();
        assert_eq!(tree.state(node), NodeState::Running);
        assert_eq!(tree.running_node(), Some(leaf));
    }

    #[test]
    fn succeeder_always_succeeds() {
        let (mut tree, node, _) = setup(DecoratorKind::Succeeder);

        tree.tick(&mut ctx(NodeState::Success)).unwrap();
        assert_eq!(tree.state(node), NodeState::Success);

        tree.tick(&mut ctx(NodeState::Failure)).unwrap();
        assert_eq!(tree.state(node), NodeState::Success);
    }

    #[test]
    fn repeater_repeats_forever_when_times_negative() {
        let (mut tree, node, leaf) = setup(DecoratorKind::Repeater { times: -1 });
        let mut ctx = ctx(NodeState::Success);

        for _ in 0..100 {
            tree.tick(&mut ctx).unwrap();
            assert_eq!(tree.state(node), NodeState::Running);
            assert_eq!(tree.state(leaf), NodeState::Success);
        }
        assert_eq!(ctx.count, 100);
    }

    #[test]
    fn repeater_runs_child_given_times() {
        let (mut tree, node, _) = setup(DecoratorKind::Repeater { times: 10 });
        let mut ctx = ctx(NodeState::Failure);

        for i in 0..10 {
            tree.tick(&mut ctx).unwrap();
            let expected = if i < 9 {
                NodeState::Running
            } else {
                NodeState::Success
            };
            assert_eq!(tree.state(node), expected);
        }
        assert_eq!(ctx.count, 10);

        ctx.count = 0;
        assert!(tree.set_repeat_times(node, 0));
        tree.tick(&mut ctx).unwrap();
        assert_eq!(tree.state(node), NodeState::Success);
        assert_eq!(ctx.count, 0);
    }

    #[test]
    fn repeater_counts_successful_runs_too() {
        let (mut tree, node, _) = setup(DecoratorKind::Repeater { times: 3 });
        let mut ctx = ctx(NodeState::Success);

        let states: Vec<_> = (0..3)
            .map(|_| {
                tree.tick(&mut ctx).unwrap();
                tree.state(node)
            })
            .collect();
        assert_eq!(
            states,
            vec![NodeState::Running, NodeState::Running, NodeState::Success]
        );
        assert_eq!(ctx.count, 3);
    }

    #[test]
    fn exit_of_unattached_child_is_skipped() {
        let sink = Arc::new(MemorySink::new());
        let (tree, node, leaf) = setup(DecoratorKind::Inverter);
        let mut tree = tree.with_logger(sink.clone());
        let stray = tree.add_node("stray", child());
        tree.tick(&mut ctx(NodeState::Running)).unwrap();
        assert_eq!(tree.running_node(), Some(leaf));

        tree.decorator_after_child_exit(node, DecoratorKind::Inverter, stray);

        assert_eq!(sink.at_level(LogLevel::Warn).len(), 1);
        let pass = tree.trace().last_pass().unwrap();
        assert_eq!(pass.count(tree.node(node).id(), "skip: child exit"), 1);
        assert_eq!(tree.state(node), NodeState::Running);
        assert_eq!(tree.running_node(), Some(leaf));
    }

    #[test]
    fn repeat_until_failure_stops_on_failure() {
        let mut tree = BehaviorTree::new();
        let node = tree.repeat_until_failure("repeat until failure");
        let leaf = tree.add_node(
            "child",
            NodeKind::leaf(CallbackNode::new().on_tick(|ctx: &mut TestContext| {
                ctx.count += 1;
                if ctx.count >= 5 {
                    NodeState::Failure
                } else {
                    NodeState::Success
                }
            })),
        );
        tree.add_child(node, leaf).unwrap();
        tree.set_root_node(node);

        let mut ctx = ctx(NodeState::Success);
        for _ in 0..10 {
            tree.tick(&mut ctx).unwrap();
            if tree.state(node) == NodeState::Success {
                break;
            }
            assert_eq!(tree.state(node), NodeState::Running);
        }
        assert_eq!(tree.state(node), NodeState::Success);
        assert_eq!(ctx.count, 5);
    }

    #[test]
    fn missing_or_disabled_child_fails() {
        let sink = Arc::new(MemorySink::new());
        let mut tree = BehaviorTree::<TestContext>::new().with_logger(sink.clone());
        let node = tree.inverter("empty");
        tree.set_root_node(node);

        tree.tick(&mut ctx(NodeState::Success)).unwrap();
        assert_eq!(tree.state(node), NodeState::Failure);
        assert_eq!(sink.at_level(LogLevel::Error).len(), 1);

        let leaf = tree.add_node("child", child());
        tree.add_child(node, leaf).unwrap();
        tree.set_disabled(leaf, true);
        let mut ctx = ctx(NodeState::Success);
        tree.tick(&mut ctx).unwrap();
        assert_eq!(tree.state(node), NodeState::Failure);
        assert_eq!(ctx.count, 0);
    }

    #[test]
    fn attaching_new_child_replaces_old() {
        let (mut tree, node, old) = setup(DecoratorKind::Succeeder);
        let new = tree.add_node("new", child());
        tree.add_child(node, new).unwrap();

        assert_eq!(tree.node(node).child(), Some(new));
        assert_eq!(tree.node(old).parent(), None);
        assert!(!tree.is_attached(old));
        assert!(tree.is_attached(new));
    }
}
