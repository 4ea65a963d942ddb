use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use tick_tree::builder::{callback, inverter, repeater, selector, sequence};
use tick_tree::{BehaviorTree, CallbackNode, NodeId, NodeKind, NodeState, TreeError};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Host state shared by the leaves of a test tree.
#[derive(Default)]
struct Blackboard {
    first: Option<NodeState>,
    second: Option<NodeState>,
    ticks: u32,
}

fn leaf(select: fn(&Blackboard) -> Option<NodeState>) -> NodeKind<Blackboard> {
    NodeKind::leaf(CallbackNode::new().on_tick(move |bb: &mut Blackboard| {
        bb.ticks += 1;
        select(bb).unwrap_or(NodeState::Running)
    }))
}

/// The running node is cached between ticks and unwinds recursively.
///
/// 1. The first child keeps running, so every tick resumes it directly
/// 2. Once it succeeds, the cursor moves up to the sequence
/// 3. The second child then runs until it succeeds
/// 4. The whole tree finishes in that tick and the cursor is cleared
#[test]
fn test_running_node_is_cached_and_unwound() {
    init_tracing();
    let mut tree = BehaviorTree::new();
    let root = tree.sequence("sequence node");
    let child1 = tree.add_node("child 1", leaf(|bb| bb.first));
    let child2 = tree.add_node("child 2", leaf(|bb| bb.second));
    tree.add_children(root, [child1, child2])
        .expect("sequence accepts children");
    tree.set_root_node(root);

    let mut bb = Blackboard::default();
    for _ in 0..3 {
        tree.tick(&mut bb).expect("tree has a root");
        assert_eq!(tree.running_node(), Some(child1));
    }

    bb.first = Some(NodeState::Success);
    tree.tick(&mut bb).expect("tree has a root");
    assert_eq!(tree.running_node(), Some(root));

    for _ in 0..3 {
        tree.tick(&mut bb).expect("tree has a root");
        assert_eq!(tree.running_node(), Some(child2));
    }

    bb.second = Some(NodeState::Success);
    let state = tree.tick(&mut bb).expect("tree has a root");
    assert_eq!(state, NodeState::Success);
    assert_eq!(tree.running_node(), None);
    assert!(tree.runtime().is_idle());
}

/// Interrupting a deep leaf resets exactly the running path.
#[test]
fn test_interrupt_resets_running_path_only() {
    init_tracing();
    let cleaned = Arc::new(AtomicBool::new(false));
    let flag = cleaned.clone();

    let mut tree = BehaviorTree::new();
    let root = tree.sequence("root");
    let done = tree.add_node("done", leaf(|_| Some(NodeState::Success)));
    let middle = tree.selector("middle");
    let deep = tree.add_node(
        "deep",
        NodeKind::leaf(
            CallbackNode::new()
                .on_tick(|bb: &mut Blackboard| {
                    bb.ticks += 1;
                    NodeState::Running
                })
                .on_clean_up(move || flag.store(true, Ordering::SeqCst)),
        ),
    );
    tree.add_children(root, [done, middle]).expect("composite");
    tree.add_child(middle, deep).expect("composite");
    tree.set_root_node(root);

    let mut bb = Blackboard::default();
    tree.tick(&mut bb).expect("tree has a root");
    tree.tick(&mut bb).expect("tree has a root");
    assert_eq!(tree.running_node(), Some(deep));
    assert_eq!(tree.state(done), NodeState::Success);

    tree.interrupt();
    assert_eq!(tree.running_node(), None);
    for key in [root, middle, deep] {
        assert_eq!(tree.state(key), NodeState::Unvisited);
    }
    assert_eq!(tree.state(done), NodeState::Success);
    assert!(cleaned.load(Ordering::SeqCst));

    let pass = tree.trace().last_pass().expect("a pass was recorded");
    assert!(pass
        .footprints()
        .iter()
        .any(|fp| fp.node.is_none() && fp.message == "interrupt"));
}

/// One idle-to-idle run is recorded as a single pass.
#[test]
fn test_trace_records_pass_by_footprints() {
    init_tracing();
    let mut tree = BehaviorTree::new();
    let root = tree.sequence("root");
    let child1 = tree.add_node("child 1", leaf(|_| Some(NodeState::Success)));
    let child2 = tree.add_node("child 2", leaf(|_| Some(NodeState::Failure)));
    tree.add_children(root, [child1, child2])
        .expect("composite");
    tree.set_root_node(root);

    let mut bb = Blackboard::default();
    loop {
        tree.tick(&mut bb).expect("tree has a root");
        if tree.running_node().is_none() {
            break;
        }
    }

    let trace = tree.trace();
    assert_eq!(trace.passes().len(), 1);
    let pass = trace.first_pass().expect("one pass");
    let keys: Vec<Option<&NodeId>> = pass.by_node().into_keys().collect();
    let mut expected = vec![
        None,
        Some(tree.node(root).id()),
        Some(tree.node(child1).id()),
        Some(tree.node(child2).id()),
    ];
    expected.sort();
    assert_eq!(keys, expected);
    assert_eq!(pass.count(tree.node(root).id(), "exit"), 1);
}

/// A second run after the tree went idle opens a new pass.
#[test]
fn test_each_run_opens_a_pass() {
    let mut tree = BehaviorTree::new();
    let root = tree.add_node("leaf", leaf(|_| Some(NodeState::Success)));
    tree.set_root_node(root);

    let mut bb = Blackboard::default();
    for _ in 0..3 {
        tree.tick(&mut bb).expect("tree has a root");
    }
    assert_eq!(tree.trace().passes().len(), 3);
    assert_eq!(bb.ticks, 3);
}

/// Built trees run the same as hand-linked ones.
#[test]
fn test_built_tree_runs_guard_fallback() {
    init_tracing();
    let mut tree = BehaviorTree::<Blackboard>::new();
    tree.build_root(selector(
        "root",
        vec![
            sequence(
                "guarded",
                vec![
                    inverter("not first", callback("first set", |bb: &mut Blackboard| {
                        if bb.first.is_some() {
                            NodeState::Success
                        } else {
                            NodeState::Failure
                        }
                    })),
                    callback("act", |bb: &mut Blackboard| {
                        bb.ticks += 1;
                        NodeState::Success
                    }),
                ],
            ),
            repeater("fallback", 3, callback("count", |bb: &mut Blackboard| {
                bb.ticks += 10;
                NodeState::Failure
            })),
        ],
    ))
    .expect("valid blueprint");

    let mut bb = Blackboard::default();
    assert_eq!(tree.tick(&mut bb).expect("root"), NodeState::Running);
    assert_eq!(tree.tick(&mut bb).expect("root"), NodeState::Success);
    assert_eq!(bb.ticks, 1);

    bb.first = Some(NodeState::Success);
    while tree.tick(&mut bb).expect("root") == NodeState::Running {}
    assert_eq!(bb.ticks, 31);
}

#[test]
fn test_tick_without_root_is_an_error() {
    let mut tree = BehaviorTree::<Blackboard>::new();
    let mut bb = Blackboard::default();
    assert!(matches!(tree.tick(&mut bb), Err(TreeError::NoRoot)));
}
