//! Type tag to node factory mapping used when loading trees.

use std::collections::HashMap;
use std::fmt;

use crate::behavior::{Behavior, CallbackNode};
use crate::composite::Flow;
use crate::decorator::DecoratorKind;
use crate::error::{Result, TreeError};
use crate::node::NodeKind;

/// Builds a fresh, unconfigured node of one type.
pub type NodeFactory<C> = Box<dyn Fn() -> NodeKind<C> + Send + Sync>;

/// Factories keyed by the tag a node writes into its saved record.
///
/// [`NodeRegistry::new`] knows every built-in kind plus [`CallbackNode`].
/// Hosts register their own leaf behaviors before loading.
pub struct NodeRegistry<C> {
    factories: HashMap<String, NodeFactory<C>>,
}

impl<C: 'static> Default for NodeRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for NodeRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl<C: 'static> NodeRegistry<C> {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for flow in [Flow::Sequence, Flow::Selector] {
            registry.register(flow.type_tag(), move || NodeKind::Composite(flow));
        }
        for kind in [
            DecoratorKind::Inverter,
            DecoratorKind::Succeeder,
            DecoratorKind::Repeater { times: -1 },
            DecoratorKind::RepeatUntilFailure,
        ] {
            registry.register(kind.type_tag(), move || NodeKind::Decorator(kind));
        }
        registry.register_behavior(CallbackNode::<C>::TYPE_TAG, CallbackNode::<C>::new);
        registry
    }

    /// Registers a leaf behavior under `tag`.
    pub fn register_behavior<B>(
        &mut self,
        tag: impl Into<String>,
        factory: impl Fn() -> B + Send + Sync + 'static,
    ) -> &mut Self
    where
        B: Behavior<C> + 'static,
    {
        self.register(tag, move || NodeKind::leaf(factory()))
    }
}

impl<C> NodeRegistry<C> {
    /// A registry without any tags, not even the built-in ones.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under `tag`, replacing any previous factory.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        factory: impl Fn() -> NodeKind<C> + Send + Sync + 'static,
    ) -> &mut Self {
        self.factories.insert(tag.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<_> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Builds a node of type `tag`.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownNodeType`] if nothing is registered under `tag`.
    pub fn create(&self, tag: &str) -> Result<NodeKind<C>> {
        self.factories
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| TreeError::UnknownNodeType(tag.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeState;

    struct TestContext;

    struct Wait;

    impl Behavior<TestContext> for Wait {
        fn type_tag(&self) -> &'static str {
            "Wait"
        }

        fn tick(&mut self, _ctx: &mut TestContext) -> NodeState {
            NodeState::Running
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = NodeRegistry::<TestContext>::new();
        assert_eq!(
            registry.tags(),
            vec![
                "Callback",
                "Inverter",
                "RepeatUntilFailure",
                "Repeater",
                "Selector",
                "Sequence",
                "Succeeder"
            ]
        );
        assert!(matches!(
            registry.create("Repeater").unwrap(),
            NodeKind::Decorator(DecoratorKind::Repeater { times: -1 })
        ));
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let registry = NodeRegistry::<TestContext>::new();
        assert!(matches!(
            registry.create("Wait"),
            Err(TreeError::UnknownNodeType(tag)) if tag == "Wait"
        ));
    }

    #[test]
    fn host_behaviors_can_be_registered() {
        let mut registry = NodeRegistry::<TestContext>::new();
        registry.register_behavior("Wait", || Wait);
        let kind = registry.create("Wait").unwrap();
        assert_eq!(kind.type_tag(), "Wait");
        assert!(!kind.is_parent());
    }
}
