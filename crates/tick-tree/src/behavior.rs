//! Leaf behavior trait.
//!
//! This module defines the [`Behavior`] trait, the extension point for all
//! leaf nodes. Composite and decorator control flow is built into the
//! engine; hosts supply the leaves. The trait is generic over a context type
//! `C`, allowing leaves to read and modify host state while they run.

use crate::NodeState;
use crate::persist::Extra;

/// Host-supplied work performed by a leaf node.
pub trait Behavior<C>: Send {
    /// Tag stored in saved trees and used to find the factory on load.
    fn type_tag(&self) -> &'static str;

    /// Called when the leaf is entered, before its first tick of a run.
    fn initialize(&mut self, _ctx: &mut C) {}

    /// Advance the leaf.
    ///
    /// # Returns
    ///
    /// - `NodeState::Running` to be ticked again on the next tree tick
    /// - `NodeState::Success` / `NodeState::Failure` to finish
    fn tick(&mut self, ctx: &mut C) -> NodeState;

    /// Called when the leaf exits or is reset while visited.
    fn clean_up(&mut self) {}

    /// Write type-specific fields into a saved node record.
    fn write_extra(&self, _extra: &mut Extra) {}

    /// Restore type-specific fields from a saved node record.
    fn read_extra(&mut self, _extra: &Extra) {}
}

/// Blanket implementation for boxed behaviors.
impl<C> Behavior<C> for Box<dyn Behavior<C>> {
    #[inline]
    fn type_tag(&self) -> &'static str {
        (**self).type_tag()
    }

    #[inline]
    fn initialize(&mut self, ctx: &mut C) {
        (**self).initialize(ctx)
    }

    #[inline]
    fn tick(&mut self, ctx: &mut C) -> NodeState {
        (**self).tick(ctx)
    }

    #[inline]
    fn clean_up(&mut self) {
        (**self).clean_up()
    }

    #[inline]
    fn write_extra(&self, extra: &mut Extra) {
        (**self).write_extra(extra)
    }

    #[inline]
    fn read_extra(&mut self, extra: &Extra) {
        (**self).read_extra(extra)
    }
}

type InitFn<C> = Box<dyn FnMut(&mut C) + Send>;
type TickFn<C> = Box<dyn FnMut(&mut C) -> NodeState + Send>;
type CleanUpFn = Box<dyn FnMut() + Send>;

/// Leaf whose lifecycle hooks are closures.
///
/// Without a tick closure the node stays `Running`. Closures are not
/// persisted: a loaded `CallbackNode` starts with no hooks.
pub struct CallbackNode<C> {
    on_initialize: Option<InitFn<C>>,
    on_tick: Option<TickFn<C>>,
    on_clean_up: Option<CleanUpFn>,
}

impl<C> Default for CallbackNode<C> {
    fn default() -> Self {
        Self {
            on_initialize: None,
            on_tick: None,
            on_clean_up: None,
        }
    }
}

impl<C> CallbackNode<C> {
    pub const TYPE_TAG: &'static str = "Callback";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_initialize(mut self, f: impl FnMut(&mut C) + Send + 'static) -> Self {
        self.on_initialize = Some(Box::new(f));
        self
    }

    pub fn on_tick(mut self, f: impl FnMut(&mut C) -> NodeState + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(f));
        self
    }

    pub fn on_clean_up(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_clean_up = Some(Box::new(f));
        self
    }
}

impl<C> Behavior<C> for CallbackNode<C> {
    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }

    fn initialize(&mut self, ctx: &mut C) {
        if let Some(f) = self.on_initialize.as_mut() {
            f(ctx);
        }
    }

    fn tick(&mut self, ctx: &mut C) -> NodeState {
        match self.on_tick.as_mut() {
            Some(f) => f(ctx),
            None => NodeState::Running,
        }
    }

    fn clean_up(&mut self) {
        if let Some(f) = self.on_clean_up.as_mut() {
            f();
        }
    }
}
