//! Append-only record of what happened during ticks.
//!
//! A [`Trace`] is split into [`Pass`]es: a new pass starts whenever an idle
//! tree is ticked, so one pass covers one run from the root back to idle.
//! Each pass is a chronological list of [`Footprint`]s.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::id::NodeId;

/// A single traced event.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    /// `None` for tree-level events such as an interrupt.
    pub node: Option<NodeId>,
    pub node_name: Option<String>,
    pub message: String,
    pub time: DateTime<Utc>,
}

impl Footprint {
    pub fn node_label(&self) -> &str {
        self.node_name.as_deref().unwrap_or("<tree>")
    }
}

impl fmt::Display for Footprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.node_label(), self.message)
    }
}

/// Footprints of one idle-to-idle run.
#[derive(Debug, Clone, Default)]
pub struct Pass {
    footprints: Vec<Footprint>,
}

impl Pass {
    pub fn footprints(&self) -> &[Footprint] {
        &self.footprints
    }

    /// Footprints grouped by node; tree-level events are keyed by `None`.
    pub fn by_node(&self) -> BTreeMap<Option<&NodeId>, Vec<&Footprint>> {
        let mut groups: BTreeMap<Option<&NodeId>, Vec<&Footprint>> = BTreeMap::new();
        for footprint in &self.footprints {
            groups
                .entry(footprint.node.as_ref())
                .or_default()
                .push(footprint);
        }
        groups
    }

    /// Footprints of a single node, in order.
    pub fn for_node<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Footprint> + 'a {
        self.footprints
            .iter()
            .filter(move |fp| fp.node.as_ref() == Some(id))
    }

    /// How often `id` recorded exactly `message` in this pass.
    pub fn count(&self, id: &NodeId, message: &str) -> usize {
        self.for_node(id).filter(|fp| fp.message == message).count()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }
}

/// Ordered list of passes.
#[derive(Debug, Clone)]
pub struct Trace {
    passes: VecDeque<Pass>,
    enabled: bool,
    max_passes: Option<usize>,
}

impl Default for Trace {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl Trace {
    pub fn new(enabled: bool, max_passes: Option<usize>) -> Self {
        Self {
            passes: VecDeque::new(),
            enabled,
            max_passes,
        }
    }

    pub fn passes(&self) -> impl ExactSizeIterator<Item = &Pass> {
        self.passes.iter()
    }

    pub fn first_pass(&self) -> Option<&Pass> {
        self.passes.front()
    }

    pub fn last_pass(&self) -> Option<&Pass> {
        self.passes.back()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn new_pass(&mut self) {
        if !self.enabled {
            return;
        }
        self.passes.push_back(Pass::default());
        if let Some(max) = self.max_passes {
            while self.passes.len() > max.max(1) {
                self.passes.pop_front();
            }
        }
    }

    pub fn add(&mut self, node: Option<(&NodeId, &str)>, message: impl Into<String>) {
        if !self.enabled {
            return;
        }
        if self.passes.is_empty() {
            self.new_pass();
        }
        let footprint = Footprint {
            node: node.map(|(id, _)| id.clone()),
            node_name: node.map(|(_, name)| name.to_owned()),
            message: message.into(),
            time: Utc::now(),
        };
        if let Some(pass) = self.passes.back_mut() {
            pass.footprints.push(footprint);
        }
    }

    pub fn clear(&mut self) {
        self.passes.clear();
    }
}
