//! Node identity and ID generation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, opaque identifier of a node. Survives save/load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Handle to a node inside a tree's arena.
///
/// Keys are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(pub(crate) usize);

impl NodeKey {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of fresh node and tree identifiers.
pub type IdGenerator = Box<dyn FnMut() -> String + Send>;

/// Random UUID v4 identifiers in their compact form.
pub fn random() -> IdGenerator {
    Box::new(|| uuid::Uuid::new_v4().simple().to_string())
}

/// Deterministic identifiers: `prefix-1`, `prefix-2`, ...
pub fn sequential(prefix: impl Into<String>) -> IdGenerator {
    let prefix = prefix.into();
    let mut next = 0u64;
    Box::new(move || {
        next += 1;
        format!("{prefix}-{next}")
    })
}
