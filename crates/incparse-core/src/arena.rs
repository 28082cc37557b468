//! Arena + handle realization of the tree's cyclic references: cyclic
//! parent/sibling/terminal links are modelled as an arena of indices
//! rather than owning pointers. A [`NodeArena`] owns every
//! [`crate::node::Node`]; all
//! parent/sibling/terminal-chain links are [`NodeId`] handles rather than
//! owning pointers, so there are no ownership cycles to fight the borrow
//! checker over.

use crate::node::Node;
use slab::Slab;
use std::fmt;

/// A 32-bit handle into a [`NodeArena`]. Never reused across a node's
/// removal within one parser session — removed nodes (superseded
/// Nonterminals from a left/right breakdown) are simply never looked up
/// again, their slot stays allocated until the arena itself is dropped.
/// This keeps stale handles from an undone parse attempt from aliasing a
/// freshly allocated node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl fmt::Debug for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "NodeId({})", self.0)
  }
}

#[derive(Default)]
pub struct NodeArena {
  slab: Slab<Node>,
}

impl NodeArena {
  pub fn new() -> Self {
    Self { slab: Slab::new() }
  }

  pub fn insert(&mut self, node: Node) -> NodeId {
    NodeId(self.slab.insert(node) as u32)
  }

  pub fn get(&self, id: NodeId) -> &Node {
    &self.slab[id.0 as usize]
  }

  pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
    &mut self.slab[id.0 as usize]
  }

  pub fn len(&self) -> usize {
    self.slab.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slab.is_empty()
  }
}
