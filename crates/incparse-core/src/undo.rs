//! The undo log: an append-only sequence of `(node, field, previous_value)`
//! triples recording every mutation performed during one parse attempt,
//! so a failed parse can be rolled back to the exact tree it started
//! from, bit for bit.

use crate::{
  arena::{NodeArena, NodeId},
  node::NodeSnapshot,
};
use incparse_runtime::Symbol;
use std::collections::BTreeMap;

/// One undone-able field mutation. Every surviving-node mutator in
/// [`crate::tree::Tree`] pushes exactly one of these before writing the
/// new value.
#[derive(Debug)]
pub enum UndoEntry {
  Parent(NodeId, Option<NodeId>),
  Left(NodeId, Option<NodeId>),
  Right(NodeId, Option<NodeId>),
  PrevTerm(NodeId, Option<NodeId>),
  NextTerm(NodeId, Option<NodeId>),
  /// Whole-field snapshot of a node's per-version log, taken before a
  /// reduce overwrites the child's log with a fresh version.
  Log(NodeId, BTreeMap<u64, NodeSnapshot>),
  Changed(NodeId, bool),
  /// Replaces the *entire* children vector of `NodeId` (used for insert /
  /// remove / reorder during reduction and indentation repair).
  Children(NodeId, Vec<NodeId>),
  /// In-place rename of an indentation token's symbol during repair.
  SymbolName(NodeId, Symbol),
  /// Inserting a brand-new node into the tree: on rollback, the node is
  /// simply forgotten (its handle is never looked up again, see
  /// [`crate::arena::NodeId`]'s docs).
  NodeCreated(NodeId),
}

/// An append-only log of [`UndoEntry`] values produced by one `inc_parse`
/// attempt. `Error` replays it in reverse; `Accept` discards it.
#[derive(Debug, Default)]
pub struct UndoLog {
  entries: Vec<UndoEntry>,
}

impl UndoLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, entry: UndoEntry) {
    self.entries.push(entry);
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Replays every entry in reverse, restoring `arena` to its pre-parse
  /// state exactly.
  pub fn replay(mut self, arena: &mut NodeArena) {
    while let Some(entry) = self.entries.pop() {
      match entry {
        UndoEntry::Parent(id, v) => arena.get_mut(id).parent = v,
        UndoEntry::Left(id, v) => arena.get_mut(id).left = v,
        UndoEntry::Right(id, v) => arena.get_mut(id).right = v,
        UndoEntry::PrevTerm(id, v) => arena.get_mut(id).prev_term = v,
        UndoEntry::NextTerm(id, v) => arena.get_mut(id).next_term = v,
        UndoEntry::Log(id, v) => arena.get_mut(id).log = v,
        UndoEntry::Changed(id, v) => arena.get_mut(id).changed = v,
        UndoEntry::Children(id, v) => arena.get_mut(id).children = v,
        UndoEntry::SymbolName(id, v) => arena.get_mut(id).symbol = v,
        // Nothing to restore: the node simply becomes unreachable again.
        UndoEntry::NodeCreated(_) => {}
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::Node;
  use incparse_runtime::Symbol;

  #[test]
  fn replay_is_lifo_and_restores_every_logged_field() {
    let mut arena = NodeArena::new();
    let a = arena.insert(Node::new(Symbol::terminal("a"), 0, vec![]));
    let b = arena.insert(Node::new(Symbol::terminal("b"), 0, vec![]));

    let mut log = UndoLog::new();
    log.push(UndoEntry::Right(a, None));
    arena.get_mut(a).right = Some(b);
    log.push(UndoEntry::Left(b, None));
    arena.get_mut(b).left = Some(a);
    log.push(UndoEntry::Changed(a, false));
    arena.get_mut(a).changed = true;
    log.push(UndoEntry::SymbolName(a, Symbol::terminal("a")));
    arena.get_mut(a).symbol = Symbol::terminal("a-renamed");

    assert_eq!(log.len(), 4);
    log.replay(&mut arena);

    assert_eq!(arena.get(a).right, None);
    assert_eq!(arena.get(b).left, None);
    assert!(!arena.get(a).changed);
    assert_eq!(arena.get(a).symbol, Symbol::terminal("a"));
  }

  #[test]
  fn node_created_entry_leaves_node_simply_unreachable() {
    let mut arena = NodeArena::new();
    let a = arena.insert(Node::new(Symbol::terminal("a"), 0, vec![]));
    let mut log = UndoLog::new();
    log.push(UndoEntry::NodeCreated(a));
    // Replaying doesn't panic or touch the arena slot; the created node is
    // just never looked up again by a rolled-back driver.
    log.replay(&mut arena);
  }
}
