use crate::arena::NodeId;
use incparse_runtime::Symbol;
use std::collections::BTreeMap;

/// Distinguishes the two sentinel leaves from ordinary tree nodes.
/// Modeled as a flag on [`Node`] rather than a subclass — a boolean flag
/// plus a distinguished symbol is enough to make BOS/EOS behave like
/// any other node everywhere else in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
  Bos,
  Eos,
  Regular,
}

/// A per-version snapshot of the mutable fields of a [`Node`], used for
/// versioned reads. Only the fields that the undo log can roll back are
/// captured — `indent` and `lookup` are immutable-after-lex or
/// driver-owned snapshots, not part of the structural log.
#[derive(Debug, Clone, Default)]
pub struct NodeSnapshot {
  pub parent: Option<NodeId>,
  pub left: Option<NodeId>,
  pub right: Option<NodeId>,
  pub children: Vec<NodeId>,
  pub changed: bool,
}

/// A single parse-tree element. Every cyclic reference
/// (`parent`/`left`/`right`/`prev_term`/`next_term`) is a
/// [`NodeId`] handle into the owning [`crate::arena::NodeArena`], never an
/// owning pointer.
#[derive(Debug, Clone)]
pub struct Node {
  pub symbol: Symbol,
  /// The LR state that last shifted or reduced this node. Authoritative
  /// only for nodes currently on the driver's stack — the driver itself
  /// tracks `(NodeId, state)` pairs on the stack and never reads this
  /// field; it exists purely as a debugging convenience.
  pub state: u32,
  pub children: Vec<NodeId>,
  pub parent: Option<NodeId>,
  pub left: Option<NodeId>,
  pub right: Option<NodeId>,
  pub prev_term: Option<NodeId>,
  pub next_term: Option<NodeId>,
  pub changed: bool,
  /// Indentation stack snapshot valid at this node's position. Only
  /// meaningful on `<return>` terminals and on Nonterminals that
  /// transitively cover one.
  pub indent: Option<Vec<u32>>,
  /// Lexer-assigned tag: `""`, `"<ws>"`, `"<return>"`, or a terminal name.
  pub lookup: String,
  pub alternate: Option<NodeId>,
  pub log: BTreeMap<u64, NodeSnapshot>,
  /// For embedded-language BOS/EOS: points at the host node this
  /// sentinel pair is nested under.
  pub magic_parent: Option<NodeId>,
  pub kind: NodeKind,
}

impl Node {
  pub fn new(symbol: Symbol, state: u32, children: Vec<NodeId>) -> Self {
    Self {
      symbol,
      state,
      children,
      parent: None,
      left: None,
      right: None,
      prev_term: None,
      next_term: None,
      changed: false,
      indent: None,
      lookup: String::new(),
      alternate: None,
      log: BTreeMap::new(),
      magic_parent: None,
      kind: NodeKind::Regular,
    }
  }

  pub fn sentinel(kind: NodeKind, symbol: Symbol) -> Self {
    Self { kind, ..Self::new(symbol, 0, vec![]) }
  }

  pub fn is_bos(&self) -> bool {
    matches!(self.kind, NodeKind::Bos)
  }

  pub fn is_eos(&self) -> bool {
    matches!(self.kind, NodeKind::Eos)
  }

  pub fn snapshot(&self) -> NodeSnapshot {
    NodeSnapshot {
      parent: self.parent,
      left: self.left,
      right: self.right,
      children: self.children.clone(),
      changed: self.changed,
    }
  }

  /// Saves the current mutable fields under `version`, for later
  /// versioned reads.
  pub fn save(&mut self, version: u64) {
    let snap = self.snapshot();
    self.log.insert(version, snap);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use incparse_runtime::Symbol;

  #[test]
  fn snapshot_captures_only_structural_fields() {
    let mut n = Node::new(Symbol::terminal("x"), 3, vec![]);
    n.changed = true;
    n.indent = Some(vec![0, 4]);
    n.lookup = "<ws>".to_string();

    let snap = n.snapshot();
    assert!(snap.changed);
    assert_eq!(snap.parent, None);
    // state/indent/lookup are intentionally excluded from the undo-logged
    // snapshot: state is stack-authoritative and indent/lookup are driver
    // snapshots outside the structural undo contract.
  }

  #[test]
  fn save_keeps_one_snapshot_per_version() {
    let mut n = Node::new(Symbol::terminal("x"), 0, vec![]);
    n.save(0);
    n.changed = true;
    n.save(1);
    assert!(!n.log[&0].changed);
    assert!(n.log[&1].changed);
  }

  #[test]
  fn sentinel_nodes_are_tagged_and_childless() {
    let bos = Node::sentinel(NodeKind::Bos, Symbol::terminal(""));
    assert!(bos.is_bos());
    assert!(!bos.is_eos());
    assert!(bos.children.is_empty());
  }
}
