//! The mutable parse tree. Every mutation that touches a *surviving*
//! node's `parent`/`left`/`right`/`prev_term`/`next_term`/`log`/`changed`/
//! symbol-name fields is routed through one of the methods below so it is
//! automatically recorded on the caller's [`UndoLog`] first. `state`,
//! `indent`, and `lookup` are intentionally *not* undo-logged: `state` is
//! never trusted from a node that has been left-broken-down (the driver's
//! stack is authoritative), and `indent` is a driver-maintained snapshot
//! outside the structural undo contract.

use crate::{
  arena::{NodeArena, NodeId},
  node::{Node, NodeKind},
  undo::{UndoEntry, UndoLog},
};
use incparse_runtime::Symbol;

pub struct Tree {
  arena: NodeArena,
  root: NodeId,
  bos: NodeId,
  eos: NodeId,
}

impl Tree {
  /// Builds `Root(BOS, EOS)` and saves it as version 0.
  pub fn new() -> Self {
    let mut arena = NodeArena::new();
    let bos = arena.insert(Node::sentinel(NodeKind::Bos, Symbol::terminal("")));
    let eos = arena.insert(Node::sentinel(NodeKind::Eos, Symbol::FinishSymbol));
    {
      let b = arena.get_mut(bos);
      b.next_term = Some(eos);
      b.right = Some(eos);
    }
    {
      let e = arena.get_mut(eos);
      e.prev_term = Some(bos);
      e.left = Some(bos);
    }
    let root = arena.insert(Node::new(Symbol::nonterminal("Root"), 0, vec![bos, eos]));
    arena.get_mut(bos).parent = Some(root);
    arena.get_mut(eos).parent = Some(root);
    arena.get_mut(root).save(0);
    arena.get_mut(bos).save(0);
    arena.get_mut(eos).save(0);
    Self { arena, root, bos, eos }
  }

  pub fn root(&self) -> NodeId {
    self.root
  }
  pub fn bos(&self) -> NodeId {
    self.bos
  }
  pub fn eos(&self) -> NodeId {
    self.eos
  }

  pub fn node(&self, id: NodeId) -> &Node {
    self.arena.get(id)
  }

  pub fn arena(&self) -> &NodeArena {
    &self.arena
  }

  pub fn arena_mut(&mut self) -> &mut NodeArena {
    &mut self.arena
  }

  pub fn symbol(&self, id: NodeId) -> &Symbol {
    &self.arena.get(id).symbol
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    &self.arena.get(id).children
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.arena.get(id).parent
  }

  pub fn left(&self, id: NodeId) -> Option<NodeId> {
    self.arena.get(id).left
  }

  pub fn right(&self, id: NodeId) -> Option<NodeId> {
    self.arena.get(id).right
  }

  pub fn next_term(&self, id: NodeId) -> Option<NodeId> {
    self.arena.get(id).next_term
  }

  pub fn prev_term(&self, id: NodeId) -> Option<NodeId> {
    self.arena.get(id).prev_term
  }

  // --- undo-tracked mutators -------------------------------------------------

  pub fn set_changed(&mut self, id: NodeId, value: bool, undo: &mut UndoLog) {
    let old = self.arena.get(id).changed;
    if old == value {
      return;
    }
    undo.push(UndoEntry::Changed(id, old));
    self.arena.get_mut(id).changed = value;
  }

  pub fn rename_symbol(&mut self, id: NodeId, new_symbol: Symbol, undo: &mut UndoLog) {
    let old = self.arena.get(id).symbol.clone();
    undo.push(UndoEntry::SymbolName(id, old));
    self.arena.get_mut(id).symbol = new_symbol;
  }

  /// `state` is not undo-logged: authoritative only while a node sits on
  /// the driver's stack.
  pub fn set_state(&mut self, id: NodeId, state: u32) {
    self.arena.get_mut(id).state = state;
  }

  /// `indent` is always overwritten with the current snapshot and never
  /// undo-logged.
  pub fn set_indent(&mut self, id: NodeId, indent: Option<Vec<u32>>) {
    self.arena.get_mut(id).indent = indent;
  }

  /// Constructs a new Nonterminal from `children` (a Reduce): each popped
  /// child's `parent`/`left`/`right`/`log` are snapshotted to `undo`
  /// before the new parent overwrites them.
  pub fn reduce_to_nonterminal(&mut self, symbol: Symbol, state: u32, children: Vec<NodeId>, undo: &mut UndoLog) -> NodeId {
    for &child in &children {
      let n = self.arena.get(child);
      undo.push(UndoEntry::Parent(child, n.parent));
      undo.push(UndoEntry::Left(child, n.left));
      undo.push(UndoEntry::Right(child, n.right));
      undo.push(UndoEntry::Log(child, n.log.clone()));
    }
    let new_id = self.arena.insert(Node::new(symbol, state, children.clone()));
    undo.push(UndoEntry::NodeCreated(new_id));
    let last = children.len().saturating_sub(1);
    for (i, &child) in children.iter().enumerate() {
      let c = self.arena.get_mut(child);
      c.parent = Some(new_id);
      c.left = if i > 0 { Some(children[i - 1]) } else { None };
      c.right = if i < last { Some(children[i + 1]) } else { None };
    }
    new_id
  }

  /// Inserts `new_node` as the right sibling of `after`, splicing it into
  /// both the sibling chain and the terminal chain. This is how the
  /// indentation engine inserts synthetic tokens during repair.
  pub fn insert_after(&mut self, after: NodeId, new_node: Node, undo: &mut UndoLog) -> NodeId {
    let parent = self.arena.get(after).parent;
    let old_right = self.arena.get(after).right;
    let old_next_term = self.arena.get(after).next_term;

    let new_id = self.arena.insert(new_node);
    undo.push(UndoEntry::NodeCreated(new_id));

    if let Some(p) = parent {
      let siblings = self.arena.get(p).children.clone();
      undo.push(UndoEntry::Children(p, siblings.clone()));
      let idx = siblings.iter().position(|&c| c == after).expect("after must be a child of its parent");
      let mut new_children = siblings;
      new_children.insert(idx + 1, new_id);
      self.arena.get_mut(p).children = new_children;
      self.arena.get_mut(new_id).parent = Some(p);
    }

    undo.push(UndoEntry::Left(new_id, None));
    undo.push(UndoEntry::Right(new_id, None));
    self.arena.get_mut(new_id).left = Some(after);
    self.arena.get_mut(new_id).right = old_right;

    undo.push(UndoEntry::Right(after, old_right));
    self.arena.get_mut(after).right = Some(new_id);
    if let Some(r) = old_right {
      undo.push(UndoEntry::Left(r, Some(after)));
      self.arena.get_mut(r).left = Some(new_id);
    }

    undo.push(UndoEntry::PrevTerm(new_id, None));
    undo.push(UndoEntry::NextTerm(new_id, None));
    self.arena.get_mut(new_id).prev_term = Some(after);
    self.arena.get_mut(new_id).next_term = old_next_term;

    undo.push(UndoEntry::NextTerm(after, old_next_term));
    self.arena.get_mut(after).next_term = Some(new_id);
    if let Some(nt) = old_next_term {
      undo.push(UndoEntry::PrevTerm(nt, Some(after)));
      self.arena.get_mut(nt).prev_term = Some(new_id);
    }

    new_id
  }

  /// Unlinks `id` from its parent's children, its siblings, and the
  /// terminal chain. This is how the indentation engine removes surplus
  /// indentation tokens during repair. `id` itself is left allocated but
  /// unreachable.
  pub fn remove_node(&mut self, id: NodeId, undo: &mut UndoLog) {
    let n = self.arena.get(id).clone_links();
    if let Some(p) = n.parent {
      let siblings = self.arena.get(p).children.clone();
      undo.push(UndoEntry::Children(p, siblings.clone()));
      let mut new_children = siblings;
      new_children.retain(|&c| c != id);
      self.arena.get_mut(p).children = new_children;
    }
    if let Some(l) = n.left {
      undo.push(UndoEntry::Right(l, Some(id)));
      self.arena.get_mut(l).right = n.right;
    }
    if let Some(r) = n.right {
      undo.push(UndoEntry::Left(r, Some(id)));
      self.arena.get_mut(r).left = n.left;
    }
    if let Some(pt) = n.prev_term {
      undo.push(UndoEntry::NextTerm(pt, Some(id)));
      self.arena.get_mut(pt).next_term = n.next_term;
    }
    if let Some(nt) = n.next_term {
      undo.push(UndoEntry::PrevTerm(nt, Some(id)));
      self.arena.get_mut(nt).prev_term = n.prev_term;
    }
  }

  /// Final step of a successful parse: `Root.children` becomes
  /// `[BOS, top_symbol, EOS]`. Not undo-tracked — Accept discards the log.
  pub fn finish_parse(&mut self, top: NodeId) {
    let (bos, eos, root) = (self.bos, self.eos, self.root);
    self.arena.get_mut(root).children = vec![bos, top, eos];
    self.arena.get_mut(top).parent = Some(root);
    self.arena.get_mut(top).left = Some(bos);
    self.arena.get_mut(top).right = Some(eos);
    self.arena.get_mut(bos).right = Some(top);
    self.arena.get_mut(eos).left = Some(top);
  }

  // --- traversal used by the driver ------------------------------------------

  /// Ascends until a node with a right sibling is found and returns that
  /// sibling; reaching Root means the next lookahead is EOS.
  pub fn pop_lookahead(&self, la: NodeId) -> NodeId {
    let mut n = la;
    loop {
      if let Some(r) = self.right(n) {
        return r;
      }
      match self.parent(n) {
        Some(p) => n = p,
        None => return self.eos,
      }
    }
  }

  /// The leftmost child, or (if childless) the lookahead's right sibling
  /// via `pop_lookahead`.
  pub fn left_breakdown(&self, la: NodeId) -> NodeId {
    match self.children(la).first() {
      Some(&first) => first,
      None => self.pop_lookahead(la),
    }
  }

  /// The leftmost terminal descendant of `id` (used to pick an action
  /// when an optimistic `GOTO` is unavailable).
  pub fn first_terminal_descendant(&self, id: NodeId) -> NodeId {
    let mut n = id;
    while let Some(&first) = self.children(n).first() {
      n = first;
    }
    n
  }
}

impl Default for Tree {
  fn default() -> Self {
    Self::new()
  }
}

/// Plain-data view of a node's links, used internally by [`Tree::remove_node`]
/// to avoid holding an arena borrow across mutations.
struct Links {
  parent: Option<NodeId>,
  left: Option<NodeId>,
  right: Option<NodeId>,
  prev_term: Option<NodeId>,
  next_term: Option<NodeId>,
}

impl Node {
  fn clone_links(&self) -> Links {
    Links { parent: self.parent, left: self.left, right: self.right, prev_term: self.prev_term, next_term: self.next_term }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::undo::UndoLog;

  #[test]
  fn new_tree_has_bos_eos_threaded() {
    let tree = Tree::new();
    assert_eq!(tree.next_term(tree.bos()), Some(tree.eos()));
    assert_eq!(tree.prev_term(tree.eos()), Some(tree.bos()));
    assert_eq!(tree.children(tree.root()), &[tree.bos(), tree.eos()]);
  }

  #[test]
  fn insert_after_splices_sibling_and_terminal_chains() {
    let mut tree = Tree::new();
    let mut undo = UndoLog::new();
    let bos = tree.bos();
    let eos = tree.eos();

    let a = tree.insert_after(bos, Node::new(Symbol::terminal("a"), 0, vec![]), &mut undo);
    let b = tree.insert_after(a, Node::new(Symbol::terminal("b"), 0, vec![]), &mut undo);

    assert_eq!(tree.children(tree.root()), &[bos, a, b, eos]);
    assert_eq!(tree.next_term(bos), Some(a));
    assert_eq!(tree.next_term(a), Some(b));
    assert_eq!(tree.next_term(b), Some(eos));
    assert_eq!(tree.prev_term(eos), Some(b));
    assert_eq!(tree.left(b), Some(a));
    assert_eq!(tree.right(a), Some(b));
  }

  #[test]
  fn remove_node_unlinks_from_both_chains() {
    let mut tree = Tree::new();
    let mut undo = UndoLog::new();
    let bos = tree.bos();
    let eos = tree.eos();

    let a = tree.insert_after(bos, Node::new(Symbol::terminal("a"), 0, vec![]), &mut undo);
    let b = tree.insert_after(a, Node::new(Symbol::terminal("b"), 0, vec![]), &mut undo);
    tree.remove_node(a, &mut undo);

    assert_eq!(tree.children(tree.root()), &[bos, b, eos]);
    assert_eq!(tree.next_term(bos), Some(b));
    assert_eq!(tree.prev_term(b), Some(bos));
    assert_eq!(tree.next_term(b), Some(eos));
  }

  #[test]
  fn undo_replay_restores_pre_mutation_state() {
    let mut tree = Tree::new();
    let mut undo = UndoLog::new();
    let bos = tree.bos();
    let eos = tree.eos();
    let before = tree.children(tree.root()).to_vec();

    let a = tree.insert_after(bos, Node::new(Symbol::terminal("a"), 0, vec![]), &mut undo);
    tree.set_changed(a, true, &mut undo);
    assert_ne!(tree.children(tree.root()).to_vec(), before);

    undo.replay(tree.arena_mut());
    assert_eq!(tree.children(tree.root()).to_vec(), before);
    assert_eq!(tree.next_term(bos), Some(eos));
  }

  #[test]
  fn pop_lookahead_ascends_to_next_sibling() {
    let mut tree = Tree::new();
    let mut undo = UndoLog::new();
    let bos = tree.bos();
    let eos = tree.eos();
    let a = tree.insert_after(bos, Node::new(Symbol::terminal("a"), 0, vec![]), &mut undo);

    // A Nonterminal with no right sibling: pop_lookahead must ascend to
    // root and, finding none there either, land on EOS.
    let parent = tree.reduce_to_nonterminal(Symbol::nonterminal("S"), 0, vec![a], &mut undo);
    assert_eq!(tree.pop_lookahead(parent), eos);
  }

  #[test]
  fn left_breakdown_descends_to_leftmost_child() {
    let mut tree = Tree::new();
    let mut undo = UndoLog::new();
    let bos = tree.bos();
    let a = tree.insert_after(bos, Node::new(Symbol::terminal("a"), 0, vec![]), &mut undo);
    let b = tree.insert_after(a, Node::new(Symbol::terminal("b"), 0, vec![]), &mut undo);
    let parent = tree.reduce_to_nonterminal(Symbol::nonterminal("S"), 0, vec![a, b], &mut undo);
    assert_eq!(tree.left_breakdown(parent), a);
  }
}
