//! The incremental LR driver: the optimistic-shift / breakdown parse loop
//! that walks the existing tree left to right, reusing unchanged subtrees
//! where possible and falling back to ordinary LR shift/reduce where not.

use crate::{
  config::ParserConfig,
  error::{DriverError, DriverResult},
  indent::{self, IndentState},
  node::Node,
  tree::Tree,
  undo::{UndoEntry, UndoLog},
};
use incparse_runtime::{Action, AnySymbolVariant, Fold, IndentationKind, Production, ProductionId, Symbol, SyntaxTable};
use std::collections::{BTreeMap, HashSet};

use crate::arena::NodeId;

/// Stack entries carry either a real tree node or the `FinishSymbol`
/// sentinel seeded at the bottom of every parse attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackSymbol {
  Finish,
  Node(NodeId),
}

impl StackSymbol {
  fn node(self) -> DriverResult<NodeId> {
    match self {
      StackSymbol::Node(id) => Ok(id),
      StackSymbol::Finish => Err(DriverError::InternalError("stack underflow: reached the FinishSymbol sentinel".to_string())),
    }
  }
}

/// The result of one `inc_parse` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
  Accept,
  Error,
}

enum TerminalOutcome {
  Accept,
  Error(NodeId),
  Advance(NodeId),
  /// No action was available while validating an optimistic shift: the
  /// shift was undone by `right_breakdown` and the same lookahead is
  /// re-attempted.
  Retry,
}

/// Owns the parse tree and drives it to `Accept` or `Error` against a
/// [`SyntaxTable`]. Single-threaded and synchronous: a parse either
/// commits its changes or rolls every mutation back through the undo log
/// before returning.
pub struct IncParser<T: SyntaxTable> {
  config: ParserConfig,
  table: T,
  tree: Tree,
  stack: Vec<(StackSymbol, u32)>,
  current_state: u32,
  validating: bool,
  any_count: HashSet<NodeId>,
  any_newlines: Vec<NodeId>,
  indent_state: IndentState,
  last_shift_state: u32,
  last_status: bool,
  error_node: Option<NodeId>,
  status_by_version: BTreeMap<u64, bool>,
  errornode_by_version: BTreeMap<u64, Option<NodeId>>,
  last_error: Option<DriverError>,
}

impl<T: SyntaxTable> IncParser<T> {
  pub fn new(config: ParserConfig, table: T) -> Self {
    Self {
      config,
      table,
      tree: Tree::new(),
      stack: Vec::new(),
      current_state: 0,
      validating: false,
      any_count: HashSet::new(),
      any_newlines: Vec::new(),
      indent_state: IndentState::new(),
      last_shift_state: 0,
      last_status: false,
      error_node: None,
      status_by_version: BTreeMap::new(),
      errornode_by_version: BTreeMap::new(),
      last_error: None,
    }
  }

  /// Rebuilds `Root(BOS, EOS)` and discards whatever tree this parser
  /// previously held.
  pub fn init_tree(&mut self) {
    self.tree = Tree::new();
  }

  pub fn tree(&self) -> &Tree {
    &self.tree
  }

  /// The editor's mutation surface: mark edited nodes `changed`, splice
  /// in freshly lexed terminals, before calling [`Self::inc_parse`]. Only
  /// mutations performed *during* `inc_parse` are undo-logged — this is
  /// the starting point each attempt rolls back to, not a target of
  /// rollback itself.
  pub fn tree_mut(&mut self) -> &mut Tree {
    &mut self.tree
  }

  pub fn config(&self) -> &ParserConfig {
    &self.config
  }

  pub fn error_node(&self) -> Option<NodeId> {
    self.error_node
  }

  /// The [`DriverError::ParseError`] describing the most recent rejection,
  /// populated alongside [`Self::error_node`] whenever `inc_parse` returns
  /// [`ParseOutcome::Error`]. `None` after an `Accept` or before the first
  /// parse attempt.
  pub fn last_error(&self) -> Option<&DriverError> {
    self.last_error.as_ref()
  }

  pub fn last_status(&self) -> bool {
    self.last_status
  }

  pub fn save_status(&mut self, version: u64) {
    self.status_by_version.insert(version, self.last_status);
    self.errornode_by_version.insert(version, self.error_node);
  }

  pub fn load_status(&mut self, version: u64) -> DriverResult<()> {
    let status = *self.status_by_version.get(&version).ok_or(DriverError::MissingVersion { version })?;
    let error_node = *self.errornode_by_version.get(&version).ok_or(DriverError::MissingVersion { version })?;
    self.last_status = status;
    self.error_node = error_node;
    Ok(())
  }

  pub fn get_next_possible_symbols(&self, state: u32) -> HashSet<Symbol> {
    self.table.entries().filter(|&(s, _)| s == state).map(|(_, sym)| sym.clone()).collect()
  }

  /// A filtered view of [`Self::get_next_possible_symbols`] that drops
  /// configured whitespace terminals, for rendering "expected ..."
  /// messages without whitespace noise.
  pub fn get_expected_symbols(&self, state: u32) -> HashSet<Symbol> {
    self.get_next_possible_symbols(state).into_iter().filter(|sym| !self.config.is_whitespace(sym.name())).collect()
  }

  pub fn reparse(&mut self) -> DriverResult<ParseOutcome> {
    self.inc_parse(true)
  }

  /// Performs one incremental parse over the current tree. `reparse`
  /// forces every Nonterminal to be treated as changed, i.e. a full
  /// left-to-right re-walk with no optimistic reuse.
  pub fn inc_parse(&mut self, reparse: bool) -> DriverResult<ParseOutcome> {
    let _span = tracing::debug_span!("inc_parse", reparse).entered();
    self.validating = false;
    self.error_node = None;
    self.last_error = None;
    self.stack.clear();
    self.stack.push((StackSymbol::Finish, 0));
    self.current_state = 0;
    self.any_count.clear();
    self.any_newlines.clear();
    self.indent_state = IndentState::new();

    let mut undo = UndoLog::new();

    let bos = self.tree.bos();
    let eos = self.tree.eos();

    let mut d = self.tree.prev_term(eos);
    while let Some(id) = d {
      if matches!(self.tree.symbol(id), Symbol::IndentationTerminal(_)) {
        d = self.tree.prev_term(id);
      } else {
        break;
      }
    }
    self.indent_state.last_token_before_eos = d;

    if d.map(|id| self.tree.node(id).is_bos()).unwrap_or(false) {
      let mut n = self.tree.next_term(bos);
      while let Some(id) = n {
        if matches!(self.tree.symbol(id), Symbol::IndentationTerminal(_)) {
          let next = self.tree.next_term(id);
          self.tree.remove_node(id, &mut undo);
          n = next;
        } else {
          break;
        }
      }
    }

    if self.config.indentation_based {
      match self.tree.next_term(bos) {
        Some(id) if self.tree.node(id).lookup == "<ws>" => {
          self.tree.insert_after(bos, Node::new(Symbol::IndentationTerminal(IndentationKind::Indent), 0, vec![]), &mut undo);
        }
        Some(id) if matches!(self.tree.symbol(id), Symbol::IndentationTerminal(_)) => {
          self.tree.remove_node(id, &mut undo);
        }
        _ => {}
      }
    }

    let mut la = self.tree.pop_lookahead(bos);
    loop {
      if self.tree.symbol(la).is_terminal() {
        match self.parse_terminal(la, &mut undo)? {
          TerminalOutcome::Accept => {
            self.last_status = true;
            return Ok(ParseOutcome::Accept);
          }
          TerminalOutcome::Error(node) => {
            let state = self.tree.node(node).state;
            self.last_error = Some(DriverError::ParseError {
              state,
              found: self.lookup_symbol(node),
              expected: self.get_expected_symbols(self.current_state).into_iter().collect(),
            });
            undo.replay(self.tree.arena_mut());
            self.error_node = Some(node);
            self.last_status = false;
            return Ok(ParseOutcome::Error);
          }
          TerminalOutcome::Advance(next) => la = next,
          TerminalOutcome::Retry => {}
        }
      } else if self.tree.node(la).changed || reparse {
        undo.push(UndoEntry::Changed(la, self.tree.node(la).changed));
        la = self.tree.left_breakdown(la);
      } else if let Some(Action::Goto(next_state)) = self.table.action(self.current_state, self.tree.symbol(la)) {
        self.stack.push((StackSymbol::Node(la), next_state));
        if let Some(indent) = self.tree.node(la).indent.clone() {
          self.indent_state.last_indent = indent;
        }
        self.current_state = next_state;
        la = self.tree.pop_lookahead(la);
        self.validating = true;
      } else {
        let first = self.tree.first_terminal_descendant(la);
        let lookup = self.lookup_symbol(first);
        match self.table.action(self.current_state, &lookup) {
          Some(Action::Reduce(p)) => self.reduce(p, &mut undo)?,
          _ => la = self.tree.left_breakdown(la),
        }
      }
    }
  }

  fn parse_terminal(&mut self, la: NodeId, undo: &mut UndoLog) -> DriverResult<TerminalOutcome> {
    if !matches!(self.tree.symbol(la), Symbol::FinishSymbol) && self.process_any(la, undo) {
      return Ok(TerminalOutcome::Advance(self.tree.pop_lookahead(la)));
    }

    let lookup = self.lookup_symbol(la);
    match self.table.action(self.current_state, &lookup) {
      Some(Action::Accept) => {
        let (top, _) = *self.stack.get(1).ok_or_else(|| DriverError::InternalError("stack underflow on accept".to_string()))?;
        let top = top.node()?;
        self.tree.finish_parse(top);
        Ok(TerminalOutcome::Accept)
      }
      Some(Action::Shift(s)) => {
        self.validating = false;
        self.shift(la, Some(s), false, undo)?;
        Ok(TerminalOutcome::Advance(self.tree.pop_lookahead(la)))
      }
      Some(Action::Reduce(p)) => {
        self.reduce(p, undo)?;
        self.parse_terminal(la, undo)
      }
      Some(Action::Goto(_)) => Err(DriverError::InternalError("unexpected GOTO action while parsing a terminal".to_string())),
      None => {
        if self.validating {
          self.right_breakdown(undo)?;
          self.validating = false;
          Ok(TerminalOutcome::Retry)
        } else {
          Ok(TerminalOutcome::Error(la))
        }
      }
    }
  }

  /// Undoes an optimistic shift: pops the Nonterminal, re-shifts its
  /// children one at a time through the normal shift path (including
  /// any-symbol handling), and leaves `current_state` at whatever state
  /// preceded the original optimistic shift.
  fn right_breakdown(&mut self, undo: &mut UndoLog) -> DriverResult<()> {
    let (popped, _) = self.stack.pop().ok_or_else(|| DriverError::InternalError("stack underflow during right breakdown".to_string()))?;
    let mut node = popped.node()?;
    self.current_state = self.stack.last().ok_or_else(|| DriverError::InternalError("stack underflow during right breakdown".to_string()))?.1;

    loop {
      if !self.tree.symbol(node).is_nonterminal() {
        break;
      }
      let children = self.tree.children(node).to_vec();
      for child in children {
        if !self.process_any(child, undo) {
          self.shift(child, None, true, undo)?;
        }
      }
      let (next, _) = self.stack.pop().ok_or_else(|| DriverError::InternalError("stack underflow during right breakdown".to_string()))?;
      if let StackSymbol::Finish = next {
        self.current_state = 0;
        self.stack.push((StackSymbol::Finish, 0));
        return Ok(());
      }
      node = next.node()?;
      self.current_state = self.stack.last().ok_or_else(|| DriverError::InternalError("stack underflow during right breakdown".to_string()))?.1;
    }

    if !self.process_any(node, undo) {
      self.shift(node, None, true, undo)?;
    }
    Ok(())
  }

  /// Pushes `la` onto the stack under `target_state` (computed from the
  /// syntax table unless `target_state` is already known, as it is for an
  /// ordinary terminal `Shift`). Runs indentation repair unless this is a
  /// right-breakdown re-shift.
  fn shift(&mut self, la: NodeId, target_state: Option<u32>, rb: bool, undo: &mut UndoLog) -> DriverResult<()> {
    let target = match target_state {
      Some(s) => s,
      None => {
        let lookup = self.lookup_symbol(la);
        match self.table.action(self.current_state, &lookup) {
          Some(Action::Shift(s)) | Some(Action::Goto(s)) => s,
          _ => {
            return Err(DriverError::InternalError(format!(
              "no shift/goto action for state {} and symbol {}",
              self.current_state, lookup
            )))
          }
        }
      }
    };

    self.tree.set_state(la, target);
    self.stack.push((StackSymbol::Node(la), target));
    self.current_state = target;

    if self.tree.node(la).lookup != "<ws>" {
      self.last_shift_state = target;
    }

    if self.config.indentation_based && !rb {
      indent::parse_whitespace(&mut self.tree, undo, &self.config, &mut self.indent_state, la);
    }
    Ok(())
  }

  fn reduce(&mut self, production_id: ProductionId, undo: &mut UndoLog) -> DriverResult<()> {
    let production = self.table.production(production_id).clone();
    let rhs_len = production.len();
    let mut children: Vec<(NodeId, Fold)> = Vec::with_capacity(rhs_len);
    let mut i = 0;
    while i < rhs_len {
      let (popped, _) =
        self.stack.pop().ok_or_else(|| DriverError::InternalError("stack underflow during reduce".to_string()))?;
      let child = popped.node()?;
      let fold = production.rhs[rhs_len - i - 1].fold;
      children.insert(0, (child, fold));
      if !self.any_count.contains(&child) {
        i += 1;
      }
    }

    let (_, top_state) = *self.stack.last().ok_or_else(|| DriverError::InternalError("stack underflow during reduce".to_string()))?;
    self.current_state = top_state;

    let goto_state = match self.table.action(self.current_state, &production.lhs) {
      Some(Action::Goto(s)) => s,
      _ => {
        return Err(DriverError::InternalError(format!(
          "reduction error on {} in state {}: goto is undefined",
          production.lhs, self.current_state
        )))
      }
    };

    let child_ids: Vec<NodeId> = children.iter().map(|&(id, _)| id).collect();
    let new_node = self.tree.reduce_to_nonterminal(production.lhs.clone(), goto_state, child_ids.clone(), undo);

    let indent = child_ids.iter().filter_map(|&c| self.tree.node(c).indent.clone()).max_by_key(|v| v.len());
    if let Some(indent) = indent {
      self.tree.set_indent(new_node, Some(indent));
    }

    self.stack.push((StackSymbol::Node(new_node), goto_state));
    self.current_state = goto_state;

    self.build_alternate(new_node, &production, &children);
    Ok(())
  }

  /// Dispatches to the production's annotation if it has one; otherwise
  /// builds a folded alternate view from the children's folding tags.
  fn build_alternate(&mut self, new_node: NodeId, production: &Production, children: &[(NodeId, Fold)]) {
    let state = self.tree.node(new_node).state;

    if let Some(annotation) = &production.annotation {
      let symbols: Vec<Symbol> = children.iter().map(|&(id, _)| self.tree.symbol(id).clone()).collect();
      if let Some(alt_symbol) = annotation(&symbols) {
        let alt = self.tree.arena_mut().insert(Node::new(alt_symbol, state, vec![]));
        self.tree.arena_mut().get_mut(new_node).alternate = Some(alt);
      }
      return;
    }

    let mut alt_symbol = production.lhs.clone();
    let mut alt_children = Vec::new();
    let mut teared: Vec<NodeId> = Vec::new();
    for (i, &(child, fold)) in children.iter().enumerate() {
      if let Some(insert_symbol) = production.inserts.get(&i) {
        let mut remaining = Vec::new();
        for t in teared.drain(..) {
          if self.tree.symbol(t).name() == insert_symbol.name() {
            alt_children.push(t);
          } else {
            remaining.push(t);
          }
        }
        teared = remaining;
      }
      match fold {
        Fold::Tear => teared.push(child),
        Fold::SpliceWithSymbol => {
          let deepest = self.deepest_alternate(child);
          alt_symbol = self.tree.symbol(deepest).clone();
          alt_children.extend(self.tree.children(deepest).iter().copied());
        }
        Fold::Splice => {
          let deepest = self.deepest_alternate(child);
          alt_children.extend(self.tree.children(deepest).iter().copied());
        }
        Fold::None => alt_children.push(child),
      }
    }
    let alt = self.tree.arena_mut().insert(Node::new(alt_symbol, state, alt_children));
    self.tree.arena_mut().get_mut(new_node).alternate = Some(alt);
  }

  fn deepest_alternate(&self, mut node: NodeId) -> NodeId {
    while let Some(alt) = self.tree.node(node).alternate {
      node = alt;
    }
    node
  }

  /// The lookup symbol the syntax table is keyed on: the node's `lookup`
  /// tag when the lexer set one, otherwise its own symbol; indentation
  /// terminals are presented to the table as plain named terminals.
  fn lookup_symbol(&self, id: NodeId) -> Symbol {
    let node = self.tree.node(id);
    let sym = if !node.lookup.is_empty() { Symbol::Terminal(node.lookup.clone()) } else { node.symbol.clone() };
    match sym {
      Symbol::IndentationTerminal(kind) => Symbol::Terminal(kind.to_string()),
      other => other,
    }
  }

  fn parse_anysymbol(&self) -> Option<(u32, AnySymbolVariant)> {
    if let Some(action) = self.table.action(self.current_state, &Symbol::any_symbol(AnySymbolVariant::Default)) {
      if let Action::Goto(s) | Action::Shift(s) = action {
        return Some((s, AnySymbolVariant::Default));
      }
    }
    match self.table.action(self.current_state, &Symbol::any_symbol(AnySymbolVariant::NoCarriageReturn)) {
      Some(Action::Goto(s)) | Some(Action::Shift(s)) => Some((s, AnySymbolVariant::NoCarriageReturn)),
      _ => None,
    }
  }

  /// Consults `ACTION[current_state, AnySymbol]`; if an any-region is
  /// active, decides whether `la` ends it or belongs inside it. Returns
  /// `true` iff `la` was consumed (pushed into the region).
  fn process_any(&mut self, la: NodeId, undo: &mut UndoLog) -> bool {
    let Some((result_state, variant)) = self.parse_anysymbol() else {
      return false;
    };

    let lookup = self.lookup_symbol(la);
    if matches!(self.table.action(result_state, &lookup), Some(Action::Shift(_))) {
      self.end_any(result_state, undo);
      return false;
    }

    let ncr_terminator = variant == AnySymbolVariant::NoCarriageReturn
      && (self.tree.node(la).lookup == "<return>"
        || *self.tree.symbol(la) == Symbol::IndentationTerminal(IndentationKind::Newline)
        || self.tree.node(la).is_eos());
    if ncr_terminator {
      self.end_any(result_state, undo);
      return false;
    }

    self.push_any(la);
    true
  }

  fn push_any(&mut self, la: NodeId) {
    self.tree.set_state(la, self.current_state);
    self.stack.push((StackSymbol::Node(la), self.current_state));
    self.any_count.insert(la);
    if self.tree.node(la).lookup == "<return>" && self.config.indentation_based {
      self.any_newlines.push(la);
    }
  }

  fn end_any(&mut self, result_state: u32, undo: &mut UndoLog) {
    self.current_state = result_state;
    if self.config.indentation_based {
      let newlines = std::mem::take(&mut self.any_newlines);
      let ws = *self.indent_state.last_indent.last().unwrap_or(&0);
      for n in newlines {
        let newindent = self.indent_state.last_indent.clone();
        indent::update_succeeding_lines(&mut self.tree, undo, &self.config, &mut self.indent_state, n, ws, newindent);
      }
    }
  }
}
