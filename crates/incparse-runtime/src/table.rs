use crate::{
  action::{Action, Production, ProductionId},
  symbol::Symbol,
};
use std::collections::HashMap;

/// The syntax table: a pure function `(state, symbol) -> action`. Grammar
/// compilation (turning grammar rules into a state graph and this table)
/// is out of scope for this crate and treated as an external collaborator,
/// so this is consumed as an opaque, already-built structure.
pub trait SyntaxTable {
  fn action(&self, state: u32, symbol: &Symbol) -> Option<Action>;

  fn production(&self, id: ProductionId) -> &Production;

  /// All `(state, symbol)` pairs with a defined action, for
  /// `get_next_possible_symbols` / `get_expected_symbols`.
  fn entries(&self) -> Box<dyn Iterator<Item = (u32, &Symbol)> + '_>;
}

/// The thinnest possible stand-in `SyntaxTable`: a flat map plus a
/// production list, filled in directly by a [`TableBuilder`]. This is not
/// a grammar-to-table compiler (LALR construction remains out of scope);
/// it exists so the driver has something concrete to drive against in
/// tests, and so a caller with a real grammar compiler can still target
/// this same trait.
#[derive(Default)]
pub struct StaticSyntaxTable {
  actions: HashMap<(u32, Symbol), Action>,
  productions: Vec<Production>,
}

impl SyntaxTable for StaticSyntaxTable {
  fn action(&self, state: u32, symbol: &Symbol) -> Option<Action> {
    self.actions.get(&(state, symbol.clone())).copied()
  }

  fn production(&self, id: ProductionId) -> &Production {
    &self.productions[id.0 as usize]
  }

  fn entries(&self) -> Box<dyn Iterator<Item = (u32, &Symbol)> + '_> {
    Box::new(self.actions.keys().map(|(s, sym)| (*s, sym)))
  }
}

/// Builder for [`StaticSyntaxTable`], in the chainable style of a
/// `ParserConfig` builder (`set_k`, `use_fork_states`, ...).
#[derive(Default)]
pub struct TableBuilder {
  table: StaticSyntaxTable,
}

impl TableBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn shift(mut self, state: u32, symbol: Symbol, target: u32) -> Self {
    self.table.actions.insert((state, symbol), Action::Shift(target));
    self
  }

  pub fn goto(mut self, state: u32, symbol: Symbol, target: u32) -> Self {
    self.table.actions.insert((state, symbol), Action::Goto(target));
    self
  }

  pub fn accept(mut self, state: u32, symbol: Symbol) -> Self {
    self.table.actions.insert((state, symbol), Action::Accept);
    self
  }

  /// Registers `production` and wires up a `Reduce` action for
  /// `(state, lookahead)`. Returns the assigned [`ProductionId`] alongside
  /// `self` so callers can reference it (e.g. from `goto` after the
  /// reduce's implied pop).
  pub fn reduce(mut self, state: u32, lookahead: Symbol, production: Production) -> (Self, ProductionId) {
    let id = ProductionId(self.table.productions.len() as u32);
    self.table.productions.push(production);
    self.table.actions.insert((state, lookahead), Action::Reduce(id));
    (self, id)
  }

  pub fn build(self) -> StaticSyntaxTable {
    self.table
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_registers_distinct_action_kinds() {
    let table = TableBuilder::new().shift(0, Symbol::terminal("a"), 1).goto(1, Symbol::nonterminal("S"), 2).build();
    assert_eq!(table.action(0, &Symbol::terminal("a")), Some(Action::Shift(1)));
    assert_eq!(table.action(1, &Symbol::nonterminal("S")), Some(Action::Goto(2)));
    assert_eq!(table.action(0, &Symbol::terminal("b")), None);
  }

  #[test]
  fn reduce_registers_production_and_returns_its_id() {
    let (builder, id) =
      TableBuilder::new().shift(0, Symbol::terminal("a"), 1).reduce(1, Symbol::FinishSymbol, Production::new(Symbol::nonterminal("S"), vec![]));
    let table = builder.build();
    assert_eq!(table.action(1, &Symbol::FinishSymbol), Some(Action::Reduce(id)));
    assert_eq!(table.production(id).lhs, Symbol::nonterminal("S"));
  }

  #[test]
  fn entries_enumerates_every_registered_state_symbol_pair() {
    let table = TableBuilder::new().shift(0, Symbol::terminal("a"), 1).shift(0, Symbol::terminal("b"), 2).build();
    let mut states: Vec<u32> = table.entries().map(|(s, _)| s).collect();
    states.sort();
    assert_eq!(states, vec![0, 0]);
  }
}
