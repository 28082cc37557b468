use std::fmt;

/// The kind of synthetic token the indentation engine inserts around a
/// logical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndentationKind {
  Newline,
  Indent,
  Dedent,
  Unbalanced,
}

impl fmt::Display for IndentationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      IndentationKind::Newline => "NEWLINE",
      IndentationKind::Indent => "INDENT",
      IndentationKind::Dedent => "DEDENT",
      IndentationKind::Unbalanced => "UNBALANCED",
    };
    f.write_str(name)
  }
}

/// The `@ncr` ("no carriage return") variant of [`Symbol::AnySymbol`] also
/// terminates at `<return>`, at a synthetic `NEWLINE`, or at EOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AnySymbolVariant {
  #[default]
  Default,
  NoCarriageReturn,
}

/// A grammar symbol. Two symbols are equal iff their variant and
/// name/kind match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
  Terminal(String),
  Nonterminal(String),
  /// End-of-input sentinel seeded at the bottom of the parse stack.
  FinishSymbol,
  Epsilon,
  IndentationTerminal(IndentationKind),
  MagicTerminal,
  AnySymbol(AnySymbolVariant),
}

impl Symbol {
  pub fn terminal(name: impl Into<String>) -> Self {
    Symbol::Terminal(name.into())
  }

  pub fn nonterminal(name: impl Into<String>) -> Self {
    Symbol::Nonterminal(name.into())
  }

  pub fn any_symbol(variant: AnySymbolVariant) -> Self {
    any_symbol(variant)
  }

  pub fn is_terminal(&self) -> bool {
    !matches!(self, Symbol::Nonterminal(_))
  }

  pub fn is_nonterminal(&self) -> bool {
    matches!(self, Symbol::Nonterminal(_))
  }

  pub fn name(&self) -> &str {
    match self {
      Symbol::Terminal(name) | Symbol::Nonterminal(name) => name,
      Symbol::FinishSymbol => "$",
      Symbol::Epsilon => "",
      Symbol::IndentationTerminal(kind) => match kind {
        IndentationKind::Newline => "NEWLINE",
        IndentationKind::Indent => "INDENT",
        IndentationKind::Dedent => "DEDENT",
        IndentationKind::Unbalanced => "UNBALANCED",
      },
      Symbol::MagicTerminal => "<magic>",
      Symbol::AnySymbol(AnySymbolVariant::Default) => "AnySymbol",
      Symbol::AnySymbol(AnySymbolVariant::NoCarriageReturn) => "AnySymbol@ncr",
    }
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A grammar-declared "swallow anything until a terminator" region.
/// Constructed from [`AnySymbolVariant`] for convenience at call sites
/// that do `Symbol::any_symbol(AnySymbolVariant::Default)`.
pub fn any_symbol(variant: AnySymbolVariant) -> Symbol {
  Symbol::AnySymbol(variant)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn equality_requires_matching_variant_and_name() {
    assert_eq!(Symbol::terminal("a"), Symbol::terminal("a"));
    assert_ne!(Symbol::terminal("a"), Symbol::nonterminal("a"));
    assert_ne!(Symbol::terminal("a"), Symbol::terminal("b"));
    assert_eq!(any_symbol(AnySymbolVariant::Default), Symbol::AnySymbol(AnySymbolVariant::Default));
    assert_ne!(any_symbol(AnySymbolVariant::Default), any_symbol(AnySymbolVariant::NoCarriageReturn));
  }

  #[test]
  fn indentation_terminal_names_match_spec_tokens() {
    assert_eq!(Symbol::IndentationTerminal(IndentationKind::Newline).name(), "NEWLINE");
    assert_eq!(Symbol::IndentationTerminal(IndentationKind::Indent).name(), "INDENT");
    assert_eq!(Symbol::IndentationTerminal(IndentationKind::Dedent).name(), "DEDENT");
    assert_eq!(Symbol::IndentationTerminal(IndentationKind::Unbalanced).name(), "UNBALANCED");
  }

  #[test]
  fn is_terminal_and_is_nonterminal_are_mutually_exclusive() {
    assert!(Symbol::terminal("a").is_terminal());
    assert!(!Symbol::terminal("a").is_nonterminal());
    assert!(Symbol::nonterminal("S").is_nonterminal());
    assert!(!Symbol::nonterminal("S").is_terminal());
    assert!(Symbol::FinishSymbol.is_terminal());
  }
}
