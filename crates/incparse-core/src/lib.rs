//! Incremental LR parser core: given a syntax table and a previously
//! parsed tree with `changed` flags marking the edits, [`driver::IncParser`]
//! produces an updated tree in time proportional to the edit, not to
//! document size.
//!
//! The four pieces described in `SPEC_FULL.md` live here: the optimistic
//! shift / breakdown driver ([`driver`]), the undo log ([`undo`]) that
//! lets a failed parse roll the tree back exactly, the any-symbol engine
//! (folded into [`driver`], see `process_any`/`push_any`/`end_any`), and
//! indentation repair ([`indent`]). Grammar compilation and lexing are
//! external collaborators; this crate consumes an
//! [`incparse_runtime::SyntaxTable`] as an opaque, already-built
//! structure.

pub mod arena;
pub mod config;
pub mod driver;
pub mod error;
pub mod indent;
pub mod node;
pub mod tree;
pub mod undo;

pub use arena::{NodeArena, NodeId};
pub use config::ParserConfig;
pub use driver::{IncParser, ParseOutcome};
pub use error::{DriverError, DriverResult};
pub use node::{Node, NodeKind};
pub use tree::Tree;
pub use undo::{UndoEntry, UndoLog};

pub use incparse_runtime::{
  any_symbol, Action, AnySymbolVariant, Fold, IndentationKind, Production, ProductionId, RhsSymbol, StaticSyntaxTable,
  SyntaxTable, Symbol, TableBuilder,
};
