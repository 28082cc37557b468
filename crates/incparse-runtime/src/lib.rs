//! Runtime types shared by the incremental LR parser core: the grammar
//! [`symbol::Symbol`] alphabet, the [`action::Action`]/[`action::Production`]
//! pair that a syntax table hands back, and the [`table::SyntaxTable`]
//! collaborator interface itself.
//!
//! Grammar compilation — turning grammar rules into a state graph and a
//! syntax table — is out of scope here (see `SPEC_FULL.md` §1 and §4.5):
//! this crate only defines the shapes that such a table produces and
//! consumes.

pub mod action;
pub mod symbol;
pub mod table;

pub use action::{Action, Fold, Production, ProductionId, RhsSymbol};
pub use symbol::{any_symbol, AnySymbolVariant, IndentationKind, Symbol};
pub use table::{StaticSyntaxTable, SyntaxTable, TableBuilder};
