use incparse_runtime::Symbol;
use thiserror::Error;

/// Errors produced while driving a parse. `ParseError` is the routine,
/// expected outcome of feeding the driver input the grammar rejects;
/// `InternalError` signals that the driver's own invariants were
/// violated and indicates a bug in this crate or in the supplied
/// [`incparse_runtime::SyntaxTable`].
#[derive(Debug, Error)]
pub enum DriverError {
  #[error("parse error at state {state}: unexpected {found}, expected one of {expected:?}")]
  ParseError { state: u32, found: Symbol, expected: Vec<Symbol> },

  #[error("no saved status for version {version}")]
  MissingVersion { version: u64 },

  #[error("internal error: {0}")]
  InternalError(String),
}

pub type DriverResult<T> = Result<T, DriverError>;
