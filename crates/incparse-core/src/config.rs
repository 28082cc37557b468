/// Construction-time options for an [`crate::driver::IncParser`], in the
/// chainable-builder style of a `ParserConfig`: a `Default` impl plus
/// `with_*` setters rather than a long constructor argument list.
#[derive(Debug, Clone)]
pub struct ParserConfig {
  /// Name of the grammar's LR variant (`"lr0"`, `"lr1"`, ...). Purely
  /// informational — the driver itself is agnostic to which LR flavor
  /// produced the table it's handed.
  pub lr_type: String,
  /// Terminal names the lexer tags `"<ws>"`; used by the indentation
  /// engine to recognize whitespace runs.
  pub whitespaces: Vec<String>,
  /// Name of the grammar's start nonterminal.
  pub startsymbol: String,
  /// Opaque identifier for a caller-owned on-disk cache keyed to this
  /// grammar/table pairing. `incparse-core` never reads or writes a
  /// cache itself; this field exists only so a caller can thread an id
  /// through to its own cache layer.
  pub cache_id: Option<u64>,
  /// Enables the indentation engine. Off by default: most grammars
  /// aren't whitespace-sensitive.
  pub indentation_based: bool,
  /// Terminal names the indentation engine's logical-line test treats as
  /// comments (normally learned from a grammar's `comment` nonterminal;
  /// supplied directly here since grammar compilation is out of scope).
  pub comment_tokens: Vec<String>,
}

impl Default for ParserConfig {
  fn default() -> Self {
    Self {
      lr_type: "lr1".to_string(),
      whitespaces: vec!["<ws>".to_string()],
      startsymbol: String::new(),
      cache_id: None,
      indentation_based: false,
      comment_tokens: Vec::new(),
    }
  }
}

impl ParserConfig {
  pub fn new(startsymbol: impl Into<String>) -> Self {
    Self { startsymbol: startsymbol.into(), ..Self::default() }
  }

  pub fn with_lr_type(mut self, lr_type: impl Into<String>) -> Self {
    self.lr_type = lr_type.into();
    self
  }

  pub fn with_whitespaces(mut self, whitespaces: Vec<String>) -> Self {
    self.whitespaces = whitespaces;
    self
  }

  pub fn with_cache_id(mut self, cache_id: u64) -> Self {
    self.cache_id = Some(cache_id);
    self
  }

  pub fn with_indentation_based(mut self, indentation_based: bool) -> Self {
    self.indentation_based = indentation_based;
    self
  }

  pub fn with_comment_tokens(mut self, comment_tokens: Vec<String>) -> Self {
    self.comment_tokens = comment_tokens;
    self
  }

  pub fn is_whitespace(&self, lookup: &str) -> bool {
    self.whitespaces.iter().any(|w| w == lookup)
  }

  pub fn is_comment_token(&self, lookup: &str) -> bool {
    self.comment_tokens.iter().any(|c| c == lookup)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_treats_ws_tag_as_whitespace() {
    let config = ParserConfig::default();
    assert!(config.is_whitespace("<ws>"));
    assert!(!config.is_whitespace("<return>"));
    assert!(!config.indentation_based);
  }

  #[test]
  fn builder_setters_chain() {
    let config = ParserConfig::new("Program")
      .with_lr_type("lalr")
      .with_indentation_based(true)
      .with_comment_tokens(vec!["#".to_string()]);
    assert_eq!(config.startsymbol, "Program");
    assert_eq!(config.lr_type, "lalr");
    assert!(config.indentation_based);
    assert!(config.is_comment_token("#"));
    assert!(!config.is_comment_token("//"));
  }
}
