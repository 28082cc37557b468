//! Synthetic indentation tokens around logical lines: computing what a
//! line's `NEWLINE`/`INDENT`/`DEDENT`/`UNBALANCED` sequence should look
//! like given an indent stack, repairing the tree in place when it
//! doesn't match, and propagating the change forward to lines whose own
//! tokens depend on it.

use crate::{arena::NodeId, node::Node, tree::Tree, undo::UndoLog, ParserConfig};
use incparse_runtime::{IndentationKind, Symbol};

/// Driver-owned indentation bookkeeping that survives across one
/// `inc_parse` call's line-by-line repair walk.
#[derive(Debug, Clone)]
pub struct IndentState {
  pub last_indent: Vec<u32>,
  pub last_token_before_eos: Option<NodeId>,
}

impl IndentState {
  pub fn new() -> Self {
    Self { last_indent: vec![0], last_token_before_eos: None }
  }
}

impl Default for IndentState {
  fn default() -> Self {
    Self::new()
  }
}

/// A line is non-logical if, scanning forward to the next `<return>` or
/// EOS, every node is whitespace, an indentation terminal, or a
/// configured comment token; a trailing `\` before the `\r` also makes
/// it non-logical (line continuation).
pub fn is_logical_line(tree: &Tree, config: &ParserConfig, node: NodeId) -> bool {
  if let Some(prev) = tree.prev_term(node) {
    if tree.symbol(node).name() == "\r" && tree.symbol(prev).name() == "\\" {
      return false;
    }
  }
  let mut n = match tree.next_term(node) {
    Some(n) => n,
    None => return false,
  };
  loop {
    if tree.node(n).is_eos() {
      return false;
    }
    let lookup = tree.node(n).lookup.as_str();
    if config.is_comment_token(lookup) {
      return false;
    }
    if lookup == "<return>" {
      return false;
    }
    if lookup == "<ws>" || matches!(tree.symbol(n), Symbol::IndentationTerminal(_)) {
      n = tree.next_term(n).expect("terminal chain must reach EOS");
      continue;
    }
    return true;
  }
}

/// The leading whitespace width of the logical line starting at `node`
/// (a `<return>`), or `None` if the line is non-logical.
pub fn get_whitespace(tree: &Tree, config: &ParserConfig, node: NodeId) -> Option<u32> {
  if !is_logical_line(tree, config, node) {
    return None;
  }
  let mut n = tree.next_term(node).expect("terminal chain must reach EOS");
  while matches!(tree.symbol(n), Symbol::IndentationTerminal(_)) {
    n = tree.next_term(n).expect("terminal chain must reach EOS");
  }
  Some(if tree.node(n).lookup == "<ws>" { tree.symbol(n).name().len() as u32 } else { 0 })
}

/// The leading whitespace width of the nearest preceding logical line.
pub fn get_previous_ws(tree: &Tree, config: &ParserConfig, node: NodeId) -> u32 {
  let mut n = node;
  loop {
    n = match tree.prev_term(n) {
      Some(p) => p,
      None => return 0,
    };
    if tree.node(n).is_bos() {
      return 0;
    }
    if tree.node(n).lookup != "<return>" {
      continue;
    }
    if !is_logical_line(tree, config, n) {
      continue;
    }
    let next = tree.next_term(n).expect("terminal chain must reach EOS");
    return if tree.node(next).lookup == "<ws>" { tree.symbol(next).name().len() as u32 } else { 0 };
  }
}

/// Computes the token sequence a logical line needs given the previous
/// indent stack and its own leading whitespace width, plus the indent
/// stack that results from applying them.
pub fn indentation_tokens_and_indent(indent: &[u32], ws: u32) -> (Vec<IndentationKind>, Vec<u32>) {
  let top = *indent.last().expect("indent stack is never empty");
  let mut needed = vec![IndentationKind::Newline];
  let newindent = if ws > top {
    needed.push(IndentationKind::Indent);
    let mut v = indent.to_vec();
    v.push(ws);
    v
  } else if ws < top {
    let mut stack = indent.to_vec();
    while ws < *stack.last().expect("indent stack is never empty") {
      stack.pop();
      needed.push(IndentationKind::Dedent);
    }
    if *stack.last().expect("indent stack is never empty") != ws {
      needed.push(IndentationKind::Unbalanced);
    }
    stack
  } else {
    indent.to_vec()
  };
  (needed, newindent)
}

pub fn indents_differ(there: &[Symbol], needed: &[IndentationKind]) -> bool {
  if there.len() != needed.len() {
    return true;
  }
  there.iter().zip(needed).any(|(t, &n)| *t != Symbol::IndentationTerminal(n))
}

fn indentation_run(tree: &Tree, node: NodeId) -> Vec<NodeId> {
  let mut there = Vec::new();
  let mut n = tree.next_term(node);
  while let Some(id) = n {
    if matches!(tree.symbol(id), Symbol::IndentationTerminal(_)) {
      there.push(id);
      n = tree.next_term(id);
    } else {
      break;
    }
  }
  there
}

fn indents_match(tree: &Tree, node: NodeId, needed: &[IndentationKind]) -> bool {
  let there: Vec<Symbol> = indentation_run(tree, node).iter().map(|&id| tree.symbol(id).clone()).collect();
  !indents_differ(&there, needed)
}

/// Updates the indentation tokens following `node`: renames tokens in
/// place where the kind changed, inserts any that are missing, and
/// removes any that are surplus.
pub fn repair_indents(tree: &mut Tree, undo: &mut UndoLog, node: NodeId, there: &[NodeId], needed: &[IndentationKind]) {
  let mut last = node;
  let mut it = there.iter();
  for &kind in needed {
    if let Some(&existing) = it.next() {
      if *tree.symbol(existing) == Symbol::IndentationTerminal(kind) {
        last = existing;
        continue;
      }
      tree.rename_symbol(existing, Symbol::IndentationTerminal(kind), undo);
      tree.set_changed(existing, true, undo);
      last = existing;
      continue;
    }
    last = tree.insert_after(last, Node::new(Symbol::IndentationTerminal(kind), 0, vec![]), undo);
  }
  for &surplus in it {
    tree.remove_node(surplus, undo);
  }
}

/// Recomputes and repairs the indentation tokens around `la`, which must
/// be a `<return>`, BOS, or the last real token before EOS.
pub fn parse_whitespace(tree: &mut Tree, undo: &mut UndoLog, config: &ParserConfig, state: &mut IndentState, la: NodeId) {
  let is_bos = tree.node(la).is_bos();
  let is_last_before_eos = state.last_token_before_eos == Some(la);
  if !(tree.node(la).lookup == "<return>" || is_bos || is_last_before_eos) {
    return;
  }

  let ws;
  let newindent;

  if !is_logical_line(tree, config, la) && !is_last_before_eos {
    let mut n = tree.next_term(la);
    while let Some(id) = n {
      if matches!(tree.symbol(id), Symbol::IndentationTerminal(_)) {
        let next = tree.next_term(id);
        tree.remove_node(id, undo);
        n = next;
      } else {
        break;
      }
    }
    tree.set_indent(la, None);
    newindent = state.last_indent.clone();
    ws = get_previous_ws(tree, config, la);
  } else {
    let there = indentation_run(tree, la);
    let n = tree.next_term(there.last().copied().unwrap_or(la));
    let w = match n {
      Some(id) if tree.node(id).lookup == "<ws>" => tree.symbol(id).name().len() as u32,
      _ => 0,
    };
    ws = w;

    let (needed, computed) = indentation_tokens_and_indent(&state.last_indent, ws);
    let indent_stack_eq = tree.node(la).indent.as_ref() == Some(&computed);

    if !is_last_before_eos {
      tree.set_indent(la, Some(computed.clone()));
      state.last_indent = computed.clone();
    }
    newindent = computed;

    let there_symbols: Vec<Symbol> = there.iter().map(|&id| tree.symbol(id).clone()).collect();
    if indents_differ(&there_symbols, &needed) {
      repair_indents(tree, undo, la, &there, &needed);
    } else if indent_stack_eq {
      return;
    }
  }

  update_succeeding_lines(tree, undo, config, state, la, ws, newindent);
}

/// Walks forward from `la` marking every logical `<return>` whose own
/// indentation tokens would now change, stopping once a shallower line
/// closes the scope or EOS is reached.
pub fn update_succeeding_lines(
  tree: &mut Tree,
  undo: &mut UndoLog,
  config: &ParserConfig,
  state: &mut IndentState,
  la: NodeId,
  ws: u32,
  newindent: Vec<u32>,
) {
  let mut newindent = newindent;
  let mut next_r = tree.next_term(la);
  loop {
    let n = match next_r {
      Some(n) => n,
      None => break,
    };
    if tree.node(n).is_eos() {
      let mut eos_there = Vec::new();
      let mut d = tree.prev_term(n);
      while let Some(id) = d {
        if matches!(tree.symbol(id), Symbol::IndentationTerminal(_)) {
          eos_there.insert(0, id);
          d = tree.prev_term(id);
        } else {
          break;
        }
      }
      let (eos_needed, _) = indentation_tokens_and_indent(&state.last_indent, 0);
      let eos_there_symbols: Vec<Symbol> = eos_there.iter().map(|&id| tree.symbol(id).clone()).collect();
      if indents_differ(&eos_there_symbols, &eos_needed) {
        if let Some(last) = state.last_token_before_eos {
          tree.set_changed(last, true, undo);
        }
      }
      break;
    }
    if tree.node(n).lookup != "<return>" {
      next_r = tree.next_term(n);
      continue;
    }
    let next_ws = match get_whitespace(tree, config, n) {
      Some(w) => w,
      None => {
        next_r = tree.next_term(n);
        continue;
      }
    };
    let (needed, computed) = indentation_tokens_and_indent(&newindent, next_ws);
    if !indents_match(tree, n, &needed) || tree.node(n).indent.as_ref() != Some(&computed) {
      tree.set_changed(n, true, undo);
    }
    if next_ws < ws {
      break;
    }
    newindent = computed;
    next_r = tree.next_term(n);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  #[rstest]
  #[case::increase(vec![0], 4, vec![IndentationKind::Newline, IndentationKind::Indent], vec![0, 4])]
  #[case::decrease(vec![0, 4], 0, vec![IndentationKind::Newline, IndentationKind::Dedent], vec![0])]
  #[case::decrease_past_every_level_is_unbalanced(
    vec![0, 4, 8],
    2,
    vec![IndentationKind::Newline, IndentationKind::Dedent, IndentationKind::Dedent, IndentationKind::Unbalanced],
    vec![0]
  )]
  #[case::unchanged_is_bare_newline(vec![0, 4], 4, vec![IndentationKind::Newline], vec![0, 4])]
  fn indentation_tokens_and_indent_cases(
    #[case] indent: Vec<u32>,
    #[case] ws: u32,
    #[case] expected_tokens: Vec<IndentationKind>,
    #[case] expected_stack: Vec<u32>,
  ) {
    let (tokens, stack) = indentation_tokens_and_indent(&indent, ws);
    assert_eq!(tokens, expected_tokens);
    assert_eq!(stack, expected_stack);
  }

  #[test]
  fn indents_differ_detects_length_and_kind_mismatch() {
    let there = vec![Symbol::IndentationTerminal(IndentationKind::Newline)];
    let needed = vec![IndentationKind::Newline, IndentationKind::Indent];
    assert!(indents_differ(&there, &needed));

    let there = vec![Symbol::IndentationTerminal(IndentationKind::Newline), Symbol::IndentationTerminal(IndentationKind::Dedent)];
    let needed = vec![IndentationKind::Newline, IndentationKind::Indent];
    assert!(indents_differ(&there, &needed));

    let there = vec![Symbol::IndentationTerminal(IndentationKind::Newline), Symbol::IndentationTerminal(IndentationKind::Indent)];
    assert!(!indents_differ(&there, &needed));
  }

  /// `parse_whitespace` establishes `[NEWLINE, INDENT]` from scratch when a
  /// logical line's leading whitespace exceeds the enclosing stack's top.
  #[test]
  fn parse_whitespace_establishes_indent_from_scratch() {
    let mut tree = Tree::new();
    let mut scratch = UndoLog::new();
    let config = ParserConfig::default().with_indentation_based(true);
    let bos = tree.bos();

    let ret1 = tree.insert_after(bos, ret_node(), &mut scratch);
    let ws = tree.insert_after(ret1, ws_node("    "), &mut scratch);
    let _ident = tree.insert_after(ws, Node::new(Symbol::terminal("x"), 0, vec![]), &mut scratch);

    let mut state = IndentState::new();
    parse_whitespace(&mut tree, &mut scratch, &config, &mut state, ret1);

    assert_eq!(state.last_indent, vec![0, 4]);
    let there: Vec<Symbol> = indentation_run(&tree, ret1).iter().map(|&id| tree.symbol(id).clone()).collect();
    assert_eq!(there, vec![Symbol::IndentationTerminal(IndentationKind::Newline), Symbol::IndentationTerminal(IndentationKind::Indent)]);
  }

  /// Exercises the "Indentation insert" scenario from spec.md §8: a line
  /// whose leading whitespace narrowed relative to the enclosing stack
  /// gets its stale `INDENT` repaired into a `DEDENT`, and since the new
  /// width doesn't land exactly on a surviving stack level, `UNBALANCED`
  /// follows it.
  #[test]
  fn parse_whitespace_repairs_stale_indent_into_dedent() {
    let mut tree = Tree::new();
    let mut scratch = UndoLog::new();
    let config = ParserConfig::default().with_indentation_based(true);
    let bos = tree.bos();

    let ret1 = tree.insert_after(bos, ret_node(), &mut scratch);
    // Stale token from the prior parse, before the user deleted three of
    // the four leading spaces on this line.
    let indent_tok = tree.insert_after(ret1, Node::new(Symbol::IndentationTerminal(IndentationKind::Indent), 0, vec![]), &mut scratch);
    let ws = tree.insert_after(indent_tok, ws_node(" "), &mut scratch);
    let _ident = tree.insert_after(ws, Node::new(Symbol::terminal("x"), 0, vec![]), &mut scratch);

    let mut state = IndentState::new();
    state.last_indent = vec![0, 4];
    parse_whitespace(&mut tree, &mut scratch, &config, &mut state, ret1);

    let there: Vec<Symbol> = indentation_run(&tree, ret1).iter().map(|&id| tree.symbol(id).clone()).collect();
    assert_eq!(
      there,
      vec![
        Symbol::IndentationTerminal(IndentationKind::Newline),
        Symbol::IndentationTerminal(IndentationKind::Dedent),
        Symbol::IndentationTerminal(IndentationKind::Unbalanced),
      ]
    );
    assert_eq!(state.last_indent, vec![0]);
  }

  fn ret_node() -> Node {
    let mut n = Node::new(Symbol::terminal("\r"), 0, vec![]);
    n.lookup = "<return>".to_string();
    n
  }

  fn ws_node(spaces: &str) -> Node {
    let mut n = Node::new(Symbol::terminal(spaces.to_string()), 0, vec![]);
    n.lookup = "<ws>".to_string();
    n
  }
}
