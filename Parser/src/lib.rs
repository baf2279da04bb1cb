use core::ast::*;
use core::errors::{ErrorKind, SourceError};
use core::tokens::{Token, TokenIdx, TokenKind, TokenKind::*, TokenList};

mod parse_expressions;
mod parse_statements;

/// If the current token matches any of the provided kinds, consume it
/// and return true; otherwise leave the cursor untouched and return
/// false.
#[macro_export]
macro_rules! match_tok {
  ($s:expr, $id:ident $(| $ids:ident)*) => {
    $s.matches(&$id) $(|| $s.matches(&$ids))*
  };
}

/// True if the current token matches any of the provided kinds, without
/// consuming it.
#[macro_export]
macro_rules! check_tok {
  ($s:expr, $id:ident $(| $ids:ident)*) => {
    $s.check(&$id) $(|| $s.check(&$ids))*
  };
}

/// A reference to the current token's kind.
#[macro_export]
macro_rules! curr_tk {
  ($s:ident) => {
    $s.get_curr_tk()
  };
}

/// Consumes an identifier token and emits an `Identifier` node for it.
#[macro_export]
macro_rules! consume_id {
  ($s:ident, $err:expr) => {{
    let tok_idx = $s.consume(&IDENTIFIER, $err)?;
    $s.ast.push(Identifier(tok_idx))
  }};
}

/// The result of parsing a node or part of a node.
pub type NodeResult<T> = Result<T, SourceError>;

/// Sentra's recursive-descent parser with precedence climbing for
/// expressions. Converts a flat token stream into an `ASTArena`,
/// recording a source location on every node it emits.
pub struct Parser<'a> {
  tokens: &'a TokenList<'a>,
  current_pos: usize,
  pub ast: ASTArena,
  is_in_panic: bool,
  errors: Vec<SourceError>,
}

impl<'a> Parser<'a> {
  /// Parses an entire token list into an AST, collecting every
  /// synchronization-recoverable error along the way.
  pub fn parse(tokens: &'a TokenList) -> Result<ASTArena, Vec<SourceError>> {
    let mut parser = Parser {
      tokens,
      current_pos: 0,
      is_in_panic: false,
      errors: vec![],
      ast: ASTArena::default(),
    };

    while !parser.is_at_end() {
      match parser.parse_statement() {
        Ok(stmt) => parser.ast.attach_to_root(stmt),
        Err(e) => {
          parser.errors.push(e);
          parser.synchronize();
        }
      }
    }

    if parser.errors.is_empty() {
      Ok(parser.ast)
    } else {
      Err(parser.errors)
    }
  }

  fn is_at_end(&self) -> bool {
    self.get_curr_tk().type_match(&EOF)
  }

  fn prev_tok(&self) -> &Token {
    &self.tokens[self.current_pos - 1]
  }

  fn curr_tok(&self) -> &Token {
    &self.tokens[self.current_pos]
  }

  fn get_prev_tk(&self) -> &TokenKind {
    &self.prev_tok().kind
  }

  fn get_curr_tk(&self) -> &TokenKind {
    &self.curr_tok().kind
  }

  /// True if the current token matches `tk`, without consuming it.
  fn check(&self, tk: &TokenKind) -> bool {
    self.get_curr_tk().type_match(tk)
  }

  /// Consumes the current token if it matches `tk`.
  fn matches(&mut self, tk: &TokenKind) -> bool {
    if self.check(tk) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn advance(&mut self) -> &Token {
    if !self.is_at_end() {
      self.current_pos += 1;
    }
    self.prev_tok()
  }

  /// Consumes the current token only if it is of kind `tk`, otherwise
  /// reports a syntax error at the offending token.
  fn consume(&mut self, tk: &TokenKind, message: &str) -> NodeResult<TokenIdx> {
    if self.check(tk) {
      self.advance();
      return Ok(self.current_pos - 1);
    }

    Err(self.error_at_current(message))
  }

  fn error_at_current(&self, message: &str) -> SourceError {
    self.error_at_tok(self.current_pos, message)
  }

  fn error_at_prev(&self, message: &str) -> SourceError {
    self.error_at_tok(self.current_pos - 1, message)
  }

  fn error_at_tok(&self, tok_idx: TokenIdx, message: &str) -> SourceError {
    let tok = &self.tokens[tok_idx];
    let loc = tok.get_location();
    let lexeme_len = (loc.span.1 - loc.span.0).max(1);

    let detail = if let ERROR(e) = &tok.kind {
      e.to_str().to_string()
    } else {
      message.to_string()
    };

    SourceError::new(ErrorKind::Syntax, detail, loc.line_num, loc.col_start, lexeme_len)
  }

  /// Skips tokens until a likely statement boundary, to limit
  /// cascading errors after a parse failure.
  fn synchronize(&mut self) {
    self.is_in_panic = false;

    while !self.is_at_end() {
      if let SEMICOLON = self.get_prev_tk() {
        return;
      }

      if matches![
        self.get_curr_tk(),
        FN_KW
          | LET_KW
          | VAR_KW
          | CONST_KW
          | FOR_KW
          | IF_KW
          | WHILE_KW
          | RETURN_KW
          | IMPORT_KW
          | TRY_KW
          | MATCH_KW
          | L_CURLY
      ] {
        return;
      }

      self.advance();
    }
  }
}
