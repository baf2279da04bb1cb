use core::tokens::{ErrorTokenKind, Token, TokenKind, TokenKind::*};

mod lex_numbers;
mod lex_strings;

#[macro_export]
macro_rules! char_is_ident_start {
  ($ch:expr) => {{
    $ch.is_alphabetic() || $ch == '_'
  }};
}

/// Converts a flat character slice into a flat token list, carving the
/// source up one lexeme at a time. Lexical errors are not fatal: they
/// are encoded as `TokenKind::ERROR` tokens inline in the stream so the
/// parser can report them through its normal error-recovery path.
pub struct Lexer<'a> {
  source: &'a [char],
  tokens: Vec<Token>,
  current: usize,
  line_num: usize,
  line_start: usize,
  token_start: usize,
}

impl<'a> Lexer<'a> {
  /// Scans `source` into a token list, always ending with a single
  /// `TokenKind::EOF` sentinel.
  pub fn lex(source: &'a [char]) -> Vec<Token> {
    let mut lexer = Lexer {
      source,
      tokens: vec![],
      current: 0,
      line_num: 1,
      line_start: 0,
      token_start: 0,
    };

    lexer.skip_shebang();

    while !lexer.is_at_end() {
      lexer.skip_whitespace();

      if lexer.is_at_end() {
        break;
      }

      lexer.token_start = lexer.current;
      let tok = lexer.next_token();
      lexer.tokens.push(tok);
    }

    lexer.token_start = lexer.current;
    lexer.tokens.push(lexer.make_token(EOF));
    lexer.tokens
  }

  /// A leading `#!...` line (a Unix shebang) is treated as a comment.
  fn skip_shebang(&mut self) {
    if self.get_current() == '#' && self.get_next() == '!' {
      while !self.is_at_end() && self.get_current() != '\n' {
        self.advance();
      }
    }
  }

  fn next_token(&mut self) -> Token {
    let c = self.advance();

    if char_is_ident_start!(c) {
      return self.make_identifier_token();
    }
    if c.is_ascii_digit() {
      return self.make_number_token();
    }

    match c {
      '"' => self.make_string_token(),
      '(' => self.make_token(L_PAREN),
      ')' => self.make_token(R_PAREN),
      '{' => self.make_token(L_CURLY),
      '}' => self.make_token(R_CURLY),
      '[' => self.make_token(L_BRACKET),
      ']' => self.make_token(R_BRACKET),
      ',' => self.make_token(COMMA),
      ':' => self.make_token(COLON),
      ';' => self.make_token(SEMICOLON),
      '.' => self.make_token(DOT),
      '_' => self.make_token(UNDERSCORE),
      '!' => {
        let kind = if self.matches('=') { LOGIC_NOT_EQ } else { BANG };
        self.make_token(kind)
      }
      '=' => {
        let kind = if self.matches('=') {
          LOGIC_EQ
        } else if self.matches('>') {
          THICK_ARROW
        } else {
          EQUALS
        };
        self.make_token(kind)
      }
      '>' => {
        let kind = if self.matches('=') { GREATER_THAN_EQ } else { GREATER_THAN };
        self.make_token(kind)
      }
      '<' => {
        let kind = if self.matches('=') { LESS_THAN_EQ } else { LESS_THAN };
        self.make_token(kind)
      }
      '+' => {
        let kind = if self.matches('=') { PLUS_EQ } else { PLUS };
        self.make_token(kind)
      }
      '-' => {
        let kind = if self.matches('=') { DASH_EQ } else { DASH };
        self.make_token(kind)
      }
      '*' => {
        let kind = if self.matches('=') { STAR_EQ } else { STAR };
        self.make_token(kind)
      }
      '/' => {
        let kind = if self.matches('=') { SLASH_EQ } else { SLASH };
        self.make_token(kind)
      }
      '%' => {
        let kind = if self.matches('=') { PERCENT_EQ } else { PERCENT };
        self.make_token(kind)
      }
      '&' if self.matches('&') => self.make_token(DOUBLE_AMP),
      '|' if self.matches('|') => self.make_token(DOUBLE_BAR),
      _ => self.make_error_token(ErrorTokenKind::InvalidChar),
    }
  }

  fn is_at_end(&self) -> bool {
    self.current >= self.source.len()
  }

  fn get_previous(&self) -> char {
    self.source[self.current - 1]
  }

  fn get_current(&self) -> char {
    if self.is_at_end() {
      '\0'
    } else {
      self.source[self.current]
    }
  }

  fn get_next(&self) -> char {
    if self.current + 1 >= self.source.len() {
      '\0'
    } else {
      self.source[self.current + 1]
    }
  }

  fn advance(&mut self) -> char {
    self.current += 1;
    self.get_previous()
  }

  fn matches(&mut self, expected: char) -> bool {
    if self.is_at_end() || self.get_current() != expected {
      return false;
    }
    self.current += 1;
    true
  }

  fn skip_whitespace(&mut self) {
    loop {
      if self.is_at_end() {
        break;
      }

      match self.get_current() {
        ' ' | '\r' | '\t' => self.current += 1,
        '\n' => {
          self.current += 1;
          self.line_num += 1;
          self.line_start = self.current;
        }
        '/' if self.get_next() == '/' => self.skip_line_comment(),
        '/' if self.get_next() == '*' => self.skip_block_comment(),
        _ => break,
      }
    }
  }

  fn skip_line_comment(&mut self) {
    while !self.is_at_end() && self.get_current() != '\n' {
      self.advance();
    }
  }

  /// Block comments may nest. Running off the end of the file leaves
  /// the cursor at EOF; the caller's main loop simply stops there.
  fn skip_block_comment(&mut self) {
    self.advance();
    self.advance();
    let mut depth = 1;

    while depth > 0 && !self.is_at_end() {
      if self.get_current() == '/' && self.get_next() == '*' {
        self.advance();
        self.advance();
        depth += 1;
      } else if self.get_current() == '*' && self.get_next() == '/' {
        self.advance();
        self.advance();
        depth -= 1;
      } else {
        if self.get_current() == '\n' {
          self.line_num += 1;
          self.line_start = self.current + 1;
        }
        self.advance();
      }
    }
  }

  fn make_identifier_token(&mut self) -> Token {
    while !self.is_at_end() {
      let c = self.get_current();
      if c.is_alphabetic() || c.is_ascii_digit() || c == '_' {
        self.advance();
      } else {
        break;
      }
    }

    let lexeme: String = self.source[self.token_start..self.current].iter().collect();
    self.make_token(core::tokens::make_identifier_kind(&lexeme))
  }

  fn make_token(&self, kind: TokenKind) -> Token {
    Token {
      line_num: self.line_num,
      line_start: self.line_start,
      span: (self.token_start, self.current),
      kind,
    }
  }

  fn make_error_token(&self, err: ErrorTokenKind) -> Token {
    Token {
      line_num: self.line_num,
      line_start: self.line_start,
      span: (self.token_start, self.current),
      kind: TokenKind::ERROR(err),
    }
  }
}
