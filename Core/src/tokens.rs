use std::ops::Index;
use std::path::PathBuf;

/// The index of a Token inside a TokenList.
pub type TokenIdx = usize;

/// A read-only view over the tokens produced by the lexer, together with
/// the raw source characters they were carved out of. Kept as a flat
/// index rather than owned strings so tokens stay cheap to copy around
/// the parser and compiler.
pub struct TokenList<'a> {
  pub tokens: &'a [Token],
  pub src: &'a [char],
  pub filepath: &'a PathBuf,
}

impl<'a> Index<usize> for TokenList<'a> {
  type Output = Token;
  fn index(&self, index: usize) -> &Self::Output {
    &self.tokens[index]
  }
}

impl<'a> TokenList<'a> {
  /// Builds a new `TokenList` over an already-lexed token slice and the
  /// source characters it was carved out of.
  ///
  /// # Arguments
  ///
  /// * `filepath`: The source file's path, kept for error reporting.
  /// * `src`: A reference to the source list of characters.
  /// * `tokens`: A reference to the source list of lexed tokens.
  ///
  /// # Returns:
  /// ```TokenList```
  pub fn new(filepath: &'a PathBuf, src: &'a [char], tokens: &'a [Token]) -> Self {
    Self { src, tokens, filepath }
  }

  /// Gets the lexeme of a token based on its location information.
  ///
  /// # Arguments
  ///
  /// * `idx`: The index of the token in the list of tokens.
  ///
  /// # Returns:
  /// ```String```
  pub fn lexeme(&self, idx: TokenIdx) -> String {
    let tok = &self[idx];

    match &tok.kind {
      TokenKind::ERROR(e) => e.to_str().to_string(),
      TokenKind::EOF => "\0".to_string(),
      _ => self.src[tok.span.0..tok.span.1].iter().collect(),
    }
  }

  /// Gets the source-code location information of a token.
  ///
  /// # Arguments
  ///
  /// * `idx`: The index of the token in the list of tokens.
  ///
  /// # Returns:
  /// ```TokenLoc```
  pub fn location(&self, idx: TokenIdx) -> TokenLoc {
    self[idx].get_location()
  }
}

/// The source-code location information for a Token.
pub struct TokenLoc {
  pub line_num: usize,
  pub col_start: usize,
  pub span: (usize, usize),
  pub line_start: usize,
}

/// A single lexical unit of a Sentra program.
#[derive(Clone)]
pub struct Token {
  /// The token's 1-indexed line number.
  pub line_num: usize,
  /// The index in the source's char list of the first character of this
  /// token's line.
  pub line_start: usize,
  /// The token's lexeme span, as (start, end) indices into the source.
  pub span: (usize, usize),
  pub kind: TokenKind,
}

impl Token {
  pub fn get_location(&self) -> TokenLoc {
    TokenLoc {
      line_num: self.line_num,
      col_start: self.span.0 - self.line_start,
      span: self.span,
      line_start: self.line_start,
    }
  }
}

/// The kinds of tokens recognized by the scanner.
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq)]
#[repr(u8)]
pub enum TokenKind {
  // Symbols
  BANG,           // !
  COLON,          // :
  COMMA,          // ,
  DASH,           // -
  DASH_EQ,        // -=
  DOT,            // .
  DOUBLE_AMP,     // &&
  DOUBLE_BAR,     // ||
  EQUALS,         // =
  GREATER_THAN,   // >
  GREATER_THAN_EQ,// >=
  LESS_THAN,      // <
  LESS_THAN_EQ,   // <=
  LOGIC_EQ,       // ==
  LOGIC_NOT_EQ,   // !=
  L_BRACKET,      // [
  L_CURLY,        // {
  L_PAREN,        // (
  PERCENT,        // %
  PERCENT_EQ,     // %=
  PLUS,           // +
  PLUS_EQ,        // +=
  R_BRACKET,      // ]
  R_CURLY,        // }
  R_PAREN,        // )
  SEMICOLON,      // ;
  SLASH,          // /
  SLASH_EQ,       // /=
  STAR,           // *
  STAR_EQ,        // *=
  THICK_ARROW,    // =>
  UNDERSCORE,     // _ (match wildcard)

  // Literals
  FLOAT_LIT,
  IDENTIFIER,
  INT_LIT,
  STR_LIT,

  // Keywords
  AS_KW,
  BREAK_KW,
  CATCH_KW,
  CONST_KW,
  CONTINUE_KW,
  ELSE_KW,
  EXPORT_KW,
  FALSE_KW,
  FINALLY_KW,
  FN_KW,
  FOR_KW,
  IF_KW,
  IMPORT_KW,
  IN_KW,
  LET_KW,
  LOG_KW,
  MATCH_KW,
  NULL_KW,
  RETURN_KW,
  THROW_KW,
  TRUE_KW,
  TRY_KW,
  VAR_KW,
  WHILE_KW,

  EOF,
  ERROR(ErrorTokenKind),
}

impl TokenKind {
  /// Checks that this token is of a given kind, ignoring any inner payload.
  ///
  /// # Parameters
  /// - `token_type`: The token kind to be matched against this token.
  pub fn type_match(&self, token_type: &TokenKind) -> bool {
    std::mem::discriminant(self) == std::mem::discriminant(token_type)
  }
}

/// Maps a keyword or wildcard lexeme to its token kind; falls back to a
/// plain identifier.
///
/// # Parameters
/// - `id`: The identifier's string name.
///
/// # Returns
/// `TokenKind`: The kind matched for the given identifier name.
pub fn make_identifier_kind(id: &str) -> TokenKind {
  match id {
    "as" => TokenKind::AS_KW,
    "break" => TokenKind::BREAK_KW,
    "catch" => TokenKind::CATCH_KW,
    "const" => TokenKind::CONST_KW,
    "continue" => TokenKind::CONTINUE_KW,
    "else" => TokenKind::ELSE_KW,
    "export" => TokenKind::EXPORT_KW,
    "false" => TokenKind::FALSE_KW,
    "finally" => TokenKind::FINALLY_KW,
    "fn" => TokenKind::FN_KW,
    "for" => TokenKind::FOR_KW,
    "if" => TokenKind::IF_KW,
    "import" => TokenKind::IMPORT_KW,
    "in" => TokenKind::IN_KW,
    "let" => TokenKind::LET_KW,
    "log" => TokenKind::LOG_KW,
    "match" => TokenKind::MATCH_KW,
    "null" => TokenKind::NULL_KW,
    "return" => TokenKind::RETURN_KW,
    "throw" => TokenKind::THROW_KW,
    "true" => TokenKind::TRUE_KW,
    "try" => TokenKind::TRY_KW,
    "var" => TokenKind::VAR_KW,
    "while" => TokenKind::WHILE_KW,
    "_" => TokenKind::UNDERSCORE,
    _ => TokenKind::IDENTIFIER,
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorTokenKind {
  /// Invalid character.
  InvalidChar,
  /// Unterminated string.
  UnterminatedStr,
  /// Unterminated block comment.
  UnterminatedBlockComment,
  /// Invalid escape sequence inside a string literal.
  BadEscapeSequence,
  /// A number literal has more than one '.'.
  ExtraDotInFloat,
}

impl ErrorTokenKind {
  pub fn to_str(&self) -> &str {
    match self {
      ErrorTokenKind::InvalidChar => "Invalid character.",
      ErrorTokenKind::UnterminatedStr => "Unterminated string.",
      ErrorTokenKind::UnterminatedBlockComment => "Unterminated block comment.",
      ErrorTokenKind::BadEscapeSequence => "Invalid escape sequence.",
      ErrorTokenKind::ExtraDotInFloat => "Unexpected extra '.' in number literal.",
    }
  }
}
