use core::tokens::ErrorTokenKind::*;
use core::tokens::Token;
use core::tokens::TokenKind::*;

use crate::Lexer;

impl<'a> Lexer<'a> {
  /// Lexes a decimal integer or floating-point literal. The leading
  /// digit has already been consumed by the caller.
  ///
  /// ```bnf
  /// number := DIGIT+ ('.' DIGIT+)?
  /// ```
  pub(crate) fn make_number_token(&mut self) -> Token {
    while self.get_current().is_ascii_digit() {
      self.advance();
    }

    let mut is_float = false;

    if self.get_current() == '.' && self.get_next().is_ascii_digit() {
      is_float = true;
      self.advance(); // consume '.'

      while self.get_current().is_ascii_digit() {
        self.advance();
      }

      // A second fractional dot (e.g. `1.2.3`) is a lexical error rather
      // than two adjacent tokens, since it can never be a valid program.
      if self.get_current() == '.' && self.get_next().is_ascii_digit() {
        while self.get_current() == '.' || self.get_current().is_ascii_digit() {
          self.advance();
        }
        return self.make_error_token(ExtraDotInFloat);
      }
    }

    self.make_token(if is_float { FLOAT_LIT } else { INT_LIT })
  }
}
