use core::tokens::{ErrorTokenKind, TokenKind};
use lexer::Lexer;

fn lex(src: &str) -> Vec<TokenKind> {
  let chars: Vec<char> = src.chars().collect();
  Lexer::lex(&chars).into_iter().map(|t| t.kind).collect()
}

#[test]
fn empty_source_is_just_eof() {
  let kinds = lex("");
  assert_eq!(kinds, vec![TokenKind::EOF]);
}

#[test]
fn skips_a_leading_shebang_line() {
  let kinds = lex("#!/usr/bin/env sentra\nlet x = 1;");
  assert_eq!(kinds[0], TokenKind::LET_KW);
}

#[test]
fn keywords_are_not_identifiers() {
  let kinds = lex("fn let var const if else while for in match return break continue import as export try catch finally throw true false null log");
  let expected = vec![
    TokenKind::FN_KW,
    TokenKind::LET_KW,
    TokenKind::VAR_KW,
    TokenKind::CONST_KW,
    TokenKind::IF_KW,
    TokenKind::ELSE_KW,
    TokenKind::WHILE_KW,
    TokenKind::FOR_KW,
    TokenKind::IN_KW,
    TokenKind::MATCH_KW,
    TokenKind::RETURN_KW,
    TokenKind::BREAK_KW,
    TokenKind::CONTINUE_KW,
    TokenKind::IMPORT_KW,
    TokenKind::AS_KW,
    TokenKind::EXPORT_KW,
    TokenKind::TRY_KW,
    TokenKind::CATCH_KW,
    TokenKind::FINALLY_KW,
    TokenKind::THROW_KW,
    TokenKind::TRUE_KW,
    TokenKind::FALSE_KW,
    TokenKind::NULL_KW,
    TokenKind::LOG_KW,
    TokenKind::EOF,
  ];
  assert_eq!(kinds, expected);
}

#[test]
fn an_identifier_can_start_with_underscore() {
  let kinds = lex("_private");
  assert_eq!(kinds, vec![TokenKind::IDENTIFIER, TokenKind::EOF]);
}

#[test]
fn bare_underscore_is_the_match_wildcard_token() {
  let kinds = lex("_");
  assert_eq!(kinds, vec![TokenKind::UNDERSCORE, TokenKind::EOF]);
}

#[test]
fn integer_and_float_literals() {
  let kinds = lex("42 3.14");
  assert_eq!(kinds, vec![TokenKind::INT_LIT, TokenKind::FLOAT_LIT, TokenKind::EOF]);
}

#[test]
fn a_second_dot_in_a_float_is_an_error_token() {
  let kinds = lex("1.2.3");
  assert!(matches!(kinds[0], TokenKind::ERROR(ErrorTokenKind::ExtraDotInFloat)));
}

#[test]
fn double_quoted_strings_with_escapes() {
  let kinds = lex(r#""hello\nworld""#);
  assert_eq!(kinds, vec![TokenKind::STR_LIT, TokenKind::EOF]);
}

#[test]
fn unterminated_string_is_an_error_token() {
  let kinds = lex("\"never closed");
  assert!(matches!(kinds[0], TokenKind::ERROR(ErrorTokenKind::UnterminatedStr)));
}

#[test]
fn bad_escape_sequence_is_an_error_token() {
  let kinds = lex(r#""bad \q escape""#);
  assert!(matches!(kinds[0], TokenKind::ERROR(ErrorTokenKind::BadEscapeSequence)));
}

#[test]
fn line_comments_are_skipped() {
  let kinds = lex("1 // this whole thing is a comment\n2");
  assert_eq!(kinds, vec![TokenKind::INT_LIT, TokenKind::INT_LIT, TokenKind::EOF]);
}

#[test]
fn block_comments_nest() {
  let kinds = lex("/* outer /* inner */ still outer */ 1");
  assert_eq!(kinds, vec![TokenKind::INT_LIT, TokenKind::EOF]);
}

#[test]
fn compound_assignment_operators() {
  let kinds = lex("+= -= *= /= %=");
  assert_eq!(
    kinds,
    vec![
      TokenKind::PLUS_EQ,
      TokenKind::DASH_EQ,
      TokenKind::STAR_EQ,
      TokenKind::SLASH_EQ,
      TokenKind::PERCENT_EQ,
      TokenKind::EOF,
    ]
  );
}

#[test]
fn an_unknown_character_is_an_error_token() {
  let kinds = lex("@");
  assert!(matches!(kinds[0], TokenKind::ERROR(ErrorTokenKind::InvalidChar)));
}

#[test]
fn tracks_line_numbers_across_newlines() {
  let chars: Vec<char> = "1\n2\n3".chars().collect();
  let tokens = Lexer::lex(&chars);
  let lines: Vec<usize> = tokens.iter().map(|t| t.line_num).collect();
  assert_eq!(lines, vec![1, 2, 3, 3]);
}
