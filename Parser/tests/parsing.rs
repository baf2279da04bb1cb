use std::path::PathBuf;

use core::ast::ASTNodeKind::*;
use core::ast::ASTArena;
use core::tokens::TokenList;
use lexer::Lexer;
use parser::Parser;

fn parse(src: &str) -> Result<ASTArena, Vec<core::errors::SourceError>> {
  let path = PathBuf::from("test");
  let chars: Vec<char> = src.chars().collect();
  let tokens = Lexer::lex(&chars);
  let list = TokenList::new(&path, &chars, &tokens);
  Parser::parse(&list)
}

#[test]
fn an_empty_program_parses_to_an_empty_module() {
  let ast = match parse("") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors on an empty program."),
  };
  assert!(ast.root_children().is_empty());
}

#[test]
fn a_let_declaration_parses_as_a_single_top_level_statement() {
  let ast = match parse("let x = 1;") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert_eq!(ast.root_children().len(), 1);
  assert!(matches!(ast.get(ast.root_children()[0]), VarDecl(_)));
}

#[test]
fn var_and_const_declarations_also_parse() {
  let ast = match parse("var x = 1; const y = 2;") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert_eq!(ast.root_children().len(), 2);
}

#[test]
fn function_declarations_parse() {
  let ast = match parse("fn add(a, b) { return a + b }") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert_eq!(ast.root_children().len(), 1);
  assert!(matches!(ast.get(ast.root_children()[0]), FuncDecl(_)));
}

#[test]
fn export_wraps_a_var_or_func_decl() {
  let ast = match parse("export let x = 1; export fn f() { return 1 }") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert_eq!(ast.root_children().len(), 2);
  for node in ast.root_children() {
    assert!(matches!(ast.get(*node), ExportStmt(_)));
  }
}

#[test]
fn if_as_a_statement_does_not_require_an_else_branch() {
  match parse("if true { log(1) }") {
    Ok(_) => {}
    Err(_) => panic!("Parser had errors on a bare if statement with no else."),
  }
}

#[test]
fn if_used_as_an_expression_requires_an_else_branch() {
  match parse("let x = if true { 1 };") {
    Ok(_) => panic!("Parser should have rejected an if-expression with no else branch."),
    Err(errs) => assert!(!errs.is_empty()),
  }
}

#[test]
fn c_style_for_and_for_in_both_parse() {
  let ast = match parse("for (let i = 0; i < 3; i = i + 1) { log(i) } for x in [1,2,3] { log(x) }") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert_eq!(ast.root_children().len(), 2);
  assert!(matches!(ast.get(ast.root_children()[0]), ForStmt(_)));
  assert!(matches!(ast.get(ast.root_children()[1]), ForInStmt(_)));
}

#[test]
fn try_catch_finally_parses() {
  let ast = match parse(r#"try { throw "x" } catch e { log(e) } finally { log("done") }"#) {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert!(matches!(ast.get(ast.root_children()[0]), TryStmt(_)));
}

#[test]
fn match_with_a_wildcard_arm_parses() {
  let ast = match parse(r#"match 2 { 1 => log("one"), 2 => log("two"), _ => log("other") }"#) {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert!(matches!(ast.get(ast.root_children()[0]), MatchStmt(_)));
}

#[test]
fn compound_assignment_desugars_into_an_assign_node() {
  let ast = match parse("let x = 1; x += 2;") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert!(matches!(ast.get(ast.root_children()[1]), ExprStmt(_)));
}

#[test]
fn index_assignment_parses() {
  let ast = match parse("let a = [1]; a[0] = 2;") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert_eq!(ast.root_children().len(), 2);
}

#[test]
fn import_with_an_alias_parses() {
  let ast = match parse(r#"import "mod" as m;"#) {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert!(matches!(ast.get(ast.root_children()[0]), ImportStmt(_)));
}

#[test]
fn bare_identifier_import_without_quotes_parses() {
  let ast = match parse("import mod;") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert!(matches!(ast.get(ast.root_children()[0]), ImportStmt(_)));
}

#[test]
fn function_expressions_parse_both_block_and_arrow_forms() {
  let ast = match parse("let f = fn(x) { return x }; let g = fn(x) => x + 1;") {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert_eq!(ast.root_children().len(), 2);
}

#[test]
fn map_and_array_literals_parse() {
  let ast = match parse(r#"let m = {"a": 1, "b": 2}; let a = [1, 2, 3];"#) {
    Ok(ast) => ast,
    Err(_) => panic!("Parser had errors."),
  };
  assert_eq!(ast.root_children().len(), 2);
}

#[test]
fn a_lone_unterminated_string_is_reported_as_a_syntax_error() {
  match parse("let x = \"unterminated;") {
    Ok(_) => panic!("Parser should have reported the unterminated string."),
    Err(errs) => assert!(errs.iter().any(|e| e.kind == core::errors::ErrorKind::Syntax)),
  }
}

#[test]
fn panic_mode_recovers_and_keeps_collecting_errors_after_a_bad_statement() {
  // The first `=` with no left-hand side is a parse error; a well-formed
  // statement follows it and should still be recovered and collected.
  match parse("= 1; let x = 2;") {
    Ok(_) => panic!("Parser should have reported the leading stray '='."),
    Err(errs) => assert!(!errs.is_empty()),
  }
}
