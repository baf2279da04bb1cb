use core::ast::ASTNodeKind::*;
use core::ast::*;
use core::tokens::{TokenIdx, TokenKind::*};

use crate::{check_tok, match_tok, NodeResult, Parser};

impl<'a> Parser<'a> {
  /// Parses a single statement.
  ///
  /// ```bnf
  /// statement := letDecl | assignStmt | ifStmt | whileStmt | forStmt |
  ///              forInStmt | returnStmt | breakStmt | continueStmt |
  ///              importStmt | tryStmt | throwStmt | matchStmt | fnDecl |
  ///              logStmt | exprStmt
  /// ```
  pub(crate) fn parse_statement(&mut self) -> NodeResult<ASTNodeIdx> {
    if match_tok![self, LET_KW] {
      self.parse_var_decl(false)
    } else if match_tok![self, VAR_KW] {
      self.parse_var_decl(false)
    } else if match_tok![self, CONST_KW] {
      self.parse_var_decl(true)
    } else if match_tok![self, FN_KW] {
      self.parse_fn_decl()
    } else if match_tok![self, EXPORT_KW] {
      self.parse_export_stmt()
    } else if match_tok![self, IF_KW] {
      self.parse_if_stmt()
    } else if match_tok![self, WHILE_KW] {
      self.parse_while_stmt()
    } else if match_tok![self, FOR_KW] {
      self.parse_for_stmt()
    } else if match_tok![self, RETURN_KW] {
      self.parse_return_stmt()
    } else if match_tok![self, BREAK_KW] {
      self.consume(&SEMICOLON, "Expected ';' after 'break'.")?;
      Ok(self.ast.push(BreakStmt))
    } else if match_tok![self, CONTINUE_KW] {
      self.consume(&SEMICOLON, "Expected ';' after 'continue'.")?;
      Ok(self.ast.push(ContinueStmt))
    } else if match_tok![self, IMPORT_KW] {
      self.parse_import_stmt()
    } else if match_tok![self, TRY_KW] {
      self.parse_try_stmt()
    } else if match_tok![self, THROW_KW] {
      self.parse_throw_stmt()
    } else if match_tok![self, MATCH_KW] {
      self.parse_match_stmt()
    } else if match_tok![self, LOG_KW] {
      self.parse_log_stmt()
    } else if check_tok![self, L_CURLY] {
      self.advance();
      self.parse_block_stmt()
    } else {
      self.parse_expr_or_assign_stmt()
    }
  }

  pub(crate) fn parse_block_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut stmts = vec![];

    while !check_tok![self, R_CURLY] && !self.is_at_end() {
      stmts.push(self.parse_statement()?);
    }

    self.consume(&R_CURLY, "Expected '}' to close block.")?;
    Ok(self.ast.push(BlockStmt(stmts)))
  }

  /// ```bnf
  /// letDecl := ('let'|'var'|'const') IDENT '=' expr ';'
  /// ```
  fn parse_var_decl(&mut self, is_const: bool) -> NodeResult<ASTNodeIdx> {
    let name = self.consume(&IDENTIFIER, "Expected identifier after declaration keyword.")?;
    self.consume(&EQUALS, "Expected '=' after variable name.")?;
    let value = self.parse_expr()?;
    self.consume(&SEMICOLON, "Expected ';' after variable declaration.")?;
    Ok(self.ast.push(VarDecl(ASTVarDeclNode { is_const, name, value })))
  }

  /// ```bnf
  /// fnDecl := 'fn' IDENT '(' params? ')' block
  /// ```
  fn parse_fn_decl(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;
    let name = self.consume(&IDENTIFIER, "Expected identifier for function name.")?;
    let func = self.parse_fn_tail(token)?;
    Ok(self.ast.push(FuncDecl(ASTFuncDeclNode { name, func })))
  }

  /// Parses the `(params) { body }` (or `(params) => expr`) tail shared
  /// by function declarations and function expressions.
  pub(crate) fn parse_fn_tail(&mut self, token: TokenIdx) -> NodeResult<ASTFuncNode> {
    self.consume(&L_PAREN, "Expected '(' after function name.")?;

    let mut params = vec![];
    if !check_tok![self, R_PAREN] {
      loop {
        let name = self.consume(&IDENTIFIER, "Expected parameter name.")?;
        params.push(SingleParam { name });
        if !match_tok![self, COMMA] {
          break;
        }
      }
    }
    self.consume(&R_PAREN, "Expected ')' after parameter list.")?;

    let body = if match_tok![self, THICK_ARROW] {
      let expr = self.parse_expr()?;
      let ret = self.ast.push(ReturnStmt(Some(expr)));
      self.ast.push(BlockStmt(vec![ret]))
    } else {
      self.consume(&L_CURLY, "Expected '{' to start function body.")?;
      self.parse_block_stmt()?
    };

    Ok(ASTFuncNode { params, body, token })
  }

  /// `export` may prefix a variable declaration or a function
  /// declaration at statement position.
  fn parse_export_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let inner = if match_tok![self, LET_KW] || match_tok![self, VAR_KW] {
      self.parse_var_decl(false)?
    } else if match_tok![self, CONST_KW] {
      self.parse_var_decl(true)?
    } else if match_tok![self, FN_KW] {
      self.parse_fn_decl()?
    } else {
      return Err(self.error_at_current("Expected a declaration after 'export'."));
    };

    Ok(self.ast.push(ExportStmt(inner)))
  }

  /// ```bnf
  /// ifStmt := 'if' expr block ('else' (ifStmt | block))?
  /// ```
  pub(crate) fn parse_if_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;
    let cond = self.parse_expr()?;
    self.consume(&L_CURLY, "Expected '{' to start 'if' body.")?;
    let then_branch = self.parse_block_stmt()?;

    let else_branch = if match_tok![self, ELSE_KW] {
      if match_tok![self, IF_KW] {
        Some(self.parse_if_stmt()?)
      } else {
        self.consume(&L_CURLY, "Expected '{' to start 'else' body.")?;
        Some(self.parse_block_stmt()?)
      }
    } else {
      None
    };

    Ok(self.ast.push(IfStmt(ASTIfNode {
      cond,
      then_branch,
      else_branch,
      token,
    })))
  }

  fn parse_while_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;
    let cond = self.parse_expr()?;
    self.consume(&L_CURLY, "Expected '{' to start 'while' body.")?;
    let body = self.parse_block_stmt()?;
    Ok(self.ast.push(WhileStmt(ASTWhileNode { cond, body, token })))
  }

  /// Distinguishes `for (init; cond; update) { body }` from
  /// `for NAME in COLLECTION { body }` by the token right after `for`.
  fn parse_for_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;

    if check_tok![self, IDENTIFIER] && matches!(&self.tokens[self.current_pos + 1].kind, IN_KW) {
      let name = self.consume(&IDENTIFIER, "Expected loop variable name.")?;
      self.consume(&IN_KW, "Expected 'in' after loop variable.")?;
      let collection = self.parse_expr()?;
      self.consume(&L_CURLY, "Expected '{' to start 'for' body.")?;
      let body = self.parse_block_stmt()?;
      return Ok(self.ast.push(ForInStmt(ASTForInNode {
        name,
        collection,
        body,
        token,
      })));
    }

    self.consume(&L_PAREN, "Expected '(' after 'for'.")?;

    let init = if match_tok![self, SEMICOLON] {
      None
    } else if match_tok![self, LET_KW] || match_tok![self, VAR_KW] {
      Some(self.parse_var_decl(false)?)
    } else {
      Some(self.parse_expr_or_assign_stmt()?)
    };

    let cond = if check_tok![self, SEMICOLON] {
      None
    } else {
      Some(self.parse_expr()?)
    };
    self.consume(&SEMICOLON, "Expected ';' after 'for' condition.")?;

    let update = if check_tok![self, R_PAREN] {
      None
    } else {
      Some(self.parse_bare_assign_or_expr()?)
    };
    self.consume(&R_PAREN, "Expected ')' after 'for' clauses.")?;

    self.consume(&L_CURLY, "Expected '{' to start 'for' body.")?;
    let body = self.parse_block_stmt()?;

    Ok(self.ast.push(ForStmt(ASTForNode {
      init,
      cond,
      update,
      body,
      token,
    })))
  }

  fn parse_return_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let value = if check_tok![self, SEMICOLON] {
      None
    } else {
      Some(self.parse_expr()?)
    };
    self.consume(&SEMICOLON, "Expected ';' after 'return' statement.")?;
    Ok(self.ast.push(ReturnStmt(value)))
  }

  /// ```bnf
  /// importStmt := 'import' (STRING | IDENT) ('as' IDENT)?
  /// ```
  fn parse_import_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;
    let path = if check_tok![self, STR_LIT] {
      self.consume(&STR_LIT, "Expected module path string.")?
    } else {
      self.consume(&IDENTIFIER, "Expected module path.")?
    };

    let alias = if match_tok![self, AS_KW] {
      Some(self.consume(&IDENTIFIER, "Expected identifier after 'as'.")?)
    } else {
      None
    };

    self.consume(&SEMICOLON, "Expected ';' after 'import' statement.")?;
    Ok(self.ast.push(ImportStmt(ASTImportNode { path, alias, token })))
  }

  /// ```bnf
  /// tryStmt := 'try' block 'catch' IDENT block ('finally' block)?
  /// ```
  fn parse_try_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;
    self.consume(&L_CURLY, "Expected '{' to start 'try' body.")?;
    let body = self.parse_block_stmt()?;

    self.consume(&CATCH_KW, "Expected 'catch' after 'try' body.")?;
    let catch_name = self.consume(&IDENTIFIER, "Expected identifier for caught error.")?;
    self.consume(&L_CURLY, "Expected '{' to start 'catch' body.")?;
    let catch_body = self.parse_block_stmt()?;

    let finally_body = if match_tok![self, FINALLY_KW] {
      self.consume(&L_CURLY, "Expected '{' to start 'finally' body.")?;
      Some(self.parse_block_stmt()?)
    } else {
      None
    };

    Ok(self.ast.push(TryStmt(ASTTryNode {
      body,
      catch_name,
      catch_body,
      finally_body,
      token,
    })))
  }

  fn parse_throw_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let value = self.parse_expr()?;
    self.consume(&SEMICOLON, "Expected ';' after 'throw' statement.")?;
    Ok(self.ast.push(ThrowStmt(value)))
  }

  /// ```bnf
  /// matchStmt := 'match' expr '{' arm (',' arm)* '}'
  /// arm       := (literal | '_') '=>' (stmt | block)
  /// ```
  fn parse_match_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;
    let subject = self.parse_expr()?;
    self.consume(&L_CURLY, "Expected '{' to start 'match' body.")?;

    let mut arms = vec![];
    loop {
      if check_tok![self, R_CURLY] {
        break;
      }

      let pattern = if match_tok![self, UNDERSCORE] {
        MatchPattern::Wildcard
      } else {
        MatchPattern::Literal(self.parse_match_literal()?)
      };

      self.consume(&THICK_ARROW, "Expected '=>' after match pattern.")?;

      let body = if check_tok![self, L_CURLY] {
        self.advance();
        self.parse_block_stmt()?
      } else {
        self.parse_statement()?
      };

      arms.push(MatchArm { pattern, body });

      if !match_tok![self, COMMA] {
        break;
      }
    }

    self.consume(&R_CURLY, "Expected '}' to close 'match' body.")?;
    Ok(self.ast.push(MatchStmt(ASTMatchNode { subject, arms, token })))
  }

  /// `log(EXPR)` — a reserved built-in print form.
  fn parse_log_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    self.consume(&L_PAREN, "Expected '(' after 'log'.")?;
    let value = self.parse_expr()?;
    self.consume(&R_PAREN, "Expected ')' after 'log' argument.")?;
    self.consume(&SEMICOLON, "Expected ';' after 'log' statement.")?;
    Ok(self.ast.push(LogStmt(value)))
  }

  /// Parses either a plain expression statement or an assignment,
  /// disambiguated after the fact by inspecting the token that follows
  /// the parsed expression.
  fn parse_expr_or_assign_stmt(&mut self) -> NodeResult<ASTNodeIdx> {
    let node = self.parse_bare_assign_or_expr()?;
    self.consume(&SEMICOLON, "Expected ';' after expression.")?;
    Ok(node)
  }

  /// Like `parse_expr_or_assign_stmt` but without consuming a trailing
  /// semicolon — used for the `init`/`update` clauses of a C-style
  /// `for` loop.
  fn parse_bare_assign_or_expr(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos;
    let target = self.parse_expr()?;

    let op = if match_tok![self, EQUALS] {
      Some(AssignOp::Assign)
    } else if match_tok![self, PLUS_EQ] {
      Some(AssignOp::Add)
    } else if match_tok![self, DASH_EQ] {
      Some(AssignOp::Subtract)
    } else if match_tok![self, STAR_EQ] {
      Some(AssignOp::Multiply)
    } else if match_tok![self, SLASH_EQ] {
      Some(AssignOp::Divide)
    } else if match_tok![self, PERCENT_EQ] {
      Some(AssignOp::Modulus)
    } else {
      None
    };

    let op = match op {
      Some(op) => op,
      None => return Ok(target),
    };

    let value = self.parse_expr()?;

    match self.ast.get(target) {
      ASTNodeKind::Identifier(name) => {
        let name = *name;
        Ok(self.ast.push(Assign(ASTAssignNode { name, op, value })))
      }
      ASTNodeKind::Indexing(node) => {
        let (target, index) = (node.target, node.index);
        Ok(self.ast.push(IndexAssign(ASTIndexAssignNode {
          target,
          index,
          op,
          value,
          token,
        })))
      }
      ASTNodeKind::PropAccess(node) => {
        let (target, prop) = (node.target, node.prop);
        Ok(self.ast.push(PropAssign(ASTPropAssignNode {
          target,
          prop,
          op,
          value,
          token,
        })))
      }
      _ => Err(self.error_at_tok(token, "Invalid assignment target.")),
    }
  }
}
