use core::ast::ASTNodeKind::*;
use core::ast::*;
use core::tokens::TokenKind::*;

use crate::{check_tok, match_tok, NodeResult, Parser};

impl<'a> Parser<'a> {
  /// Parses a general expression, by precedence climbing from the
  /// bottom of the ladder (logical-or) down to primaries.
  ///
  /// ```bnf
  /// expr := logicOr
  /// ```
  pub(crate) fn parse_expr(&mut self) -> NodeResult<ASTNodeIdx> {
    self.parse_logic_or()
  }

  fn parse_logic_or(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut left = self.parse_logic_and()?;

    while check_tok![self, DOUBLE_BAR] {
      let token = self.current_pos;
      self.advance();
      let right = self.parse_logic_and()?;
      left = self.ast.push(LogicalExpr(ASTBinaryExprNode {
        left,
        right,
        op: BinOrLogic::Logic(LogicalOpKind::Or),
        token,
      }));
    }

    Ok(left)
  }

  fn parse_logic_and(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut left = self.parse_equality()?;

    while check_tok![self, DOUBLE_AMP] {
      let token = self.current_pos;
      self.advance();
      let right = self.parse_equality()?;
      left = self.ast.push(LogicalExpr(ASTBinaryExprNode {
        left,
        right,
        op: BinOrLogic::Logic(LogicalOpKind::And),
        token,
      }));
    }

    Ok(left)
  }

  fn parse_equality(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut left = self.parse_relational()?;

    loop {
      let op = if check_tok![self, LOGIC_EQ] {
        BinaryOpKind::Equals
      } else if check_tok![self, LOGIC_NOT_EQ] {
        BinaryOpKind::NotEquals
      } else {
        break;
      };

      let token = self.current_pos;
      self.advance();
      let right = self.parse_relational()?;
      left = self.ast.push(BinaryExpr(ASTBinaryExprNode {
        left,
        right,
        op: BinOrLogic::Bin(op),
        token,
      }));
    }

    Ok(left)
  }

  fn parse_relational(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut left = self.parse_term()?;

    loop {
      let op = if check_tok![self, GREATER_THAN] {
        BinaryOpKind::GreaterThan
      } else if check_tok![self, GREATER_THAN_EQ] {
        BinaryOpKind::GreaterThanEq
      } else if check_tok![self, LESS_THAN] {
        BinaryOpKind::LessThan
      } else if check_tok![self, LESS_THAN_EQ] {
        BinaryOpKind::LessThanEq
      } else {
        break;
      };

      let token = self.current_pos;
      self.advance();
      let right = self.parse_term()?;
      left = self.ast.push(BinaryExpr(ASTBinaryExprNode {
        left,
        right,
        op: BinOrLogic::Bin(op),
        token,
      }));
    }

    Ok(left)
  }

  fn parse_term(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut left = self.parse_factor()?;

    loop {
      let op = if check_tok![self, PLUS] {
        BinaryOpKind::Add
      } else if check_tok![self, DASH] {
        BinaryOpKind::Subtract
      } else {
        break;
      };

      let token = self.current_pos;
      self.advance();
      let right = self.parse_factor()?;
      left = self.ast.push(BinaryExpr(ASTBinaryExprNode {
        left,
        right,
        op: BinOrLogic::Bin(op),
        token,
      }));
    }

    Ok(left)
  }

  fn parse_factor(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut left = self.parse_unary()?;

    loop {
      let op = if check_tok![self, STAR] {
        BinaryOpKind::Multiply
      } else if check_tok![self, SLASH] {
        BinaryOpKind::Divide
      } else if check_tok![self, PERCENT] {
        BinaryOpKind::Modulus
      } else {
        break;
      };

      let token = self.current_pos;
      self.advance();
      let right = self.parse_unary()?;
      left = self.ast.push(BinaryExpr(ASTBinaryExprNode {
        left,
        right,
        op: BinOrLogic::Bin(op),
        token,
      }));
    }

    Ok(left)
  }

  /// ```bnf
  /// unary := ('!' | '-') unary | call
  /// ```
  fn parse_unary(&mut self) -> NodeResult<ASTNodeIdx> {
    let op = if check_tok![self, BANG] {
      Some(UnaryOpKind::LogicNot)
    } else if check_tok![self, DASH] {
      Some(UnaryOpKind::Negate)
    } else {
      None
    };

    match op {
      Some(op) => {
        let token = self.current_pos;
        self.advance();
        let operand = self.parse_unary()?;
        Ok(self.ast.push(UnaryExpr(ASTUnaryExprNode { op, operand, token })))
      }
      None => self.parse_call_chain(),
    }
  }

  /// ```bnf
  /// call := primary (('(' args ')') | ('[' expr ']') | ('.' IDENT))*
  /// ```
  fn parse_call_chain(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut expr = self.parse_primary()?;

    loop {
      if match_tok![self, L_PAREN] {
        expr = self.parse_call_args(expr)?;
      } else if match_tok![self, L_BRACKET] {
        let token = self.current_pos - 1;
        let index = self.parse_expr()?;
        self.consume(&R_BRACKET, "Expected ']' after index expression.")?;
        expr = self.ast.push(Indexing(ASTIndexingNode { target: expr, index, token }));
      } else if match_tok![self, DOT] {
        let prop = self.consume(&IDENTIFIER, "Expected property name after '.'.")?;
        expr = self.ast.push(PropAccess(ASTPropAccessNode { target: expr, prop }));
      } else {
        break;
      }
    }

    Ok(expr)
  }

  fn parse_call_args(&mut self, callee: ASTNodeIdx) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;
    let mut args = vec![];

    if !check_tok![self, R_PAREN] {
      loop {
        args.push(self.parse_expr()?);
        if !match_tok![self, COMMA] {
          break;
        }
      }
    }

    self.consume(&R_PAREN, "Expected ')' after argument list.")?;
    Ok(self.ast.push(CallExpr(ASTCallExprNode { callee, args, token })))
  }

  /// ```bnf
  /// primary := NUM | STR | 'true' | 'false' | 'null' | IDENT
  ///          | '(' expr ')' | '[' (expr (',' expr)*)? ']'
  ///          | '{' (expr ':' expr (',' expr ':' expr)*)? '}'
  ///          | 'fn' '(' params? ')' (block | '=>' expr)
  ///          | 'if' expr block 'else' (ifExpr | block)
  /// ```
  fn parse_primary(&mut self) -> NodeResult<ASTNodeIdx> {
    if match_tok![self, INT_LIT | FLOAT_LIT] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(NumLiteral(tok)));
    }
    if match_tok![self, STR_LIT] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(StringLiteral(tok)));
    }
    if match_tok![self, TRUE_KW] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(TrueLiteral(tok)));
    }
    if match_tok![self, FALSE_KW] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(FalseLiteral(tok)));
    }
    if match_tok![self, NULL_KW] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(NullLiteral(tok)));
    }
    if match_tok![self, IDENTIFIER] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(Identifier(tok)));
    }
    if match_tok![self, L_PAREN] {
      let expr = self.parse_expr()?;
      self.consume(&R_PAREN, "Expected ')' to close grouped expression.")?;
      return Ok(expr);
    }
    if match_tok![self, L_BRACKET] {
      return self.parse_array_literal();
    }
    if match_tok![self, L_CURLY] {
      return self.parse_map_literal();
    }
    if match_tok![self, FN_KW] {
      let token = self.current_pos - 1;
      let func = self.parse_fn_tail(token)?;
      return Ok(self.ast.push(FuncExpr(func)));
    }
    if match_tok![self, IF_KW] {
      return self.parse_if_expr();
    }

    Err(self.error_at_current("Expected an expression."))
  }

  fn parse_array_literal(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut items = vec![];

    if !check_tok![self, R_BRACKET] {
      loop {
        items.push(self.parse_expr()?);
        if !match_tok![self, COMMA] {
          break;
        }
      }
    }

    self.consume(&R_BRACKET, "Expected ']' to close array literal.")?;
    Ok(self.ast.push(ArrayLiteral(items)))
  }

  fn parse_map_literal(&mut self) -> NodeResult<ASTNodeIdx> {
    let mut entries = vec![];

    if !check_tok![self, R_CURLY] {
      loop {
        let key = self.parse_expr()?;
        self.consume(&COLON, "Expected ':' after map key.")?;
        let value = self.parse_expr()?;
        entries.push((key, value));
        if !match_tok![self, COMMA] {
          break;
        }
      }
    }

    self.consume(&R_CURLY, "Expected '}' to close map literal.")?;
    Ok(self.ast.push(MapLiteral(entries)))
  }

  /// `if` used as an expression always requires an `else` branch, since
  /// both arms must produce a value.
  fn parse_if_expr(&mut self) -> NodeResult<ASTNodeIdx> {
    let token = self.current_pos - 1;
    let cond = self.parse_expr()?;
    self.consume(&L_CURLY, "Expected '{' to start 'if' expression body.")?;
    let then_branch = self.parse_block_stmt()?;

    self.consume(&ELSE_KW, "An 'if' used as an expression requires an 'else' branch.")?;
    let else_branch = if match_tok![self, IF_KW] {
      Some(self.parse_if_expr()?)
    } else {
      self.consume(&L_CURLY, "Expected '{' to start 'else' expression body.")?;
      Some(self.parse_block_stmt()?)
    };

    Ok(self.ast.push(IfExpr(ASTIfNode {
      cond,
      then_branch,
      else_branch,
      token,
    })))
  }

  /// Parses the literal pattern of a `match` arm: a bare literal, or a
  /// unary-minus-prefixed numeric literal for negative numbers.
  pub(crate) fn parse_match_literal(&mut self) -> NodeResult<ASTNodeIdx> {
    if check_tok![self, DASH] {
      let token = self.current_pos;
      self.advance();
      let operand = self.parse_match_literal()?;
      return Ok(self.ast.push(UnaryExpr(ASTUnaryExprNode {
        op: UnaryOpKind::Negate,
        operand,
        token,
      })));
    }

    if match_tok![self, INT_LIT | FLOAT_LIT] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(NumLiteral(tok)));
    }
    if match_tok![self, STR_LIT] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(StringLiteral(tok)));
    }
    if match_tok![self, TRUE_KW] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(TrueLiteral(tok)));
    }
    if match_tok![self, FALSE_KW] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(FalseLiteral(tok)));
    }
    if match_tok![self, NULL_KW] {
      let tok = self.current_pos - 1;
      return Ok(self.ast.push(NullLiteral(tok)));
    }

    Err(self.error_at_current("Expected a literal match pattern."))
  }
}
