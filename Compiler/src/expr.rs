use std::rc::Rc;

use core::ast::{ASTNodeIdx, ASTNodeKind::*, AssignOp, BinOrLogic, BinaryOpKind, LogicalOpKind, UnaryOpKind};
use core::bytecode::OpCode;
use core::tokens::TokenIdx;
use objects::Value;

use crate::{Compiler, FnScope};

impl<'a> Compiler<'a> {
  pub(crate) fn compile_expr(&mut self, node: ASTNodeIdx) {
    match self.ast.get(node) {
      NumLiteral(tok) => {
        let tok = *tok;
        let n = self.parse_number(tok);
        self.emit_constant(Value::Number(n), tok);
      }
      StringLiteral(tok) => {
        let tok = *tok;
        let s = self.unescape_string(tok);
        self.emit_constant(Value::Str(Rc::from(s)), tok);
      }
      TrueLiteral(tok) => self.emit_op(OpCode::PushTrue, self.line(*tok)),
      FalseLiteral(tok) => self.emit_op(OpCode::PushFalse, self.line(*tok)),
      NullLiteral(tok) => self.emit_op(OpCode::PushNil, self.line(*tok)),
      Identifier(tok) => self.emit_get_variable(*tok),
      ArrayLiteral(elems) => {
        let elems = elems.clone();
        let len = elems.len();
        for e in elems {
          self.compile_expr(e);
        }
        let tok = self.first_tok_or(node, 0);
        self.emit_op_short(OpCode::BuildArray, len as u16, self.line(tok));
      }
      MapLiteral(pairs) => {
        let pairs = pairs.clone();
        let len = pairs.len();
        for (k, v) in pairs {
          self.compile_expr(k);
          self.compile_expr(v);
        }
        let tok = self.first_tok_or(node, 0);
        self.emit_op_short(OpCode::BuildMap, len as u16, self.line(tok));
      }
      FuncExpr(func) => {
        let func_tok = func.token;
        self.compile_function(None, func.params.len(), func.params.iter().map(|p| p.name).collect(), func.body, func_tok);
      }
      IfExpr(if_node) => {
        let (cond, then_b, else_b, tok) = (if_node.cond, if_node.then_branch, if_node.else_branch.unwrap(), if_node.token);
        self.compile_expr(cond);
        let else_jump = self.emit_jump(OpCode::JumpIfFalse, tok);
        self.compile_expr_block(then_b, tok);
        let end_jump = self.emit_jump(OpCode::Jump, tok);
        self.patch_jump(else_jump, tok);
        // An `else if` chain re-enters this same arm directly; a plain
        // `else` carries its own `BlockStmt` body like `then_b`.
        match self.ast.get(else_b) {
          IfExpr(_) => self.compile_expr(else_b),
          _ => self.compile_expr_block(else_b, tok),
        }
        self.patch_jump(end_jump, tok);
      }
      BinaryExpr(bin) => {
        let (left, right, op, tok) = (bin.left, bin.right, bin.op, bin.token);
        self.compile_expr(left);
        self.compile_expr(right);
        let kind = match op {
          BinOrLogic::Bin(k) => k,
          BinOrLogic::Logic(_) => unreachable!("a LogicalExpr carries BinOrLogic::Logic, not BinaryExpr"),
        };
        self.emit_op(Self::binop_opcode(kind), self.line(tok));
      }
      LogicalExpr(bin) => {
        let (left, right, op, tok) = (bin.left, bin.right, bin.op, bin.token);
        let kind = match op {
          BinOrLogic::Logic(k) => k,
          BinOrLogic::Bin(_) => unreachable!("a BinaryExpr carries BinOrLogic::Bin, not LogicalExpr"),
        };
        self.compile_logical(kind, left, right, tok);
      }
      UnaryExpr(un) => {
        let (operand, op, tok) = (un.operand, un.op, un.token);
        self.compile_expr(operand);
        let opcode = match op {
          UnaryOpKind::Negate => OpCode::Negate,
          UnaryOpKind::LogicNot => OpCode::LogicNot,
        };
        self.emit_op(opcode, self.line(tok));
      }
      CallExpr(call) => {
        let (callee, args, tok) = (call.callee, call.args.clone(), call.token);
        self.compile_expr(callee);
        for a in &args {
          self.compile_expr(*a);
        }
        self.emit_op_short(OpCode::Call, args.len() as u16, self.line(tok));
      }
      Indexing(idx) => {
        let (target, index, tok) = (idx.target, idx.index, idx.token);
        self.compile_expr(target);
        self.compile_expr(index);
        self.emit_op(OpCode::IndexGet, self.line(tok));
      }
      PropAccess(prop) => {
        let (target, prop_tok) = (prop.target, prop.prop);
        self.compile_expr(target);
        let name = self.lexeme(prop_tok);
        self.emit_constant(Value::Str(Rc::from(name)), prop_tok);
        self.emit_op(OpCode::IndexGet, self.line(prop_tok));
      }
      Assign(assign) => {
        let (name, op, value) = (assign.name, assign.op, assign.value);
        self.compile_assign_value(name, op, value);
        self.emit_set_variable(name);
      }
      IndexAssign(idx) => {
        let (target, index, op, value, tok) = (idx.target, idx.index, idx.op, idx.value, idx.token);
        self.compile_index_assign(target, index, op, value, tok);
      }
      PropAssign(prop) => {
        let (target, prop_tok, op, value, tok) = (prop.target, prop.prop, prop.op, prop.value, prop.token);
        self.compile_prop_assign(target, prop_tok, op, value, tok);
      }
      other => unreachable!("compile_expr called on a non-expression node: {:?}", std::mem::discriminant(other)),
    }
  }

  fn first_tok_or(&self, _node: ASTNodeIdx, fallback: TokenIdx) -> TokenIdx {
    fallback
  }

  /// Compiles a `BlockStmt` used as an `if`-expression branch: every
  /// statement but the last runs for its side effects as usual, and
  /// the last one contributes the block's value — its inner
  /// expression directly if it is an `ExprStmt`, or an implicit `nil`
  /// otherwise.
  ///
  /// The block's own locals sit below that value on the stack once the
  /// body is done, so ending the scope can't just `Pop` them the way
  /// `end_scope` does for a statement block: that would discard the
  /// result along with them. Instead the result is copied down into
  /// the first local's slot with `SetLocal`, the original top (now a
  /// duplicate) and every local above the first are popped off, and
  /// the first slot — now holding the result — becomes the new top.
  fn compile_expr_block(&mut self, node: ASTNodeIdx, tok: TokenIdx) {
    let stmts = match self.ast.get(node) {
      BlockStmt(stmts) => stmts.clone(),
      _ => unreachable!("an if-expression branch is always a BlockStmt"),
    };
    let line = self.line(tok);

    self.begin_scope();
    let base = self.current().locals.len();
    self.hoist_functions(&stmts);

    match stmts.split_last() {
      None => self.emit_op(OpCode::PushNil, line),
      Some((&last, rest)) => {
        for &s in rest {
          self.compile_stmt(s);
        }
        match self.ast.get(last) {
          ExprStmt(inner) => {
            let inner = *inner;
            self.compile_expr(inner);
          }
          _ => {
            self.compile_stmt(last);
            self.emit_op(OpCode::PushNil, line);
          }
        }
      }
    };

    let top = self.current().locals.len();
    if top > base {
      self.emit_op_short(OpCode::SetLocal, base as u16, line);
      self.emit_op(OpCode::Pop, line);
      for i in (base + 1..top).rev() {
        let op = if self.current().locals[i].captured { OpCode::CloseUpVal } else { OpCode::Pop };
        self.emit_op(op, line);
      }
    }

    self.current().locals.truncate(base);
    self.current().scope_depth -= 1;
  }

  fn binop_opcode(kind: BinaryOpKind) -> OpCode {
    match kind {
      BinaryOpKind::Add => OpCode::Add,
      BinaryOpKind::Subtract => OpCode::Subtract,
      BinaryOpKind::Multiply => OpCode::Multiply,
      BinaryOpKind::Divide => OpCode::Divide,
      BinaryOpKind::Modulus => OpCode::Modulus,
      BinaryOpKind::Equals => OpCode::Equals,
      BinaryOpKind::NotEquals => OpCode::NotEquals,
      BinaryOpKind::GreaterThan => OpCode::GreaterThan,
      BinaryOpKind::GreaterThanEq => OpCode::GreaterThanEq,
      BinaryOpKind::LessThan => OpCode::LessThan,
      BinaryOpKind::LessThanEq => OpCode::LessThanEq,
    }
  }

  /// Short-circuiting `&&`/`||`, implemented with `Dup` so the
  /// discarded side of the expression never needs to be recomputed.
  fn compile_logical(&mut self, kind: LogicalOpKind, left: ASTNodeIdx, right: ASTNodeIdx, tok: TokenIdx) {
    self.compile_expr(left);
    match kind {
      LogicalOpKind::And => {
        self.emit_op(OpCode::Dup, self.line(tok));
        let end_jump = self.emit_jump(OpCode::JumpIfFalse, tok);
        self.emit_op(OpCode::Pop, self.line(tok));
        self.compile_expr(right);
        self.patch_jump(end_jump, tok);
      }
      LogicalOpKind::Or => {
        self.emit_op(OpCode::Dup, self.line(tok));
        let else_jump = self.emit_jump(OpCode::JumpIfFalse, tok);
        let end_jump = self.emit_jump(OpCode::Jump, tok);
        self.patch_jump(else_jump, tok);
        self.emit_op(OpCode::Pop, self.line(tok));
        self.compile_expr(right);
        self.patch_jump(end_jump, tok);
      }
    }
  }

  /// Compiles the right-hand side of `name op= value` (or just `value`
  /// for plain `=`), leaving the value to store on top of the stack.
  fn compile_assign_value(&mut self, name: TokenIdx, op: AssignOp, value: ASTNodeIdx) {
    match op.as_binary() {
      None => self.compile_expr(value),
      Some(bin_kind) => {
        self.emit_get_variable(name);
        self.compile_expr(value);
        self.emit_op(Self::binop_opcode(bin_kind), self.line(name));
      }
    }
  }

  /// `target[index] (op=) value`. `IndexSet` expects the stack, from
  /// bottom to top, as `[value, target, index]` and leaves `value` on
  /// top as the assignment expression's result. Compound operators
  /// re-evaluate `target` and `index` a second time to read the prior
  /// value before writing the combined result back — a known
  /// side-effect caveat for non-pure target/index expressions, noted
  /// in the project's design notes.
  fn compile_index_assign(&mut self, target: ASTNodeIdx, index: ASTNodeIdx, op: AssignOp, value: ASTNodeIdx, tok: TokenIdx) {
    match op.as_binary() {
      None => {
        self.compile_expr(value);
        self.compile_expr(target);
        self.compile_expr(index);
      }
      Some(bin_kind) => {
        self.compile_expr(target);
        self.compile_expr(index);
        self.emit_op(OpCode::IndexGet, self.line(tok));
        self.compile_expr(value);
        self.emit_op(Self::binop_opcode(bin_kind), self.line(tok));
        self.compile_expr(target);
        self.compile_expr(index);
      }
    }
    self.emit_op(OpCode::IndexSet, self.line(tok));
  }

  fn compile_prop_assign(&mut self, target: ASTNodeIdx, prop_tok: TokenIdx, op: AssignOp, value: ASTNodeIdx, tok: TokenIdx) {
    let name = self.lexeme(prop_tok);

    match op.as_binary() {
      None => {
        self.compile_expr(value);
        self.compile_expr(target);
        self.emit_constant(Value::Str(Rc::from(name)), prop_tok);
      }
      Some(bin_kind) => {
        self.compile_expr(target);
        self.emit_constant(Value::Str(Rc::from(name.clone())), prop_tok);
        self.emit_op(OpCode::IndexGet, self.line(tok));
        self.compile_expr(value);
        self.emit_op(Self::binop_opcode(bin_kind), self.line(tok));
        self.compile_expr(target);
        self.emit_constant(Value::Str(Rc::from(name)), prop_tok);
      }
    }
    self.emit_op(OpCode::IndexSet, self.line(tok));
  }

  /// Compiles a `fn` body into its own prototype and emits the
  /// `MakeClosure` instruction that turns it into a runtime closure,
  /// following it with the resolved upvalue descriptor bytes.
  pub(crate) fn compile_function(
    &mut self,
    name: Option<TokenIdx>,
    arity: usize,
    params: Vec<TokenIdx>,
    body: ASTNodeIdx,
    tok: TokenIdx,
  ) {
    let proto_name = name.map(|t| Rc::from(self.lexeme(t)));
    self.scopes.push(FnScope::new(proto_name, arity));
    self.begin_scope();

    for p in &params {
      self.declare_variable(*p, false);
      self.mark_initialized();
    }

    match self.ast.get(body) {
      core::ast::ASTNodeKind::BlockStmt(stmts) => {
        let stmts = stmts.clone();
        self.compile_body(&stmts);
      }
      _ => unreachable!("a function body is always a BlockStmt"),
    }

    self.emit_op(OpCode::PushNil, self.line(tok));
    self.emit_op(OpCode::Return, self.line(tok));

    let finished = self.scopes.pop().unwrap();
    let upvalue_count = finished.proto.upvalues.len();
    let upvalues = finished.proto.upvalues.clone();
    let proto = Rc::new(finished.proto);

    let template = Value::Function(Rc::new(objects::func::Closure::new(proto)));
    let const_idx = self.add_constant(template, tok);

    self.emit_op(OpCode::MakeClosure, self.line(tok));
    self.emit_short(const_idx, self.line(tok));
    self.emit_byte(upvalue_count as u8, self.line(tok));
    for up in upvalues {
      self.emit_byte(up.is_local as u8, self.line(tok));
      self.emit_byte(up.index as u8, self.line(tok));
    }
    self.check_upvalue_capacity(tok);
  }

  fn parse_number(&self, tok: TokenIdx) -> f64 {
    self.lexeme(tok).parse::<f64>().unwrap_or(0.0)
  }

  /// Strips the surrounding quotes from a string literal's lexeme and
  /// resolves its escape sequences.
  pub(crate) fn unescape_string(&self, tok: TokenIdx) -> String {
    let raw = self.lexeme(tok);
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
      if c != '\\' {
        out.push(c);
        continue;
      }
      match chars.next() {
        Some('n') => out.push('\n'),
        Some('t') => out.push('\t'),
        Some('r') => out.push('\r'),
        Some('\\') => out.push('\\'),
        Some('"') => out.push('"'),
        Some('0') => out.push('\0'),
        Some(other) => out.push(other),
        None => {}
      }
    }

    out
  }
}
