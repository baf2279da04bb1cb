use std::rc::Rc;

use core::ast::{ASTNodeIdx, ASTNodeKind::*, MatchPattern};
use core::bytecode::OpCode;
use core::errors::ErrorKind;
use core::tokens::TokenIdx;
use objects::Value;

use crate::{Compiler, LoopCtx};

impl<'a> Compiler<'a> {
  pub(crate) fn compile_stmt(&mut self, node: ASTNodeIdx) {
    match self.ast.get(node) {
      ExprStmt(expr) => {
        let expr = *expr;
        let tok = self.approx_token(expr);
        self.compile_expr(expr);
        self.emit_op(OpCode::Pop, self.line(tok));
      }
      VarDecl(decl) => {
        let (is_const, name, value) = (decl.is_const, decl.name, decl.value);
        self.compile_var_decl(is_const, name, value);
      }
      FuncDecl(decl) => {
        if self.hoisted_decls.contains(&node.0) {
          // The top-level hoisting pre-pass already compiled and bound
          // this declaration ahead of the main pass.
          return;
        }
        // Hoisting already reserved this name's slot (or it is a
        // dynamically-resolved global); just fill it in.
        let (name, func) = (decl.name, &decl.func);
        let (params, body, tok) = (func.params.iter().map(|p| p.name).collect::<Vec<_>>(), func.body, func.token);
        self.compile_function(Some(name), params.len(), params, body, tok);
        self.bind_hoisted_or_global(name);
      }
      BlockStmt(stmts) => {
        let stmts = stmts.clone();
        let tok = stmts.first().copied().map(|s| self.approx_token(s)).unwrap_or(0);
        self.begin_scope();
        self.compile_body(&stmts);
        self.end_scope(tok);
      }
      IfStmt(if_node) => {
        let (cond, then_b, else_b, tok) = (if_node.cond, if_node.then_branch, if_node.else_branch, if_node.token);
        self.compile_expr(cond);
        let else_jump = self.emit_jump(OpCode::JumpIfFalse, tok);
        self.compile_stmt(then_b);
        match else_b {
          Some(else_b) => {
            let end_jump = self.emit_jump(OpCode::Jump, tok);
            self.patch_jump(else_jump, tok);
            self.compile_stmt(else_b);
            self.patch_jump(end_jump, tok);
          }
          None => self.patch_jump(else_jump, tok),
        }
      }
      WhileStmt(w) => {
        let (cond, body, tok) = (w.cond, w.body, w.token);
        self.compile_while(cond, body, tok);
      }
      ForStmt(f) => {
        let (init, cond, update, body, tok) = (f.init, f.cond, f.update, f.body, f.token);
        self.compile_for(init, cond, update, body, tok);
      }
      ForInStmt(f) => {
        let (name, collection, body, tok) = (f.name, f.collection, f.body, f.token);
        self.compile_for_in(name, collection, body, tok);
      }
      ReturnStmt(value) => {
        let value = *value;
        let tok = value.map(|v| self.approx_token(v)).unwrap_or(0);
        self.close_upvalues_for_return();
        match value {
          Some(v) => self.compile_expr(v),
          None => self.emit_op(OpCode::PushNil, self.line(tok)),
        }
        self.emit_op(OpCode::Return, self.line(tok));
      }
      BreakStmt => self.compile_break(),
      ContinueStmt => self.compile_continue(),
      ImportStmt(imp) => {
        let (path, alias, tok) = (imp.path, imp.alias, imp.token);
        self.compile_import(path, alias, tok);
      }
      TryStmt(t) => {
        let (body, catch_name, catch_body, finally_body, tok) = (t.body, t.catch_name, t.catch_body, t.finally_body, t.token);
        self.compile_try(body, catch_name, catch_body, finally_body, tok);
      }
      ThrowStmt(value) => {
        let value = *value;
        let tok = self.approx_token(value);
        self.compile_expr(value);
        self.emit_op(OpCode::Throw, self.line(tok));
      }
      MatchStmt(m) => {
        let (subject, tok) = (m.subject, m.token);
        self.compile_match(subject, node, tok);
      }
      LogStmt(value) => {
        let value = *value;
        let tok = self.approx_token(value);
        self.compile_expr(value);
        self.emit_op(OpCode::Log, self.line(tok));
      }
      ExportStmt(inner) => {
        let inner = *inner;
        self.compile_export(inner);
      }
      other => unreachable!("compile_stmt called on a non-statement node: {:?}", std::mem::discriminant(other)),
    }
  }

  /// Best-effort token for a node, used purely to attribute a source
  /// line to an instruction; nodes without their own token (literals'
  /// containers, etc.) fall back to whatever their first child has.
  fn approx_token(&self, node: ASTNodeIdx) -> TokenIdx {
    match self.ast.get(node) {
      NumLiteral(t) | StringLiteral(t) | TrueLiteral(t) | FalseLiteral(t) | NullLiteral(t) | Identifier(t) => *t,
      BinaryExpr(b) | LogicalExpr(b) => b.token,
      UnaryExpr(u) => u.token,
      CallExpr(c) => c.token,
      Indexing(i) => i.token,
      PropAccess(p) => self.approx_token(p.target),
      Assign(a) => a.name,
      IndexAssign(i) => i.token,
      PropAssign(p) => p.token,
      IfExpr(i) => i.token,
      FuncExpr(f) => f.token,
      ArrayLiteral(elems) => elems.first().map(|e| self.approx_token(*e)).unwrap_or(0),
      MapLiteral(pairs) => pairs.first().map(|(k, _)| self.approx_token(*k)).unwrap_or(0),
      _ => 0,
    }
  }

  // --- declarations ----------------------------------------------------

  fn compile_var_decl(&mut self, is_const: bool, name: TokenIdx, value: ASTNodeIdx) {
    self.declare_variable(name, is_const);
    self.compile_expr(value);
    self.define_variable(name, is_const);
  }

  /// Scans a block's immediate statements for function declarations
  /// and pre-reserves their local slots (pushing a placeholder `nil`
  /// for each) so that a function defined earlier in program order can
  /// still call one defined later in the same block. Top-level
  /// functions need no such pre-pass: globals resolve by name at call
  /// time, not by compile-time slot, so forward references just work.
  pub(crate) fn hoist_functions(&mut self, stmts: &[ASTNodeIdx]) {
    if self.scope_depth() == 0 {
      return;
    }

    for &s in stmts {
      if let FuncDecl(decl) = self.ast.get(s) {
        let name = decl.name;
        let line = self.line(name);
        self.declare_variable(name, false);
        self.mark_initialized();
        self.emit_op(OpCode::PushNil, line);
      }
    }
  }

  /// Walks the top-level statement list (recursing into the bodies of
  /// `if`/`while`/`for`/`try`, and into bare blocks) collecting every
  /// function declaration reachable in statement position, compiles
  /// each to a closure, and binds it as a global ahead of the main
  /// emission pass. `compile_stmt` later skips re-emitting any
  /// `FuncDecl` node this pass already handled, so mutually recursive
  /// and order-independent top-level scripts just work.
  pub(crate) fn hoist_top_level_functions(&mut self, stmts: &[ASTNodeIdx]) {
    let mut found = Vec::new();
    self.collect_hoistable(stmts, &mut found);

    for node in found {
      self.hoisted_decls.push(node.0);
      let (name, func) = match self.ast.get(node) {
        FuncDecl(decl) => (decl.name, &decl.func),
        _ => unreachable!("collect_hoistable only ever collects FuncDecl nodes"),
      };
      let (params, body, tok) = (func.params.iter().map(|p| p.name).collect::<Vec<_>>(), func.body, func.token);
      self.compile_function(Some(name), params.len(), params, body, tok);
      let lexeme = self.lexeme(name);
      let idx = self.string_constant(lexeme.clone(), name);
      self.current().proto.declared_globals.push(Rc::from(lexeme));
      self.emit_op_short(OpCode::DefineGlobal, idx, self.line(name));
    }
  }

  fn collect_hoistable(&self, stmts: &[ASTNodeIdx], out: &mut Vec<ASTNodeIdx>) {
    for &s in stmts {
      match self.ast.get(s) {
        FuncDecl(_) => out.push(s),
        ExportStmt(inner) => {
          if let FuncDecl(_) = self.ast.get(*inner) {
            out.push(*inner);
          }
        }
        BlockStmt(inner) => self.collect_hoistable(inner, out),
        IfStmt(if_node) => {
          self.collect_hoistable_branch(if_node.then_branch, out);
          if let Some(e) = if_node.else_branch {
            self.collect_hoistable_branch(e, out);
          }
        }
        WhileStmt(w) => self.collect_hoistable_branch(w.body, out),
        ForStmt(f) => self.collect_hoistable_branch(f.body, out),
        ForInStmt(f) => self.collect_hoistable_branch(f.body, out),
        TryStmt(t) => {
          self.collect_hoistable_branch(t.body, out);
          self.collect_hoistable_branch(t.catch_body, out);
          if let Some(fb) = t.finally_body {
            self.collect_hoistable_branch(fb, out);
          }
        }
        _ => {}
      }
    }
  }

  /// Recurses into a statement that may or may not be a `BlockStmt`
  /// (an `if`'s `else` arm can itself be a bare `IfStmt` for `else
  /// if`, which has no statement list of its own to walk).
  fn collect_hoistable_branch(&self, node: ASTNodeIdx, out: &mut Vec<ASTNodeIdx>) {
    match self.ast.get(node) {
      BlockStmt(inner) => self.collect_hoistable(inner, out),
      _ => self.collect_hoistable(std::slice::from_ref(&node), out),
    }
  }

  /// Finishes a `FuncDecl` whose slot `hoist_functions` may already
  /// have reserved: writes the freshly-built closure into that slot
  /// (or defines it as a global, same as any other declaration).
  fn bind_hoisted_or_global(&mut self, name: TokenIdx) {
    if self.scope_depth() == 0 {
      let lexeme = self.lexeme(name);
      let idx = self.string_constant(lexeme.clone(), name);
      self.current().proto.declared_globals.push(Rc::from(lexeme));
      self.emit_op_short(OpCode::DefineGlobal, idx, self.line(name));
    } else {
      self.emit_set_variable(name);
      self.emit_op(OpCode::Pop, self.line(name));
    }
  }

  fn compile_export(&mut self, inner: ASTNodeIdx) {
    if self.scope_depth() != 0 {
      let tok = self.approx_token(inner);
      self.error(tok, ErrorKind::Compile, "'export' is only allowed at the top level of a module.");
      return;
    }

    let name_tok = match self.ast.get(inner) {
      VarDecl(d) => d.name,
      FuncDecl(d) => d.name,
      _ => unreachable!("parser only ever wraps a VarDecl or FuncDecl in ExportStmt"),
    };

    self.compile_stmt(inner);
    let name: Rc<str> = Rc::from(self.lexeme(name_tok));
    self.current().proto.exported.push(name);
  }

  // --- loops -------------------------------------------------------------

  fn compile_while(&mut self, cond: ASTNodeIdx, body: ASTNodeIdx, tok: TokenIdx) {
    let loop_start = self.chunk_len();
    self.compile_expr(cond);
    let exit_jump = self.emit_jump(OpCode::JumpIfFalse, tok);

    self.loop_push(loop_start, false);
    self.compile_stmt(body);
    self.emit_loop_back(loop_start, tok);
    let ctx = self.loop_pop();

    self.patch_jump(exit_jump, tok);
    for b in ctx.break_jumps {
      self.patch_jump(b, tok);
    }
  }

  fn compile_for(&mut self, init: Option<ASTNodeIdx>, cond: Option<ASTNodeIdx>, update: Option<ASTNodeIdx>, body: ASTNodeIdx, tok: TokenIdx) {
    self.begin_scope();

    if let Some(init) = init {
      match self.ast.get(init) {
        VarDecl(_) => self.compile_stmt(init),
        _ => {
          self.compile_expr(init);
          self.emit_op(OpCode::Pop, self.line(tok));
        }
      }
    }

    let mut loop_start = self.chunk_len();
    let mut exit_jump = None;

    if let Some(cond) = cond {
      self.compile_expr(cond);
      exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse, tok));
    }

    let continue_target;

    if let Some(update) = update {
      let body_jump = self.emit_jump(OpCode::Jump, tok);
      let increment_start = self.chunk_len();
      self.compile_expr(update);
      self.emit_op(OpCode::Pop, self.line(tok));
      self.emit_loop_back(loop_start, tok);
      continue_target = increment_start;
      loop_start = increment_start;
      self.patch_jump(body_jump, tok);
    } else {
      continue_target = loop_start;
    }

    self.loop_push(continue_target, false);
    self.compile_stmt(body);
    self.emit_loop_back(loop_start, tok);
    let ctx = self.loop_pop();

    if let Some(exit_jump) = exit_jump {
      self.patch_jump(exit_jump, tok);
    }
    for b in ctx.break_jumps {
      self.patch_jump(b, tok);
    }

    self.end_scope(tok);
  }

  fn compile_for_in(&mut self, name: TokenIdx, collection: ASTNodeIdx, body: ASTNodeIdx, tok: TokenIdx) {
    self.begin_scope();
    self.compile_expr(collection);
    self.emit_op(OpCode::IterStart, self.line(tok));
    // The iterator handle `IterStart` just pushed has no source name but
    // still occupies a stack slot `IterNext` reads/writes below the
    // element it pushes, so it needs its own hidden local here — else the
    // loop variable declared below lands on the handle's slot instead of
    // the element's.
    self.reserve_hidden_local(tok);

    let loop_start = self.chunk_len();
    self.emit_op(OpCode::IterNext, self.line(tok));
    let exhausted_jump = self.emit_jump(OpCode::JumpIfFalse, tok);

    self.begin_scope();
    self.declare_variable(name, false);
    self.mark_initialized();

    self.loop_push(loop_start, true);
    self.compile_stmt(body);
    let ctx = self.loop_pop();

    self.end_scope(tok);
    self.emit_loop_back(loop_start, tok);

    // `break` already popped its own loop variable (see `compile_break`'s
    // `has_live_iterator` case) but not the iterator itself, so its jump
    // must land here too rather than skip past `IterEnd` — otherwise a
    // `break` inside a `for...in` would leak the iterator handle on the
    // stack forever.
    self.patch_jump(exhausted_jump, tok);
    for b in ctx.break_jumps {
      self.patch_jump(b, tok);
    }
    self.emit_op(OpCode::IterEnd, self.line(tok));
    // `IterEnd` already pops the handle off the runtime stack, so its
    // hidden local is dropped from the compiler's own bookkeeping here
    // without emitting a second, unbalanced `Pop`.
    self.current().locals.pop();

    self.end_scope(tok);
  }

  fn loop_push(&mut self, continue_target: usize, has_live_iterator: bool) {
    let locals_at_entry = self.current().locals.len();
    self.current().loops.push(LoopCtx { locals_at_entry, continue_target, break_jumps: Vec::new(), has_live_iterator });
  }

  fn loop_pop(&mut self) -> LoopCtx {
    self.current().loops.pop().expect("loop_pop called outside a loop")
  }

  /// Pops (or closes) locals declared since the loop was entered,
  /// without touching the compiler's own bookkeeping of which locals
  /// are in scope — used by `break`/`continue` to unwind the runtime
  /// stack to the loop's boundary while leaving the surrounding scope
  /// intact for the statements that still follow the loop.
  fn unwind_to_loop(&mut self, locals_at_entry: usize, tok: TokenIdx) {
    let line = self.line(tok);
    let depth = self.current().locals.len();
    for i in (locals_at_entry..depth).rev() {
      let op = if self.current().locals[i].captured { OpCode::CloseUpVal } else { OpCode::Pop };
      self.emit_op(op, line);
    }
  }

  fn compile_break(&mut self) {
    let tok = 0;
    let Some(ctx) = self.current().loops.last() else {
      self.error(tok, ErrorKind::Compile, "'break' used outside of a loop.");
      return;
    };
    let (locals_at_entry, has_live_iterator) = (ctx.locals_at_entry, ctx.has_live_iterator);

    self.unwind_to_loop(locals_at_entry, tok);
    if has_live_iterator {
      self.emit_op(OpCode::Pop, self.line(tok));
    }
    let jump = self.emit_jump(OpCode::Jump, tok);
    self.current().loops.last_mut().unwrap().break_jumps.push(jump);
  }

  fn compile_continue(&mut self) {
    let tok = 0;
    let Some(ctx) = self.current().loops.last() else {
      self.error(tok, ErrorKind::Compile, "'continue' used outside of a loop.");
      return;
    };
    let (locals_at_entry, continue_target) = (ctx.locals_at_entry, ctx.continue_target);

    self.unwind_to_loop(locals_at_entry, tok);
    self.emit_loop_back(continue_target, tok);
  }

  fn close_upvalues_for_return(&mut self) {
    // Locals captured by a closure still alive when this function
    // returns are closed by the VM's own call-return machinery (it
    // walks every open upvalue at or above the returning frame's
    // base), so no extra bytecode is needed here.
  }

  // --- import / try / match --------------------------------------------

  fn compile_import(&mut self, path: TokenIdx, alias: Option<TokenIdx>, tok: TokenIdx) {
    let is_string_path = matches!(self.tokens[path].kind, core::tokens::TokenKind::STR_LIT);
    let path_str = if is_string_path { self.unescape_string(path) } else { self.lexeme(path) };
    // A bare identifier path binds itself (e.g. `import math;`) unless
    // an explicit `as` alias overrides it.
    let binding_tok = alias.unwrap_or(path);

    self.declare_variable(binding_tok, false);
    let path_idx = self.add_constant(Value::Str(Rc::from(path_str)), path);
    self.emit_op_short(OpCode::PushConstant, path_idx, self.line(tok));
    self.emit_op(OpCode::Import, self.line(tok));
    self.define_variable(binding_tok, false);
  }

  /// Lowers `try { } catch e { } finally { }` onto `TryEnter`, which
  /// registers a handler address with the VM's per-frame protection
  /// stack; `PopTry` deregisters it on the fast, no-throw path.
  ///
  /// A `return`/`break`/`continue`/`throw` executed directly inside the
  /// `try` or `catch` body jumps (or unwinds) straight past this
  /// statement's own control-flow shape, so `finally` is only
  /// guaranteed to run on normal completion or a caught exception —
  /// not when the try/catch body itself exits early.
  fn compile_try(&mut self, body: ASTNodeIdx, catch_name: TokenIdx, catch_body: ASTNodeIdx, finally_body: Option<ASTNodeIdx>, tok: TokenIdx) {
    let handler_jump = self.emit_jump(OpCode::TryEnter, tok);

    self.compile_stmt(body);
    self.emit_op(OpCode::PopTry, self.line(tok));
    let skip_catch = self.emit_jump(OpCode::Jump, tok);

    self.patch_jump(handler_jump, tok);
    self.begin_scope();
    self.declare_variable(catch_name, false);
    self.mark_initialized();
    self.compile_stmt(catch_body);
    self.end_scope(tok);
    self.emit_op(OpCode::EndCatch, self.line(tok));

    self.patch_jump(skip_catch, tok);

    if let Some(finally_body) = finally_body {
      self.compile_stmt(finally_body);
    }
  }

  /// Lowers `match` by testing each literal arm with `Dup` +
  /// constant-push + `Equals`, falling through to the next arm on a
  /// mismatch and to the (optional) wildcard arm if none matched.
  fn compile_match(&mut self, subject: ASTNodeIdx, stmt_node: ASTNodeIdx, tok: TokenIdx) {
    let arms = match self.ast.get(stmt_node) {
      MatchStmt(m) => m
        .arms
        .iter()
        .map(|a| {
          let pattern = match a.pattern {
            MatchPattern::Literal(lit) => Some(lit),
            MatchPattern::Wildcard => None,
          };
          (pattern, a.body)
        })
        .collect::<Vec<_>>(),
      _ => unreachable!(),
    };

    self.compile_expr(subject);

    let mut end_jumps = Vec::new();
    let mut next_arm_jump: Option<usize> = None;
    let mut matched_wildcard = false;

    for (pattern, body) in arms {
      if let Some(j) = next_arm_jump.take() {
        self.patch_jump(j, tok);
      }

      match pattern {
        Some(lit) => {
          self.emit_op(OpCode::Dup, self.line(tok));
          self.compile_expr(lit);
          self.emit_op(OpCode::Equals, self.line(tok));
          next_arm_jump = Some(self.emit_jump(OpCode::JumpIfFalse, tok));
          self.emit_op(OpCode::Pop, self.line(tok));
          self.compile_stmt(body);
          end_jumps.push(self.emit_jump(OpCode::Jump, tok));
        }
        None => {
          self.emit_op(OpCode::Pop, self.line(tok));
          self.compile_stmt(body);
          matched_wildcard = true;
        }
      }
    }

    if let Some(j) = next_arm_jump {
      self.patch_jump(j, tok);
    }
    if !matched_wildcard {
      self.emit_op(OpCode::Pop, self.line(tok));
    }
    for j in end_jumps {
      self.patch_jump(j, tok);
    }
  }
}
