use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use compiler::Compiler;
use core::errors::report_source_errors;
use core::tokens::TokenList;
use core::{FRAMES_MAX, STACK_MAX};
use hashbrown::HashMap;
use lexer::Lexer;
use objects::error_obj::ErrorObj;
use objects::func::{Closure, FuncProto, Upvalue};
use objects::Value;

mod errors;
mod module;
mod natives;
mod run;

pub mod debug;

pub use errors::report_runtime_error;
pub use module::{FsModuleProvider, ModuleProvider, ModuleResolution};

/// A per-frame entry created by `TryEnter`, telling the VM where to land
/// on a `Throw` and how much of the operand stack to discard getting
/// there.
struct ProtectionRecord {
  handler_ip: usize,
  stack_depth: usize,
}

/// A single active call's bookkeeping: the closure being executed, where
/// in its chunk we are, where its local slots start on the shared
/// operand stack, and the `try` blocks currently protecting it.
struct CallFrame {
  closure: Rc<Closure>,
  ip: usize,
  base_pointer: usize,
  protections: Vec<ProtectionRecord>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum InterpretResult {
  Ok,
  CompileError,
  RuntimeError,
}

/// The stack-based executor: operand stack, call-frame stack, the
/// global table, the list of currently-open upvalues, the module cache,
/// and (folded into `globals`, since Sentra has no separate namespace
/// for them) the native-function registry.
pub struct VM {
  stack: Vec<Value>,
  frames: Vec<CallFrame>,
  globals: HashMap<Rc<str>, Value>,
  open_upvalues: Vec<Rc<RefCell<Upvalue>>>,
  modules: HashMap<Rc<str>, Value>,
  provider: Box<dyn ModuleProvider>,
  /// Errors currently being handled by a `catch` block whose `EndCatch`
  /// hasn't run yet, innermost last. A fresh `Throw` (or any internally
  /// raised error) while this is non-empty attaches the top entry as
  /// its `cause`, so a catch-block rethrow — or a finally that throws
  /// while a caught error is still in flight — keeps both errors
  /// visible in the traceback instead of silently dropping one.
  pending_errors: Vec<Rc<ErrorObj>>,
}

impl VM {
  pub fn new(provider: Box<dyn ModuleProvider>) -> Self {
    let mut vm = Self {
      stack: Vec::new(),
      frames: Vec::new(),
      globals: HashMap::new(),
      open_upvalues: Vec::new(),
      modules: HashMap::new(),
      provider,
      pending_errors: Vec::new(),
    };
    natives::install(&mut vm);
    vm
  }

  /// Resolves imports relative to `base_dir` (the importing script's own
  /// directory), using plain file-system lookup under a `.sn` extension.
  pub fn with_filesystem_provider(base_dir: PathBuf) -> Self {
    Self::new(Box::new(FsModuleProvider::new(base_dir)))
  }

  /// Lexes, parses, compiles, and executes `source`, reporting
  /// compile-time diagnostics or a runtime traceback to stderr as
  /// appropriate.
  pub fn interpret(&mut self, filepath: PathBuf, source: Vec<char>) -> InterpretResult {
    let tokens = Lexer::lex(&source);
    let token_list = TokenList::new(&filepath, &source, &tokens);

    let proto = match Compiler::compile(&token_list) {
      Ok(proto) => proto,
      Err(errs) => {
        let src_str: String = source.iter().collect();
        report_source_errors(&filepath.display().to_string(), &errs, &src_str);
        return InterpretResult::CompileError;
      }
    };

    match self.run_proto(proto) {
      Ok(_) => InterpretResult::Ok,
      Err(err) => {
        // An error that unwinds past the outermost `try` is reported
        // under its own "uncaught" kind rather than whatever kind it
        // originally carried.
        let uncaught = Rc::new(ErrorObj { kind: core::errors::ErrorKind::Uncaught, ..(*err).clone() });
        report_runtime_error(&uncaught);
        InterpretResult::RuntimeError
      }
    }
  }

  /// Compiles and runs a module source (used by the `import` opcode) in
  /// a fresh frame, returning the names it exported.
  pub(crate) fn run_module(&mut self, filepath: &PathBuf, source: &[char]) -> Result<Vec<(Rc<str>, Value)>, Rc<ErrorObj>> {
    let tokens = Lexer::lex(source);
    let token_list = TokenList::new(filepath, source, &tokens);

    let proto = Compiler::compile(&token_list).map_err(|errs| {
      let msg = errs.first().map(|e| e.message.clone()).unwrap_or_else(|| "module failed to compile".to_string());
      Rc::new(ErrorObj::new(core::errors::ErrorKind::Import, msg))
    })?;

    // A module that never used `export` exposes every top-level binding
    // it declared, matching the non-`export`-using scripts this language
    // already had before modules existed.
    let exported = if proto.exported.is_empty() { proto.declared_globals.clone() } else { proto.exported.clone() };
    self.run_proto(proto)?;

    let globals = &self.globals;
    Ok(exported.into_iter().map(|name| (name.clone(), globals.get(&name).cloned().unwrap_or(Value::Nil))).collect())
  }

  fn run_proto(&mut self, proto: FuncProto) -> Result<Value, Rc<ErrorObj>> {
    let closure = Rc::new(Closure::new(Rc::new(proto)));
    let base_pointer = self.stack.len();
    self.frames.push(CallFrame { closure, ip: 0, base_pointer, protections: Vec::new() });
    let frame_floor = self.frames.len() - 1;
    self.run(frame_floor)
  }

  /// Pushes a value, failing with a `StackOverflow` error value rather
  /// than growing `stack` without bound.
  fn push(&mut self, value: Value) -> Result<(), Value> {
    if self.stack.len() >= STACK_MAX {
      return Err(self.error_value(core::errors::ErrorKind::StackOverflow, "Stack overflow."));
    }
    self.stack.push(value);
    Ok(())
  }

  fn pop(&mut self) -> Value {
    self.stack.pop().expect("operand stack underflow: a defective chunk popped more than it pushed")
  }

  fn peek(&self, distance: usize) -> &Value {
    let len = self.stack.len();
    &self.stack[len - 1 - distance]
  }

  fn error_value(&self, kind: core::errors::ErrorKind, msg: impl Into<String>) -> Value {
    Value::Error(Rc::new(ErrorObj::new(kind, msg.into())))
  }

  fn check_frames_capacity(&self) -> Result<(), Value> {
    if self.frames.len() >= FRAMES_MAX {
      return Err(self.error_value(core::errors::ErrorKind::StackOverflow, "Stack overflow."));
    }
    Ok(())
  }
}
