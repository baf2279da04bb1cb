use std::rc::Rc;

use crate::Value;

/// How many arguments a native function accepts. Mirrors the arity
/// checking the VM already does for closures, so native calls raise
/// the same `arity` error shape on mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeArity {
  Exact(usize),
  Range(usize, usize),
}

impl NativeArity {
  pub fn accepts(&self, argc: usize) -> bool {
    match self {
      NativeArity::Exact(n) => argc == *n,
      NativeArity::Range(lo, hi) => argc >= *lo && argc <= *hi,
    }
  }
}

/// A host-side failure raised from within a native function body, kept
/// distinct from `Value::Error` until the VM wraps it into one at the
/// call site (where it knows the current traceback).
#[derive(Debug, Clone)]
pub struct NativeError {
  pub message: String,
}

impl NativeError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into() }
  }
}

pub type NativeFn = fn(&[Value]) -> Result<Value, NativeError>;

/// A built-in function exposed to Sentra source as an ordinary global,
/// callable exactly like a user-defined closure.
pub struct NativeFuncObj {
  pub name: Rc<str>,
  pub arity: NativeArity,
  pub func: NativeFn,
}

impl std::fmt::Debug for NativeFuncObj {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NativeFuncObj").field("name", &self.name).finish()
  }
}

impl NativeFuncObj {
  pub fn new(name: impl Into<Rc<str>>, arity: NativeArity, func: NativeFn) -> Self {
    Self { name: name.into(), arity, func }
  }
}
