use std::rc::Rc;

use core::errors::ErrorKind;

use crate::Value;

/// One entry of a captured call stack, attached to an error at the
/// moment it was thrown or raised by the VM.
#[derive(Debug, Clone)]
pub struct TraceFrame {
  pub func_name: Rc<str>,
  pub line: usize,
}

/// A runtime error value: the kind of failure, its message, the call
/// stack at the throw site, and an optional `cause` for chained errors.
///
/// Chaining happens when a `catch` block itself throws (or a `finally`
/// block throws while unwinding past a pending error): the newer error
/// becomes the one that keeps propagating, and the error it displaced
/// is attached as `cause` rather than silently discarded, so a
/// top-level traceback can show both.
#[derive(Debug, Clone)]
pub struct ErrorObj {
  pub kind: ErrorKind,
  pub message: Rc<str>,
  pub trace: Vec<TraceFrame>,
  pub cause: Option<Rc<ErrorObj>>,
  /// What a `catch` block binds its variable to. `None` for every
  /// VM-raised runtime error (arity/type/index/...), meaning the catch
  /// variable is this `ErrorObj` itself (wrapped as `Value::Error`).
  /// `Some(v)` only for a `throw EXPR` where `EXPR` evaluated to
  /// something other than an `Error` value already: the catch variable
  /// then binds exactly `v`, not a promoted Error wrapper, so `throw
  /// "x"` followed by `catch e { "caught " + e }` yields `"caught x"`
  /// rather than `"caught UserError: x"`.
  pub payload: Option<Value>,
}

impl ErrorObj {
  pub fn new(kind: ErrorKind, message: impl Into<Rc<str>>) -> Self {
    Self { kind, message: message.into(), trace: Vec::new(), cause: None, payload: None }
  }

  pub fn with_cause(mut self, cause: Rc<ErrorObj>) -> Self {
    self.cause = Some(cause);
    self
  }

  pub fn with_payload(mut self, payload: Value) -> Self {
    self.payload = Some(payload);
    self
  }
}
