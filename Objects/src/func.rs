use std::rc::Rc;

use crate::chunk::Chunk;

/// How a closure reaches a variable declared in an enclosing function.
/// Mirrors the classic "flat closures" descriptor: `is_local` says
/// whether `index` names a slot in the *immediately* enclosing frame or
/// one of that frame's own upvalues, letting each closure only ever
/// look one level up.
#[derive(Debug, Clone, Copy)]
pub struct UpvalDesc {
  pub is_local: bool,
  pub index: u16,
}

/// The static, compile-time blueprint of a function: its code, arity,
/// and the upvalue descriptors the compiler worked out by resolving
/// free variables against enclosing scopes. Shared (via `Rc`) between
/// every closure made from the same `fn` expression.
#[derive(Debug, Clone)]
pub struct FuncProto {
  pub name: Option<Rc<str>>,
  pub arity: usize,
  pub chunk: Chunk,
  pub upvalues: Vec<UpvalDesc>,
  /// Names declared with `export` at this function's top level. Only
  /// meaningful on the prototype compiled for a module's own body; the
  /// VM reads it once after running a freshly-loaded module to build
  /// that module's `exports` map.
  pub exported: Vec<Rc<str>>,
  /// Every name this top-level body bound into the globals table
  /// (`let`/`var`/`const`/`fn`, exported or not), in declaration order.
  /// When a module uses no `export` statement at all, the VM falls back
  /// to exposing this whole list instead of an empty exports map.
  pub declared_globals: Vec<Rc<str>>,
}

impl FuncProto {
  pub fn new(name: Option<Rc<str>>, arity: usize) -> Self {
    Self { name, arity, chunk: Chunk::new(), upvalues: Vec::new(), exported: Vec::new(), declared_globals: Vec::new() }
  }
}

/// A single captured variable. Starts `Open`, pointing at a live slot
/// on the VM's shared operand stack by absolute index; becomes `Closed`
/// once the frame that owns that slot returns, at which point the
/// value is copied out and the upvalue owns it independently.
#[derive(Debug, Clone)]
pub enum Upvalue {
  Open(usize),
  Closed(crate::Value),
}

/// A runtime closure: a function prototype paired with the concrete
/// upvalues it captured at the point it was created. Two closures made
/// from the same `fn` expression at different times share a `FuncProto`
/// but never share `Upvalue` cells unless they literally captured the
/// same enclosing variable.
#[derive(Debug, Clone)]
pub struct Closure {
  pub proto: Rc<FuncProto>,
  pub upvalues: Vec<Rc<std::cell::RefCell<Upvalue>>>,
}

impl Closure {
  pub fn new(proto: Rc<FuncProto>) -> Self {
    Self { proto, upvalues: Vec::new() }
  }
}
