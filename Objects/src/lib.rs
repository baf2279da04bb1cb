use std::cell::RefCell;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

pub mod chunk;
pub mod error_obj;
pub mod func;
pub mod iter;
pub mod map;
pub mod module;
pub mod native;

use error_obj::ErrorObj;
use func::Closure;
use iter::IterState;
use map::ValueMap;
use module::ModuleObj;
use native::NativeFuncObj;

/// Produces a uniform "cannot OP 'a' and 'b'" message for a failed
/// binary arithmetic or comparison operation, naming both operand
/// kinds the way the rest of the runtime's diagnostics do.
macro_rules! binary_opr_error_msg {
  ($opr:expr, $lhs:expr, $rhs:expr) => {
    format!("Cannot {} '{}' and '{}'.", $opr, $lhs.type_name(), $rhs.type_name())
  };
}

/// The single tagged-union value type every Sentra expression
/// evaluates to. Reference-counted handles (`Rc`) back the kinds with
/// unbounded size or shared-mutation semantics; everything else is
/// copied by value, matching the spec's treatment of numbers,
/// booleans, and strings as immutable.
///
/// `Iterator` is not a literal kind source code can construct: it only
/// ever appears on the operand stack as the implicit handle behind a
/// `for...in` loop's `IterStart`/`IterNext`/`IterEnd` triad.
#[derive(Debug, Clone)]
pub enum Value {
  Nil,
  Bool(bool),
  Number(f64),
  Str(Rc<str>),
  Array(Rc<RefCell<Vec<Value>>>),
  Map(Rc<RefCell<ValueMap>>),
  Function(Rc<Closure>),
  NativeFunction(Rc<NativeFuncObj>),
  Module(Rc<RefCell<ModuleObj>>),
  Error(Rc<ErrorObj>),
  Iterator(Rc<RefCell<IterState>>),
}

impl Value {
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Nil => "null",
      Value::Bool(_) => "bool",
      Value::Number(_) => "number",
      Value::Str(_) => "string",
      Value::Array(_) => "array",
      Value::Map(_) => "map",
      Value::Function(_) | Value::NativeFunction(_) => "function",
      Value::Module(_) => "module",
      Value::Error(_) => "error",
      Value::Iterator(_) => "iterator",
    }
  }

  /// Everything is truthy except `null` and `false`, matching the
  /// spec's truthiness rule used by `if`, `while`, logical operators,
  /// and the implicit boolean context of match-arm guards.
  pub fn is_truthy(&self) -> bool {
    !matches!(self, Value::Nil | Value::Bool(false))
  }

  pub fn is_number(&self) -> bool {
    matches!(self, Value::Number(_))
  }

  pub fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  fn numeric_binop(
    &self,
    rhs: &Value,
    opr_name: &str,
    f: impl FnOnce(f64, f64) -> f64,
  ) -> Result<Value, String> {
    match (self, rhs) {
      (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
      _ => Err(binary_opr_error_msg!(opr_name, self, rhs)),
    }
  }

  /// `+` also concatenates strings, matching the spec's overload of
  /// addition for the `string` kind. If either side is a string, the
  /// other side coerces to one via its own `Display` rendering rather
  /// than erroring.
  pub fn add(&self, rhs: &Value) -> Result<Value, String> {
    match (self, rhs) {
      (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
      (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(Rc::from(format!("{}{}", self, rhs)))),
      _ => Err(binary_opr_error_msg!("add", self, rhs)),
    }
  }

  pub fn sub(&self, rhs: &Value) -> Result<Value, String> {
    self.numeric_binop(rhs, "subtract", |a, b| a - b)
  }

  pub fn mul(&self, rhs: &Value) -> Result<Value, String> {
    self.numeric_binop(rhs, "multiply", |a, b| a * b)
  }

  /// Division by zero is an arithmetic error, raised by the caller
  /// (the VM), not folded into this generic numeric path, since it
  /// needs a distinct `ErrorKind` from a plain type mismatch.
  pub fn div(&self, rhs: &Value) -> Result<Value, String> {
    self.numeric_binop(rhs, "divide", |a, b| a / b)
  }

  pub fn rem(&self, rhs: &Value) -> Result<Value, String> {
    self.numeric_binop(rhs, "take the modulus of", |a, b| a % b)
  }

  pub fn neg(&self) -> Result<Value, String> {
    match self {
      Value::Number(n) => Ok(Value::Number(-n)),
      _ => Err(format!("Cannot negate '{}'.", self.type_name())),
    }
  }

  pub fn gt(&self, rhs: &Value) -> Result<Value, String> {
    match (self, rhs) {
      (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
      (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a > b)),
      _ => Err(binary_opr_error_msg!("compare", self, rhs)),
    }
  }

  pub fn ge(&self, rhs: &Value) -> Result<Value, String> {
    match (self, rhs) {
      (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
      (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a >= b)),
      _ => Err(binary_opr_error_msg!("compare", self, rhs)),
    }
  }

  pub fn lt(&self, rhs: &Value) -> Result<Value, String> {
    match (self, rhs) {
      (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
      (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a < b)),
      _ => Err(binary_opr_error_msg!("compare", self, rhs)),
    }
  }

  pub fn le(&self, rhs: &Value) -> Result<Value, String> {
    match (self, rhs) {
      (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
      (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a <= b)),
      _ => Err(binary_opr_error_msg!("compare", self, rhs)),
    }
  }

  /// Nil, booleans, and numbers compare by value; strings by codepoint
  /// sequence. Arrays, maps, and functions compare by handle identity —
  /// two arrays built from the same literal contents are not equal
  /// unless one is actually an alias of the other.
  pub fn values_equal(&self, rhs: &Value) -> bool {
    match (self, rhs) {
      (Value::Nil, Value::Nil) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => a == b,
      (Value::Str(a), Value::Str(b)) => a == b,
      (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
      (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
      (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
      (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
      (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
      (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
      (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Value::Nil => write!(f, "null"),
      Value::Bool(b) => write!(f, "{}", b),
      Value::Number(n) => {
        if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
          write!(f, "{}", *n as i64)
        } else {
          write!(f, "{}", n)
        }
      }
      Value::Str(s) => write!(f, "{}", s),
      Value::Array(arr) => {
        write!(f, "[")?;
        for (i, v) in arr.borrow().iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          if matches!(v, Value::Str(_)) {
            write!(f, "\"{}\"", v)?;
          } else {
            write!(f, "{}", v)?;
          }
        }
        write!(f, "]")
      }
      Value::Map(map) => {
        write!(f, "{{")?;
        for (i, (k, v)) in map.borrow().iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}: {}", k.to_value(), v)?;
        }
        write!(f, "}}")
      }
      Value::Function(c) => match &c.proto.name {
        Some(name) => write!(f, "<fn {}>", name),
        None => write!(f, "<fn anonymous>"),
      },
      Value::NativeFunction(n) => write!(f, "<native fn {}>", n.name),
      Value::Module(m) => write!(f, "<module {}>", m.borrow().path),
      Value::Error(e) => write!(f, "{}: {}", e.kind.name(), e.message),
      Value::Iterator(_) => write!(f, "<iterator>"),
    }
  }
}
