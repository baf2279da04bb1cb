use std::rc::Rc;

use core::utils::get_time_millis;
use objects::native::{NativeArity, NativeError, NativeFn, NativeFuncObj};
use objects::Value;

use crate::VM;

/// Populates the VM's global table with the native functions every
/// Sentra script can call without an explicit `import`.
pub fn install(vm: &mut VM) {
  register(vm, "clock", NativeArity::Exact(0), native_clock);
  register(vm, "assert", NativeArity::Range(1, 2), native_assert);
  register(vm, "assert_eq", NativeArity::Range(2, 3), native_assert_eq);
  register(vm, "assert_ne", NativeArity::Range(2, 3), native_assert_ne);
  register(vm, "typeof", NativeArity::Exact(1), native_typeof);
  register(vm, "str", NativeArity::Exact(1), native_str);
  register(vm, "random", NativeArity::Exact(0), native_random);
}

fn register(vm: &mut VM, name: &str, arity: NativeArity, func: NativeFn) {
  let obj = Rc::new(NativeFuncObj::new(name, arity, func));
  vm.globals.insert(Rc::from(name), Value::NativeFunction(obj));
}

/// Milliseconds since the Unix epoch, for measuring elapsed time inside
/// a script.
fn native_clock(_args: &[Value]) -> Result<Value, NativeError> {
  Ok(Value::Number(get_time_millis() as f64))
}

fn native_assert(args: &[Value]) -> Result<Value, NativeError> {
  if args[0].is_truthy() {
    Ok(Value::Nil)
  } else {
    let message = args.get(1).map(|v| v.to_string()).unwrap_or_else(|| "Assertion failed on a falsey value.".to_string());
    Err(NativeError::new(message))
  }
}

fn native_assert_eq(args: &[Value]) -> Result<Value, NativeError> {
  if args[0].values_equal(&args[1]) {
    Ok(Value::Nil)
  } else {
    let message = args.get(2).map(|v| v.to_string()).unwrap_or_else(|| "Assertion values are not equal.".to_string());
    Err(NativeError::new(message))
  }
}

fn native_assert_ne(args: &[Value]) -> Result<Value, NativeError> {
  if !args[0].values_equal(&args[1]) {
    Ok(Value::Nil)
  } else {
    let message = args.get(2).map(|v| v.to_string()).unwrap_or_else(|| "Assertion values are equal.".to_string());
    Err(NativeError::new(message))
  }
}

fn native_typeof(args: &[Value]) -> Result<Value, NativeError> {
  Ok(Value::Str(Rc::from(args[0].type_name())))
}

fn native_str(args: &[Value]) -> Result<Value, NativeError> {
  Ok(Value::Str(Rc::from(args[0].to_string())))
}

/// A random float in `[0, 1)`, matching the source workspace's own
/// `random()` native.
fn native_random(_args: &[Value]) -> Result<Value, NativeError> {
  Ok(Value::Number(rand::random::<f64>()))
}
