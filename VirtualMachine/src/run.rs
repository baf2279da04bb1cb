use std::cell::RefCell;
use std::rc::Rc;

use core::bytecode::OpCode;
use core::errors::ErrorKind;
use objects::error_obj::{ErrorObj, TraceFrame};
use objects::func::{Closure, Upvalue};
use objects::iter::IterState;
use objects::map::{MapKey, ValueMap};
use objects::module::ModuleObj;
use objects::native::NativeArity;
use objects::Value;

use crate::{CallFrame, ModuleResolution, ProtectionRecord, VM};

impl VM {
  /// Runs frames until the one at index `frame_floor` returns, yielding
  /// its return value. Every `Call` pushes a new frame and every
  /// `Return` pops one; `frame_floor` is whichever frame `run_proto`
  /// pushed to start this particular invocation; `run` never looks below
  /// it; an error that would otherwise unwind past it is instead
  /// returned to the caller as `Err`.
  pub(crate) fn run(&mut self, frame_floor: usize) -> Result<Value, Rc<ErrorObj>> {
    macro_rules! bail {
      ($err:expr) => {{
        match self.raise(frame_floor, $err) {
          Ok(()) => continue,
          Err(final_err) => return Err(final_err),
        }
      }};
    }

    macro_rules! push {
      ($v:expr) => {
        match self.push($v) {
          Ok(()) => {}
          Err(Value::Error(e)) => bail!(e),
          Err(_) => unreachable!("the only failure pushing a value can produce is a stack-overflow error"),
        }
      };
    }

    macro_rules! numeric_binop {
      ($method:ident) => {{
        let b = self.pop();
        let a = self.pop();
        match a.$method(&b) {
          Ok(v) => push!(v),
          Err(msg) => bail!(self.runtime_error(ErrorKind::Type, msg)),
        }
      }};
    }

    loop {
      let frame_idx = self.frames.len() - 1;
      let ip = self.frames[frame_idx].ip;
      let op = self.frames[frame_idx].closure.proto.chunk.read_op(ip);
      self.frames[frame_idx].ip += 1;

      macro_rules! read_byte {
        () => {{
          let at = self.frames[frame_idx].ip;
          self.frames[frame_idx].ip += 1;
          self.frames[frame_idx].closure.proto.chunk.read_byte(at)
        }};
      }

      macro_rules! read_short {
        () => {{
          let at = self.frames[frame_idx].ip;
          self.frames[frame_idx].ip += 2;
          self.frames[frame_idx].closure.proto.chunk.read_short(at)
        }};
      }

      match op {
        // --- arithmetic & comparison -----------------------------------
        OpCode::Add => numeric_binop!(add),
        OpCode::Subtract => numeric_binop!(sub),
        OpCode::Multiply => numeric_binop!(mul),
        OpCode::Divide => {
          let b = self.pop();
          let a = self.pop();
          if matches!((&a, &b), (Value::Number(_), Value::Number(0.0))) {
            bail!(self.runtime_error(ErrorKind::Arithmetic, "Cannot divide by zero."));
          }
          match a.div(&b) {
            Ok(v) => push!(v),
            Err(msg) => bail!(self.runtime_error(ErrorKind::Type, msg)),
          }
        }
        OpCode::Modulus => {
          let b = self.pop();
          let a = self.pop();
          if matches!((&a, &b), (Value::Number(_), Value::Number(0.0))) {
            bail!(self.runtime_error(ErrorKind::Arithmetic, "Cannot take the modulus of zero."));
          }
          match a.rem(&b) {
            Ok(v) => push!(v),
            Err(msg) => bail!(self.runtime_error(ErrorKind::Type, msg)),
          }
        }
        OpCode::Negate => {
          let a = self.pop();
          match a.neg() {
            Ok(v) => push!(v),
            Err(msg) => bail!(self.runtime_error(ErrorKind::Type, msg)),
          }
        }
        OpCode::Equals => {
          let b = self.pop();
          let a = self.pop();
          push!(Value::Bool(a.values_equal(&b)));
        }
        OpCode::NotEquals => {
          let b = self.pop();
          let a = self.pop();
          push!(Value::Bool(!a.values_equal(&b)));
        }
        OpCode::GreaterThan => numeric_binop!(gt),
        OpCode::GreaterThanEq => numeric_binop!(ge),
        OpCode::LessThan => numeric_binop!(lt),
        OpCode::LessThanEq => numeric_binop!(le),
        OpCode::LogicNot => {
          let a = self.pop();
          push!(Value::Bool(!a.is_truthy()));
        }

        // --- stack shuffling & literals ----------------------------------
        OpCode::PushNil => push!(Value::Nil),
        OpCode::PushTrue => push!(Value::Bool(true)),
        OpCode::PushFalse => push!(Value::Bool(false)),
        OpCode::Pop => {
          self.pop();
        }
        OpCode::Dup => {
          let v = self.peek(0).clone();
          push!(v);
        }

        // --- indexing ----------------------------------------------------
        OpCode::IndexGet => {
          let index = self.pop();
          let target = self.pop();
          match Self::index_get(&target, &index) {
            Ok(v) => push!(v),
            Err((kind, msg)) => bail!(self.runtime_error(kind, msg)),
          }
        }
        OpCode::IndexSet => {
          let index = self.pop();
          let target = self.pop();
          let value = self.pop();
          match Self::index_set(&target, &index, value.clone()) {
            Ok(()) => push!(value),
            Err((kind, msg)) => bail!(self.runtime_error(kind, msg)),
          }
        }

        // --- calls & returns ----------------------------------------------
        OpCode::Return => {
          let value = self.pop();
          let finished = self.frames.pop().unwrap();
          self.close_upvalues(finished.base_pointer);
          self.stack.truncate(finished.base_pointer);
          if self.frames.len() == frame_floor {
            return Ok(value);
          }
          push!(value);
        }
        OpCode::CloseUpVal => {
          let top = self.stack.len() - 1;
          self.close_upvalues(top);
          self.pop();
        }

        // --- iteration -----------------------------------------------------
        OpCode::IterStart => {
          let target = self.pop();
          match Self::make_iter_state(target) {
            Ok(state) => push!(Value::Iterator(Rc::new(RefCell::new(state)))),
            Err((kind, msg)) => bail!(self.runtime_error(kind, msg)),
          }
        }
        OpCode::IterNext => {
          let handle = match self.peek(0) {
            Value::Iterator(h) => h.clone(),
            _ => unreachable!("IterNext always follows a live IterStart handle"),
          };
          match handle.borrow_mut().next() {
            Some(v) => {
              push!(v);
              push!(Value::Bool(true));
            }
            None => push!(Value::Bool(false)),
          }
        }
        OpCode::IterEnd => {
          self.pop();
        }

        // --- error handling -----------------------------------------------
        OpCode::Throw => {
          let value = self.pop();
          let err = match value {
            Value::Error(e) => Rc::new(ErrorObj { trace: self.capture_trace(), ..(*e).clone() }),
            other => {
              let msg = other.to_string();
              Rc::new(ErrorObj::new(ErrorKind::User, msg).with_payload(other)).tap_trace(self.capture_trace())
            }
          };
          bail!(err);
        }
        OpCode::PopTry => {
          self.frames[frame_idx].protections.pop();
        }
        OpCode::EndCatch => {
          self.pending_errors.pop();
        }
        OpCode::Log => {
          let v = self.pop();
          println!("{}", v);
        }

        // --- globals & locals -----------------------------------------------
        OpCode::PushConstant => {
          let idx = read_short!();
          let v = self.frames[frame_idx].closure.proto.chunk.get_constant(idx as usize).clone();
          push!(v);
        }
        OpCode::DefineGlobal => {
          let idx = read_short!();
          let name = self.constant_name(frame_idx, idx);
          let value = self.pop();
          self.globals.insert(name, value);
        }
        OpCode::GetGlobal => {
          let idx = read_short!();
          let name = self.constant_name(frame_idx, idx);
          match self.globals.get(&name).cloned() {
            Some(v) => push!(v),
            None => bail!(self.runtime_error(ErrorKind::Reference, format!("Undefined variable '{}'.", name))),
          }
        }
        OpCode::SetGlobal => {
          let idx = read_short!();
          let name = self.constant_name(frame_idx, idx);
          if !self.globals.contains_key(&name) {
            bail!(self.runtime_error(ErrorKind::Reference, format!("Undefined variable '{}'.", name)));
          }
          let v = self.peek(0).clone();
          self.globals.insert(name, v);
        }
        OpCode::GetLocal => {
          let idx = read_short!() as usize;
          let base = self.frames[frame_idx].base_pointer;
          let v = self.stack[base + idx].clone();
          push!(v);
        }
        OpCode::SetLocal => {
          let idx = read_short!() as usize;
          let base = self.frames[frame_idx].base_pointer;
          let v = self.peek(0).clone();
          self.stack[base + idx] = v;
        }
        OpCode::GetUpVal => {
          let idx = read_short!() as usize;
          let up = self.frames[frame_idx].closure.upvalues[idx].clone();
          let v = match &*up.borrow() {
            Upvalue::Open(i) => self.stack[*i].clone(),
            Upvalue::Closed(v) => v.clone(),
          };
          push!(v);
        }
        OpCode::SetUpVal => {
          let idx = read_short!() as usize;
          let up = self.frames[frame_idx].closure.upvalues[idx].clone();
          let v = self.peek(0).clone();
          match &mut *up.borrow_mut() {
            Upvalue::Open(i) => self.stack[*i] = v,
            Upvalue::Closed(slot) => *slot = v,
          }
        }

        // --- collections ------------------------------------------------
        OpCode::BuildArray => {
          let len = read_short!() as usize;
          let start = self.stack.len() - len;
          let items = self.stack.split_off(start);
          push!(Value::Array(Rc::new(RefCell::new(items))));
        }
        OpCode::BuildMap => {
          let len = read_short!() as usize;
          let start = self.stack.len() - len * 2;
          let entries = self.stack.split_off(start);
          let mut map = ValueMap::default();
          let mut bad_key = false;
          for pair in entries.chunks(2) {
            match MapKey::from_value(&pair[0]) {
              Some(k) => {
                map.insert(k, pair[1].clone());
              }
              None => bad_key = true,
            }
          }
          if bad_key {
            bail!(self.runtime_error(ErrorKind::Index, "Map keys must be a bool, number, or string."));
          }
          push!(Value::Map(Rc::new(RefCell::new(map))));
        }

        // --- calls -------------------------------------------------------
        OpCode::Call => {
          let argc = read_short!() as usize;
          let callee = self.peek(argc).clone();
          match callee {
            Value::Function(closure) => {
              if closure.proto.arity != argc {
                bail!(self.runtime_error(
                  ErrorKind::Arity,
                  format!("Expected {} argument(s) but got {}.", closure.proto.arity, argc)
                ));
              }
              if let Err(Value::Error(e)) = self.check_frames_capacity() {
                bail!(e);
              }
              let callee_pos = self.stack.len() - 1 - argc;
              self.stack.remove(callee_pos);
              let base_pointer = self.stack.len() - argc;
              self.frames.push(CallFrame { closure, ip: 0, base_pointer, protections: Vec::new() });
            }
            Value::NativeFunction(native) => {
              if !native.arity.accepts(argc) {
                bail!(self.runtime_error(
                  ErrorKind::Arity,
                  format!("'{}' expects {} argument(s).", native.name, Self::describe_arity(&native.arity))
                ));
              }
              let start = self.stack.len() - argc;
              let args = self.stack.split_off(start);
              self.pop();
              match (native.func)(&args) {
                Ok(v) => push!(v),
                Err(e) => bail!(self.runtime_error(ErrorKind::User, e.message)),
              }
            }
            other => bail!(self.runtime_error(ErrorKind::Type, format!("'{}' is not callable.", other.type_name()))),
          }
        }

        // --- jumps ---------------------------------------------------------
        OpCode::Jump => {
          let offset = read_short!() as usize;
          self.frames[frame_idx].ip += offset;
        }
        OpCode::JumpIfFalse => {
          let offset = read_short!() as usize;
          let cond = self.pop();
          if !cond.is_truthy() {
            self.frames[frame_idx].ip += offset;
          }
        }
        OpCode::LoopBack => {
          let offset = read_short!() as usize;
          self.frames[frame_idx].ip -= offset;
        }
        OpCode::TryEnter => {
          let offset = read_short!() as usize;
          let handler_ip = self.frames[frame_idx].ip + offset;
          self.frames[frame_idx].protections.push(ProtectionRecord { handler_ip, stack_depth: self.stack.len() });
        }

        // --- modules ---------------------------------------------------------
        OpCode::Import => {
          let path = match self.pop() {
            Value::Str(s) => s,
            _ => unreachable!("Import always follows a PushConstant string"),
          };

          if let Some(cached) = self.modules.get(&path).cloned() {
            push!(cached);
            continue;
          }

          let exports = match self.provider.resolve(&path) {
            ModuleResolution::Source(resolved_path, source) => match self.run_module(&resolved_path, &source) {
              Ok(exports) => exports,
              Err(e) => {
                let wrapped = Rc::new(
                  ErrorObj::new(ErrorKind::Import, format!("Error while importing '{}': {}", path, e.message))
                    .with_cause(e),
                )
                .tap_trace(self.capture_trace());
                bail!(wrapped)
              }
            },
            ModuleResolution::Prebuilt(exports) => exports,
            ModuleResolution::NotFound => {
              bail!(self.runtime_error(ErrorKind::Import, format!("Could not resolve module '{}'.", path)))
            }
          };

          let mut map = ValueMap::default();
          for (name, value) in exports {
            map.insert(MapKey::Str(name), value);
          }
          let value = Value::Module(Rc::new(RefCell::new(ModuleObj { path: path.clone(), exports: map })));
          self.modules.insert(path.clone(), value.clone());
          push!(value);
        }

        // --- closures --------------------------------------------------------
        OpCode::MakeClosure => {
          let const_idx = read_short!();
          let upvalue_count = read_byte!() as usize;
          let template = self.frames[frame_idx].closure.proto.chunk.get_constant(const_idx as usize).clone();
          let proto = match template {
            Value::Function(c) => c.proto.clone(),
            _ => unreachable!("MakeClosure's constant is always a Function template"),
          };

          let mut upvalues = Vec::with_capacity(upvalue_count);
          for _ in 0..upvalue_count {
            let is_local = read_byte!() != 0;
            let index = read_byte!() as usize;
            let up = if is_local {
              let abs_idx = self.frames[frame_idx].base_pointer + index;
              self.capture_upvalue(abs_idx)
            } else {
              self.frames[frame_idx].closure.upvalues[index].clone()
            };
            upvalues.push(up);
          }

          push!(Value::Function(Rc::new(Closure { proto, upvalues })));
        }
      }
    }
  }

  // --- helpers ------------------------------------------------------------

  fn constant_name(&self, frame_idx: usize, idx: u16) -> Rc<str> {
    match self.frames[frame_idx].closure.proto.chunk.get_constant(idx as usize) {
      Value::Str(s) => s.clone(),
      _ => unreachable!("a name operand always indexes a Str constant"),
    }
  }

  fn describe_arity(arity: &NativeArity) -> String {
    match arity {
      NativeArity::Exact(n) => format!("exactly {}", n),
      NativeArity::Range(lo, hi) => format!("between {} and {}", lo, hi),
    }
  }

  fn index_get(target: &Value, index: &Value) -> Result<Value, (ErrorKind, String)> {
    match (target, index) {
      (Value::Array(arr), Value::Number(n)) => {
        if n.fract() != 0.0 || *n < 0.0 {
          return Err((ErrorKind::Type, "Array indices must be non-negative integers.".to_string()));
        }
        let i = *n as usize;
        let arr = arr.borrow();
        arr
          .get(i)
          .cloned()
          .ok_or_else(|| (ErrorKind::Index, format!("Array index {} is out of range (length {}).", i, arr.len())))
      }
      (Value::Array(arr), Value::Str(s)) if &**s == "length" => Ok(Value::Number(arr.borrow().len() as f64)),
      (Value::Str(s), Value::Number(n)) => {
        if n.fract() != 0.0 || *n < 0.0 {
          return Err((ErrorKind::Type, "String indices must be non-negative integers.".to_string()));
        }
        let i = *n as usize;
        s.chars()
          .nth(i)
          .map(|c| Value::Str(Rc::from(c.to_string())))
          .ok_or_else(|| (ErrorKind::Index, format!("String index {} is out of range.", i)))
      }
      (Value::Str(s), Value::Str(k)) if &**k == "length" => Ok(Value::Number(s.chars().count() as f64)),
      (Value::Map(map), index) => match MapKey::from_value(index) {
        Some(k) => Ok(map.borrow().get(&k).cloned().unwrap_or(Value::Nil)),
        None => Err((ErrorKind::Index, "Map keys must be a bool, number, or string.".to_string())),
      },
      (Value::Module(module), Value::Str(name)) => {
        let module = module.borrow();
        module
          .exports
          .get(&MapKey::Str(name.clone()))
          .cloned()
          .ok_or_else(|| (ErrorKind::Reference, format!("Module '{}' has no export named '{}'.", module.path, name)))
      }
      (target, index) => Err((ErrorKind::Type, format!("Cannot index into '{}' with '{}'.", target.type_name(), index.type_name()))),
    }
  }

  fn index_set(target: &Value, index: &Value, value: Value) -> Result<(), (ErrorKind, String)> {
    match (target, index) {
      (Value::Array(arr), Value::Number(n)) => {
        if n.fract() != 0.0 || *n < 0.0 {
          return Err((ErrorKind::Type, "Array indices must be non-negative integers.".to_string()));
        }
        let i = *n as usize;
        let mut arr = arr.borrow_mut();
        if i == arr.len() {
          arr.push(value);
        } else if i < arr.len() {
          arr[i] = value;
        } else {
          return Err((ErrorKind::Index, format!("Array index {} is out of range (length {}).", i, arr.len())));
        }
        Ok(())
      }
      (Value::Map(map), index) => match MapKey::from_value(index) {
        Some(k) => {
          map.borrow_mut().insert(k, value);
          Ok(())
        }
        None => Err((ErrorKind::Index, "Map keys must be a bool, number, or string.".to_string())),
      },
      (Value::Module(module), _) => {
        Err((ErrorKind::Type, format!("Module '{}' exports are read-only.", module.borrow().path)))
      }
      (target, index) => {
        Err((ErrorKind::Type, format!("Cannot assign into '{}' with an index of type '{}'.", target.type_name(), index.type_name())))
      }
    }
  }

  /// Builds the iterator state backing a `for...in` loop over `target`.
  /// Arrays are walked live; maps and strings are snapshotted at the
  /// moment iteration begins, since a map's element order isn't stable
  /// across mutation and a string has no natural in-place cursor.
  fn make_iter_state(target: Value) -> Result<IterState, (ErrorKind, String)> {
    match target {
      Value::Array(arr) => Ok(IterState::from_array(arr)),
      Value::Map(map) => Ok(IterState::from_values(map.borrow().values().cloned().collect())),
      Value::Str(s) => Ok(IterState::from_values(s.chars().map(|c| Value::Str(Rc::from(c.to_string()))).collect())),
      other => Err((ErrorKind::Type, format!("Value of type '{}' is not iterable.", other.type_name()))),
    }
  }

  fn capture_upvalue(&mut self, abs_idx: usize) -> Rc<RefCell<Upvalue>> {
    if let Some(existing) = self.open_upvalues.iter().find(|u| matches!(&*u.borrow(), Upvalue::Open(i) if *i == abs_idx)) {
      return existing.clone();
    }
    let up = Rc::new(RefCell::new(Upvalue::Open(abs_idx)));
    self.open_upvalues.push(up.clone());
    up
  }

  /// Closes (copies out) every still-open upvalue pointing at or above
  /// `floor` on the operand stack, used both when a single captured
  /// local goes out of scope (`CloseUpVal`) and when an entire frame's
  /// locals do (`Return`, and unwinding frames during `raise`).
  fn close_upvalues(&mut self, floor: usize) {
    let mut i = 0;
    while i < self.open_upvalues.len() {
      let should_close = matches!(&*self.open_upvalues[i].borrow(), Upvalue::Open(idx) if *idx >= floor);
      if should_close {
        let up = self.open_upvalues.remove(i);
        let value = match &*up.borrow() {
          Upvalue::Open(idx) => self.stack[*idx].clone(),
          Upvalue::Closed(v) => v.clone(),
        };
        *up.borrow_mut() = Upvalue::Closed(value);
      } else {
        i += 1;
      }
    }
  }

  fn capture_trace(&self) -> Vec<TraceFrame> {
    self
      .frames
      .iter()
      .rev()
      .map(|f| {
        let func_name = f.closure.proto.name.clone().unwrap_or_else(|| Rc::from("script"));
        let line = f.closure.proto.chunk.line_at(f.ip.saturating_sub(1));
        TraceFrame { func_name, line }
      })
      .collect()
  }

  fn runtime_error(&self, kind: ErrorKind, msg: impl Into<String>) -> Rc<ErrorObj> {
    Rc::new(ErrorObj::new(kind, msg.into())).tap_trace(self.capture_trace())
  }

  /// Finds a handler for `err`, starting at the current (innermost)
  /// frame and unwinding outward. A frame with a pending `try` jumps to
  /// its handler and stops there; a frame without one is popped (its
  /// upvalues closed, its locals and call slot discarded) and the
  /// search continues in its caller. An error that would unwind past
  /// `frame_floor` — this `run` invocation's own entry frame — is
  /// returned to the caller uncaught instead.
  fn raise(&mut self, frame_floor: usize, mut err: Rc<ErrorObj>) -> Result<(), Rc<ErrorObj>> {
    if err.cause.is_none() {
      if let Some(cause) = self.pending_errors.last() {
        err = Rc::new((*err).clone().with_cause(cause.clone()));
      }
    }

    loop {
      let idx = self.frames.len() - 1;
      if let Some(prot) = self.frames[idx].protections.pop() {
        self.close_upvalues(prot.stack_depth);
        self.stack.truncate(prot.stack_depth);
        let bound = err.payload.clone().unwrap_or_else(|| Value::Error(err.clone()));
        self.stack.push(bound);
        self.frames[idx].ip = prot.handler_ip;
        self.pending_errors.push(err);
        return Ok(());
      }

      let popped = self.frames.pop().unwrap();
      self.close_upvalues(popped.base_pointer);
      self.stack.truncate(popped.base_pointer);

      if idx == frame_floor {
        return Err(err);
      }
    }
  }
}

trait TapTrace {
  fn tap_trace(self, trace: Vec<TraceFrame>) -> Self;
}

impl TapTrace for Rc<ErrorObj> {
  fn tap_trace(self, trace: Vec<TraceFrame>) -> Self {
    Rc::new(ErrorObj { trace, ..(*self).clone() })
  }
}
