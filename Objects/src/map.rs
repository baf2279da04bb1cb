use hashbrown::HashMap;

use crate::Value;

/// A hashable projection of a `Value`, used as the key type of a
/// Sentra map. Only value kinds the spec calls "hashable" (strings,
/// numbers, booleans) may become keys; everything else is rejected by
/// the compiler's/VM's callers before a `ValueMap` is ever touched.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
  Bool(bool),
  // Stored as bits so that NaN-free finite doubles hash/compare
  // consistently; Sentra numbers used as keys are expected to be
  // well-behaved (integral counters, string-like identifiers).
  Number(u64),
  Str(std::rc::Rc<str>),
}

impl MapKey {
  pub fn from_value(v: &Value) -> Option<MapKey> {
    match v {
      Value::Bool(b) => Some(MapKey::Bool(*b)),
      Value::Number(n) => Some(MapKey::Number(n.to_bits())),
      Value::Str(s) => Some(MapKey::Str(s.clone())),
      _ => None,
    }
  }

  pub fn to_value(&self) -> Value {
    match self {
      MapKey::Bool(b) => Value::Bool(*b),
      MapKey::Number(bits) => Value::Number(f64::from_bits(*bits)),
      MapKey::Str(s) => Value::Str(s.clone()),
    }
  }
}

/// The backing store for a Sentra `Map` value. Insertion order is not
/// preserved, matching the spec's explicit "need not be preserved".
pub type ValueMap = HashMap<MapKey, Value>;
