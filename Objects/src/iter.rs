use std::cell::RefCell;
use std::rc::Rc;

use crate::Value;

/// Where a `for...in` iterator pulls its next element from.
#[derive(Debug, Clone)]
pub enum IterSource {
  /// Walks a live array in place: mutating the array mid-loop is
  /// visible to the loop, matching the spec's "reads live" wording.
  Array(Rc<RefCell<Vec<Value>>>),
  /// A materialized snapshot, used for anything that isn't naturally
  /// index-addressable (e.g. a map's values at the moment iteration
  /// began).
  Values(Vec<Value>),
}

/// The mutable cursor state behind a `Value::Iterator` handle. Never
/// constructible or observable from Sentra source directly; it only
/// exists to back `IterStart`/`IterNext`/`IterEnd`.
#[derive(Debug, Clone)]
pub struct IterState {
  pub source: IterSource,
  pub pos: usize,
}

impl IterState {
  pub fn from_array(arr: Rc<RefCell<Vec<Value>>>) -> Self {
    Self { source: IterSource::Array(arr), pos: 0 }
  }

  pub fn from_values(values: Vec<Value>) -> Self {
    Self { source: IterSource::Values(values), pos: 0 }
  }

  /// Advances the cursor and returns the next element, or `None` once
  /// exhausted.
  pub fn next(&mut self) -> Option<Value> {
    let len = match &self.source {
      IterSource::Array(arr) => arr.borrow().len(),
      IterSource::Values(values) => values.len(),
    };

    if self.pos >= len {
      return None;
    }

    let value = match &self.source {
      IterSource::Array(arr) => arr.borrow()[self.pos].clone(),
      IterSource::Values(values) => values[self.pos].clone(),
    };

    self.pos += 1;
    Some(value)
  }
}
