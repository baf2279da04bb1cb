use std::rc::Rc;

use crate::map::ValueMap;

/// A loaded module instance: the set of exported bindings a script
/// made available via `export`, keyed by name. The VM's module cache
/// stores one of these per resolved import path so a module's
/// top-level code runs at most once no matter how many times it is
/// imported.
#[derive(Debug, Clone)]
pub struct ModuleObj {
  pub path: Rc<str>,
  pub exports: ValueMap,
}

impl ModuleObj {
  pub fn new(path: impl Into<Rc<str>>) -> Self {
    Self { path: path.into(), exports: ValueMap::default() }
  }
}
