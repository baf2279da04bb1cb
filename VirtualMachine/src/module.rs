use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use objects::Value;

/// What an import path resolved to: the module's own source text (not
/// yet lexed or compiled), a ready-made set of exports handed to the
/// VM directly (a host-provided native module, never compiled), or
/// nothing at that path.
pub enum ModuleResolution {
  Source(PathBuf, Vec<char>),
  Prebuilt(Vec<(Rc<str>, Value)>),
  NotFound,
}

/// How the VM turns an `import "name"` path into source code. Kept as
/// a trait rather than baked into the VM so embedding code can supply
/// modules from anywhere — an in-memory registry, a network fetch —
/// instead of only ever reading the local filesystem.
pub trait ModuleProvider {
  fn resolve(&self, path: &str) -> ModuleResolution;
}

/// Resolves import paths relative to a fixed base directory, appending
/// a `.sn` extension when the path doesn't already carry one.
pub struct FsModuleProvider {
  base_dir: PathBuf,
}

impl FsModuleProvider {
  pub fn new(base_dir: PathBuf) -> Self {
    Self { base_dir }
  }
}

impl ModuleProvider for FsModuleProvider {
  fn resolve(&self, path: &str) -> ModuleResolution {
    let mut full = self.base_dir.join(path);
    if full.extension().is_none() {
      full.set_extension("sn");
    }

    match fs::read_to_string(&full) {
      Ok(src) => ModuleResolution::Source(full, src.chars().collect()),
      Err(_) => ModuleResolution::NotFound,
    }
  }
}
