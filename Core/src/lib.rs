pub mod ast;
pub mod bytecode;
pub mod errors;
pub mod tokens;
pub mod utils;

/// The current version of the interpreter.
pub const VERSION: &str = "0.1.0";
/// The maximum number of nested call frames before the VM raises a
/// `stack-overflow` error.
pub const FRAMES_MAX: usize = 256;
/// The maximum operand-stack depth before the VM raises a
/// `stack-overflow` error.
pub const STACK_MAX: usize = FRAMES_MAX * 64;
/// The maximum number of local slots (including parameters) a single
/// function body may declare before the compiler raises `compile-limit`.
pub const LOCALS_MAX: usize = 256;
/// The maximum number of distinct upvalues a single function may
/// capture before the compiler raises `compile-limit`.
pub const UPVALUES_MAX: usize = 256;
/// The maximum number of entries a single chunk's constant pool may
/// hold before the compiler raises `compile-limit`.
pub const CONSTANTS_MAX: usize = u16::MAX as usize;
