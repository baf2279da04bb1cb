/// The instruction set executed by the virtual machine.
///
/// Every opcode has a fixed operand width: none, one byte, or one
/// two-byte (big-endian) short. Unlike the source workspace's dual
/// byte/short "short" and "long" variants of each instruction, Sentra
/// always reserves a two-byte operand for pool indices and jump offsets,
/// trading a little code density for a single, uniformly-sized encoding.
///
/// **NOTE:** changing the declaration order changes the `u8` encoding of
/// every opcode after the moved one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
  // --- Zero-operand instructions ---
  Add,
  Subtract,
  Multiply,
  Divide,
  Modulus,
  Negate,
  Equals,
  NotEquals,
  GreaterThan,
  GreaterThanEq,
  LessThan,
  LessThanEq,
  LogicNot,
  PushNil,
  PushTrue,
  PushFalse,
  Pop,
  Dup,
  IndexGet,
  IndexSet,
  Return,
  CloseUpVal,
  IterStart,
  IterNext,
  IterEnd,
  Throw,
  PopTry,
  EndCatch,
  Log,

  // --- One two-byte operand instructions ---
  PushConstant,
  DefineGlobal,
  GetGlobal,
  SetGlobal,
  GetLocal,
  SetLocal,
  GetUpVal,
  SetUpVal,
  BuildArray,
  BuildMap,
  Call,
  Jump,
  JumpIfFalse,
  LoopBack,
  TryEnter,
  Import,

  // --- Variable-width instruction ---
  // Operand 1 (two bytes): index of the Function constant.
  // Operand 2 (one byte): number of upvalue descriptors that follow.
  // Each descriptor is two bytes: (is_local: u8, index: u16-as-two-bytes
  // truncated to one byte position plus one byte flag — see Compiler).
  MakeClosure,
}

impl From<u8> for OpCode {
  fn from(byte: u8) -> Self {
    // SAFETY: the compiler only ever emits byte values produced by
    // `OpCode as u8`, so every byte the VM reads back was a valid
    // discriminant to begin with.
    unsafe { std::mem::transmute(byte) }
  }
}
