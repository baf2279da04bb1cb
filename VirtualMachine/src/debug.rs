//! A text disassembler for compiled chunks, wired up behind the CLI's
//! `--disassemble` flag. Mirrors the source workspace's own bytecode
//! dumper: one row per instruction, columns for the instruction
//! pointer, line, raw byte, opcode name, and decoded operand.

use std::fmt::Write as FmtWrite;

use core::bytecode::OpCode;
use objects::func::FuncProto;
use objects::Value;

/// Disassembles `proto` and every nested function prototype reachable
/// from its constant pool, each under its own header.
pub fn disassemble_proto(proto: &FuncProto) -> String {
  let mut output = String::new();
  disassemble_one(proto, &mut output);
  output
}

fn disassemble_one(proto: &FuncProto, output: &mut String) {
  let label = proto.name.as_deref().unwrap_or("script");
  writeln!(output, "== {} ==", label).unwrap();

  let chunk = &proto.chunk;
  let mut ip = 0;
  let mut rows: Vec<(String, String, String, String)> = Vec::new();
  let mut max_name_len = 0;

  while ip < chunk.code.len() {
    let line = chunk.line_at(ip).to_string();
    let byte = chunk.code[ip];
    let (name, operand, width) = describe(chunk, ip);
    max_name_len = max_name_len.max(name.len());
    rows.push((format!("{:04}", ip), line, format!("{:#04x}", byte), format!("{:<pad$}{}", name, operand, pad = 0)));
    ip += 1 + width;
  }

  for (ptr, line, byte, rest) in rows {
    writeln!(output, "{} line {:>4}  {}  {}", ptr, line, byte, rest).unwrap();
  }

  for value in &chunk.constants {
    if let Value::Function(closure) = value {
      writeln!(output).unwrap();
      disassemble_one(&closure.proto, output);
    }
  }
}

/// Returns the opcode's mnemonic, its rendered operand (empty if it
/// takes none), and how many operand bytes follow it in the stream —
/// `Import` is listed among the compiler's two-byte-operand opcodes in
/// name only; it actually carries no operand of its own, since the
/// module path is pushed separately by a preceding `PushConstant`.
fn describe(chunk: &objects::chunk::Chunk, ip: usize) -> (&'static str, String, usize) {
  let op = chunk.read_op(ip);
  let at = ip + 1;

  match op {
    OpCode::Add => ("ADD", String::new(), 0),
    OpCode::Subtract => ("SUBTRACT", String::new(), 0),
    OpCode::Multiply => ("MULTIPLY", String::new(), 0),
    OpCode::Divide => ("DIVIDE", String::new(), 0),
    OpCode::Modulus => ("MODULUS", String::new(), 0),
    OpCode::Negate => ("NEGATE", String::new(), 0),
    OpCode::Equals => ("EQUALS", String::new(), 0),
    OpCode::NotEquals => ("NOT_EQUALS", String::new(), 0),
    OpCode::GreaterThan => ("GREATER_THAN", String::new(), 0),
    OpCode::GreaterThanEq => ("GREATER_THAN_EQ", String::new(), 0),
    OpCode::LessThan => ("LESS_THAN", String::new(), 0),
    OpCode::LessThanEq => ("LESS_THAN_EQ", String::new(), 0),
    OpCode::LogicNot => ("LOGIC_NOT", String::new(), 0),
    OpCode::PushNil => ("PUSH_NIL", String::new(), 0),
    OpCode::PushTrue => ("PUSH_TRUE", String::new(), 0),
    OpCode::PushFalse => ("PUSH_FALSE", String::new(), 0),
    OpCode::Pop => ("POP", String::new(), 0),
    OpCode::Dup => ("DUP", String::new(), 0),
    OpCode::IndexGet => ("INDEX_GET", String::new(), 0),
    OpCode::IndexSet => ("INDEX_SET", String::new(), 0),
    OpCode::Return => ("RETURN", String::new(), 0),
    OpCode::CloseUpVal => ("CLOSE_UP_VAL", String::new(), 0),
    OpCode::IterStart => ("ITER_START", String::new(), 0),
    OpCode::IterNext => ("ITER_NEXT", String::new(), 0),
    OpCode::IterEnd => ("ITER_END", String::new(), 0),
    OpCode::Throw => ("THROW", String::new(), 0),
    OpCode::PopTry => ("POP_TRY", String::new(), 0),
    OpCode::EndCatch => ("END_CATCH", String::new(), 0),
    OpCode::Log => ("LOG", String::new(), 0),
    OpCode::Import => ("IMPORT", String::new(), 0),

    OpCode::PushConstant => {
      let idx = chunk.read_short(at);
      ("PUSH_CONSTANT", format!("{:<4} ; {}", idx, chunk.get_constant(idx as usize)), 2)
    }
    OpCode::DefineGlobal => ("DEFINE_GLOBAL", format!("{}", chunk.read_short(at)), 2),
    OpCode::GetGlobal => ("GET_GLOBAL", format!("{}", chunk.read_short(at)), 2),
    OpCode::SetGlobal => ("SET_GLOBAL", format!("{}", chunk.read_short(at)), 2),
    OpCode::GetLocal => ("GET_LOCAL", format!("{}", chunk.read_short(at)), 2),
    OpCode::SetLocal => ("SET_LOCAL", format!("{}", chunk.read_short(at)), 2),
    OpCode::GetUpVal => ("GET_UP_VAL", format!("{}", chunk.read_short(at)), 2),
    OpCode::SetUpVal => ("SET_UP_VAL", format!("{}", chunk.read_short(at)), 2),
    OpCode::BuildArray => ("BUILD_ARRAY", format!("{}", chunk.read_short(at)), 2),
    OpCode::BuildMap => ("BUILD_MAP", format!("{}", chunk.read_short(at)), 2),
    OpCode::Call => ("CALL", format!("{} arg(s)", chunk.read_short(at)), 2),
    OpCode::Jump => ("JUMP", format!("-> {}", at + 2 + chunk.read_short(at) as usize), 2),
    OpCode::JumpIfFalse => ("JUMP_IF_FALSE", format!("-> {}", at + 2 + chunk.read_short(at) as usize), 2),
    OpCode::LoopBack => ("LOOP_BACK", format!("-> {}", (at + 2).saturating_sub(chunk.read_short(at) as usize)), 2),
    OpCode::TryEnter => ("TRY_ENTER", format!("-> {}", at + 2 + chunk.read_short(at) as usize), 2),

    OpCode::MakeClosure => {
      let const_idx = chunk.read_short(at);
      let upvalue_count = chunk.read_byte(at + 2) as usize;
      (
        "MAKE_CLOSURE",
        format!("{:<4} ; {} upvalue(s)", const_idx, upvalue_count),
        2 + 1 + upvalue_count * 2,
      )
    }
  }
}
