use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use compiler::Compiler;
use core::tokens::TokenList;
use core::utils::exec_time;
use lexer::Lexer;
use virtual_machine::{InterpretResult, VM};

#[derive(ClapParser)]
#[command(name = "sentra")]
#[command(about = "The Sentra scripting language interpreter", long_about = None)]
struct Cli {
  /// Path to the script to run.
  script: PathBuf,

  /// Print the compiled chunk's disassembly instead of running it.
  #[arg(long)]
  disassemble: bool,

  /// Print an execution-timing summary after the script finishes.
  #[arg(long)]
  time: bool,
}

fn main() {
  let cli = Cli::parse();

  let source = fs::read_to_string(&cli.script).unwrap_or_else(|e| {
    eprintln!("Could not read '{}': {}", cli.script.display(), e);
    process::exit(74);
  });
  let chars: Vec<char> = source.chars().collect();

  if cli.disassemble {
    run_disassemble(&cli.script, &chars);
    return;
  }

  let base_dir = cli.script.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
  let mut vm = VM::with_filesystem_provider(base_dir);

  let (result, elapsed) = exec_time(|| vm.interpret(cli.script.clone(), chars));

  if cli.time {
    eprintln!("Finished in {:?}", elapsed);
  }

  match result {
    InterpretResult::Ok => process::exit(0),
    InterpretResult::CompileError => process::exit(65),
    InterpretResult::RuntimeError => process::exit(70),
  }
}

fn run_disassemble(filepath: &PathBuf, source: &[char]) {
  let tokens = Lexer::lex(source);
  let token_list = TokenList::new(filepath, source, &tokens);

  match Compiler::compile(&token_list) {
    Ok(proto) => print!("{}", virtual_machine::debug::disassemble_proto(&proto)),
    Err(errs) => {
      let src_str: String = source.iter().collect();
      core::errors::report_source_errors(&filepath.display().to_string(), &errs, &src_str);
      process::exit(65);
    }
  }
}
