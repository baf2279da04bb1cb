use std::fmt::{self, Display, Formatter};

/// The category of failure attached to every error Sentra can produce,
/// shared end-to-end from a scanner hiccup to an uncaught runtime throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Syntax,
  Compile,
  Arity,
  Type,
  Reference,
  Index,
  Arithmetic,
  StackOverflow,
  CompileLimit,
  Import,
  User,
  Uncaught,
}

impl ErrorKind {
  pub fn name(&self) -> &'static str {
    match self {
      ErrorKind::Syntax => "SyntaxError",
      ErrorKind::Compile => "CompileError",
      ErrorKind::Arity => "ArityError",
      ErrorKind::Type => "TypeError",
      ErrorKind::Reference => "ReferenceError",
      ErrorKind::Index => "IndexError",
      ErrorKind::Arithmetic => "ArithmeticError",
      ErrorKind::StackOverflow => "StackOverflowError",
      ErrorKind::CompileLimit => "CompileLimitError",
      ErrorKind::Import => "ImportError",
      ErrorKind::User => "UserError",
      ErrorKind::Uncaught => "UncaughtError",
    }
  }
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// A diagnostic produced before the VM ever runs: a lexer, parser, or
/// compiler error. Carries enough source-location information for the
/// host to render a caret under the offending span.
#[derive(Debug, Clone)]
pub struct SourceError {
  pub kind: ErrorKind,
  pub message: String,
  pub line: usize,
  pub col_start: usize,
  pub lexeme_len: usize,
}

impl SourceError {
  pub fn new(kind: ErrorKind, message: impl Into<String>, line: usize, col_start: usize, lexeme_len: usize) -> Self {
    Self { kind, message: message.into(), line, col_start, lexeme_len }
  }
}

/// Prints a single source line with a caret span underneath it, in the
/// style the source workspace's own error reporter uses for both
/// compile-time diagnostics and runtime tracebacks.
pub fn print_error_snippet(line_num: usize, col_start: usize, span_len: usize, src_line: &str) {
  let gutter = format!("{} | ", line_num);
  eprintln!("{}{}", gutter, src_line);

  let pad = " ".repeat(gutter.len() + col_start);
  let carets = "^".repeat(span_len.max(1));
  eprintln!("{}\x1b[31;1m{}\x1b[0m", pad, carets);
}

/// Renders a list of source errors (the scanner/parser/compiler can
/// accumulate more than one before giving up) to standard error.
pub fn report_source_errors(filepath: &str, errors: &[SourceError], source: &str) {
  let lines: Vec<&str> = source.split('\n').collect();

  for err in errors {
    eprintln!(
      "\x1b[31;1m{}:\x1b[0m\x1b[1m {} [{}:{}:{}]\x1b[0m",
      err.kind.name(),
      err.message,
      filepath,
      err.line,
      err.col_start
    );

    if let Some(src_line) = lines.get(err.line.saturating_sub(1)) {
      print_error_snippet(err.line, err.col_start, err.lexeme_len, src_line);
    }
  }
}
