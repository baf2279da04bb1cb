use std::rc::Rc;

use objects::error_obj::ErrorObj;

/// Renders an uncaught runtime error to standard error: its kind and
/// message, its call stack at the throw site (with runs of identical
/// frames collapsed, the way a deeply recursive uncaught error would
/// otherwise flood the terminal), and any chained `cause` in turn.
pub fn report_runtime_error(err: &Rc<ErrorObj>) {
  print_one(err);

  let mut cause = err.cause.as_ref();
  while let Some(c) = cause {
    eprintln!("\x1b[2mCaused by:\x1b[0m");
    print_one(c);
    cause = c.cause.as_ref();
  }
}

fn print_one(err: &ErrorObj) {
  eprintln!("\x1b[31;1m{}:\x1b[0m\x1b[1m {}\x1b[0m", err.kind.name(), err.message);

  let mut i = 0;
  while i < err.trace.len() {
    let frame = &err.trace[i];
    let mut repeat = 1;
    while i + repeat < err.trace.len()
      && err.trace[i + repeat].func_name == frame.func_name
      && err.trace[i + repeat].line == frame.line
    {
      repeat += 1;
    }

    if repeat > 1 {
      eprintln!("  at {} (line {}) [repeated {} times]", frame.func_name, frame.line, repeat);
    } else {
      eprintln!("  at {} (line {})", frame.func_name, frame.line);
    }
    i += repeat;
  }
}
