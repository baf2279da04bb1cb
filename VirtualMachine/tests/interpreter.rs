use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use virtual_machine::{InterpretResult, ModuleProvider, ModuleResolution, VM};

fn run(src: &str) -> InterpretResult {
  let mut vm = VM::with_filesystem_provider(PathBuf::from("."));
  vm.interpret(PathBuf::from("test"), src.chars().collect())
}

fn expect_ok(src: &str) {
  match run(src) {
    InterpretResult::Ok => {}
    other => panic!("expected the script to run cleanly, got {:?}\nsource:\n{}", other, src),
  }
}

fn expect_runtime_error(src: &str) {
  match run(src) {
    InterpretResult::RuntimeError => {}
    other => panic!("expected a runtime error, got {:?}\nsource:\n{}", other, src),
  }
}

#[test]
fn arithmetic_follows_the_usual_precedence() {
  expect_ok("assert_eq(2 + 3 * 4, 14);");
  expect_ok("assert_eq((2 + 3) * 4, 20);");
  expect_ok("assert_eq(10 - 2 - 3, 5);");
}

#[test]
fn dividing_by_zero_is_a_runtime_error() {
  expect_runtime_error("let x = 1 / 0;");
}

#[test]
fn string_concatenation_coerces_numbers_and_nil() {
  expect_ok(r#"assert_eq("n=" + 1, "n=1");"#);
  expect_ok(r#"assert_eq("v=" + nil, "v=nil");"#);
}

#[test]
fn lexical_scoping_does_not_leak_inner_locals() {
  expect_ok(
    r#"
    let x = 1;
    {
      let x = 2;
      assert_eq(x, 2);
    }
    assert_eq(x, 1);
    "#,
  );
}

#[test]
fn a_closure_captures_its_defining_scopes_local_by_reference() {
  expect_ok(
    r#"
    fn make_counter() {
      let count = 0;
      fn step() {
        count = count + 1;
        return count;
      }
      return step;
    }
    let counter = make_counter();
    assert_eq(counter(), 1);
    assert_eq(counter(), 2);
    assert_eq(counter(), 3);
    "#,
  );
}

#[test]
fn two_closures_from_separate_calls_close_over_independent_upvalues() {
  expect_ok(
    r#"
    fn make_counter() {
      let count = 0;
      fn step() {
        count = count + 1;
        return count;
      }
      return step;
    }
    let a = make_counter();
    let b = make_counter();
    a();
    a();
    assert_eq(a(), 3);
    assert_eq(b(), 1);
    "#,
  );
}

#[test]
fn top_level_functions_are_callable_before_their_declaration() {
  expect_ok(
    r#"
    assert_eq(answer(), 42);
    fn answer() { return 42; }
    "#,
  );
}

#[test]
fn for_in_visits_array_elements_in_order() {
  expect_ok(
    r#"
    let seen = [];
    for i in [10, 20, 30] {
      seen[seen.length] = i;
    }
    assert_eq(seen.length, 3);
    assert_eq(seen[0], 10);
    assert_eq(seen[1], 20);
    assert_eq(seen[2], 30);
    "#,
  );
}

#[test]
fn try_catch_finally_runs_in_the_order_try_then_catch_then_finally() {
  expect_ok(
    r#"
    let order = [];
    try {
      order[order.length] = "try";
      throw "boom";
    } catch e {
      order[order.length] = "catch:" + e;
    } finally {
      order[order.length] = "finally";
    }
    assert_eq(order.length, 3);
    assert_eq(order[0], "try");
    assert_eq(order[1], "catch:boom");
    assert_eq(order[2], "finally");
    "#,
  );
}

#[test]
fn catching_a_thrown_value_binds_the_raw_value_not_an_error_wrapper() {
  // A `throw` of a plain string must bind exactly that string in the
  // `catch` clause, not an `Error`-kind value wrapping it.
  expect_ok(
    r#"
    let caught = nil;
    try {
      throw "x";
    } catch e {
      caught = "caught " + e;
    }
    assert_eq(caught, "caught x");
    "#,
  );
}

#[test]
fn an_uncaught_throw_at_the_top_level_is_a_runtime_error() {
  expect_runtime_error(r#"throw "unhandled";"#);
}

#[test]
fn referencing_an_undeclared_global_is_a_runtime_error() {
  expect_runtime_error("log(undeclared);");
}

#[test]
fn match_runs_the_first_matching_arm_and_falls_back_to_the_wildcard() {
  expect_ok(
    r#"
    let result = nil;
    match 2 {
      1 => { result = "one"; },
      2 => { result = "two"; },
      _ => { result = "other"; }
    }
    assert_eq(result, "two");

    let fallback = nil;
    match 99 {
      1 => { fallback = "one"; },
      2 => { fallback = "two"; },
      _ => { fallback = "other"; }
    }
    assert_eq(fallback, "other");
    "#,
  );
}

#[test]
fn recursive_factorial_of_ten_is_three_million_six_hundred_twenty_eight_thousand_eight_hundred() {
  expect_ok(
    r#"
    fn factorial(n) {
      if n <= 1 { return 1; }
      return n * factorial(n - 1);
    }
    assert_eq(factorial(10), 3628800);
    "#,
  );
}

#[test]
fn unbounded_recursion_is_a_stack_overflow_runtime_error_not_a_crash() {
  expect_runtime_error(
    r#"
    fn boom() { return boom(); }
    boom();
    "#,
  );
}

#[test]
fn arrays_are_shared_by_reference_on_assignment() {
  expect_ok(
    r#"
    let a = [1, 2];
    let b = a;
    b[0] = 9;
    assert_eq(a[0], 9);
    "#,
  );
}

#[test]
fn maps_are_shared_by_reference_on_assignment() {
  expect_ok(
    r#"
    let m = {"a": 1};
    let n = m;
    n["a"] = 9;
    assert_eq(m["a"], 9);
    "#,
  );
}

#[test]
fn map_literals_support_insertion_lookup_and_update() {
  expect_ok(
    r#"
    let m = {"a": 1, "b": 2};
    m["c"] = 3;
    assert_eq(m["a"] + m["b"] + m["c"], 6);
    "#,
  );
}

/// A `ModuleProvider` test double backed by an in-memory source map,
/// counting how many times `resolve` is actually invoked so a test can
/// assert that a module body runs at most once no matter how many
/// `import` statements name it.
struct CountingProvider {
  sources: Vec<(&'static str, &'static str)>,
  resolve_calls: Cell<usize>,
}

impl CountingProvider {
  fn new(sources: Vec<(&'static str, &'static str)>) -> Self {
    Self { sources, resolve_calls: Cell::new(0) }
  }
}

impl ModuleProvider for CountingProvider {
  fn resolve(&self, path: &str) -> ModuleResolution {
    self.resolve_calls.set(self.resolve_calls.get() + 1);
    match self.sources.iter().find(|(name, _)| *name == path) {
      Some((_, src)) => ModuleResolution::Source(PathBuf::from(path), src.chars().collect()),
      None => ModuleResolution::NotFound,
    }
  }
}

#[test]
fn a_module_imported_twice_under_different_aliases_is_resolved_and_run_only_once() {
  let provider = Rc::new(CountingProvider::new(vec![("counter", r#"export let shared = [0];"#)]));

  // `VM::new` takes ownership of the provider, so the call counter is
  // read through a second handle sharing the same `Cell`.
  struct SharedProvider(Rc<CountingProvider>);
  impl ModuleProvider for SharedProvider {
    fn resolve(&self, path: &str) -> ModuleResolution {
      self.0.resolve(path)
    }
  }

  let mut vm = VM::new(Box::new(SharedProvider(provider.clone())));
  let result = vm.interpret(
    PathBuf::from("test"),
    r#"
    import "counter" as m1;
    import "counter" as m2;
    m1.shared[0] = 42;
    assert_eq(m2.shared[0], 42);
    "#
    .chars()
    .collect(),
  );

  assert_eq!(result, InterpretResult::Ok);
  assert_eq!(provider.resolve_calls.get(), 1, "the second import of the same path must hit the module cache instead of resolving again");
}

#[test]
fn importing_a_module_that_does_not_exist_is_a_runtime_error() {
  let provider = CountingProvider::new(vec![]);
  let mut vm = VM::new(Box::new(provider));
  let result = vm.interpret(PathBuf::from("test"), r#"import "nope" as m;"#.chars().collect());
  assert_eq!(result, InterpretResult::RuntimeError);
}
