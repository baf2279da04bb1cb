use std::time::{SystemTime, UNIX_EPOCH};

/// Gets the current unix epoch time in milliseconds. Backs the `clock`
/// native function.
pub fn get_time_millis() -> u64 {
  let start = SystemTime::now();
  let time_since_epoch = start.duration_since(UNIX_EPOCH).expect("Time went backwards");
  time_since_epoch.as_secs() * 1000 + time_since_epoch.subsec_nanos() as u64 / 1_000_000
}

/// Parses a Sentra number literal lexeme (decimal, optionally fractional)
/// into the double that backs every `Value::Number`.
pub fn parse_number_lexeme(lexeme: &str) -> Result<f64, std::num::ParseFloatError> {
  lexeme.parse::<f64>()
}

/// Executes the provided function while also calculating its execution
/// time. Backs the CLI's `--time` summary, mirroring the source
/// workspace's own `bench_time`-gated timing helper.
pub fn exec_time<T, F: FnOnce() -> T>(executor: F) -> (T, std::time::Duration) {
  let start = std::time::Instant::now();
  let result = executor();
  (result, start.elapsed())
}
