use {
  stacktrace::{Capturer, Trace, TraceError},
  std::io::{self, Read},
  tracing_subscriber::EnvFilter,
};

#[inline(never)]
fn lookup_user() -> Trace {
  Trace::new(0)
}

#[inline(never)]
fn handle_request() -> Trace {
  lookup_user()
}

fn main() -> Result<(), TraceError> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let mut trace = handle_request();

  println!("=== caller ===");
  println!("{}", trace.caller());
  println!("=== stack trace ===");
  println!("\t{}", trace.stack_trace());
  println!("=== json ===");
  println!("{}", trace.to_json_string()?);

  let mut streamed = String::new();
  trace.read_to_string(&mut streamed)?;
  println!("=== streamed ===");
  print!("{streamed}");

  let capturer = Capturer::builder().max_depth(3).finish();
  println!("=== depth 3 ===");
  capturer.capture(0).write_json(io::stdout().lock())?;

  tracing::info!(
    caller = trace.caller(),
    pooled = capturer.pool().idle(),
    "demo finished"
  );

  Ok(())
}
