use super::*;

/// Walks the call stack and renders it into [`Trace`] records.
///
/// Each capturer owns a [`ScratchPool`]; captures borrow a buffer from it for
/// the duration of one walk. The pool may be shared between capturers through
/// [`CapturerBuilder::pool`].
#[derive(Debug, Clone)]
pub struct Capturer {
  config: CaptureConfig,
  pool: Arc<ScratchPool>,
}

impl Default for Capturer {
  fn default() -> Self {
    Self::new()
  }
}

impl Capturer {
  #[must_use]
  pub fn builder() -> CapturerBuilder {
    CapturerBuilder::new()
  }

  /// Capture a trace using the configured maximum depth.
  ///
  /// `skip` counts frames above the caller of this method: `0` makes the
  /// caller's own call site the trace's `caller`.
  #[inline(never)]
  #[must_use]
  pub fn capture(&self, skip: usize) -> Trace {
    std::hint::black_box(self.capture_from(
      Self::capture as usize,
      skip,
      self.config.max_depth,
    ))
  }

  /// Capture a trace walking at most `max_depth` frames.
  #[inline(never)]
  #[must_use]
  pub fn capture_with_depth(&self, skip: usize, max_depth: usize) -> Trace {
    std::hint::black_box(self.capture_from(
      Self::capture_with_depth as usize,
      skip,
      max_depth,
    ))
  }

  #[must_use]
  pub fn config(&self) -> &CaptureConfig {
    &self.config
  }

  /// Resolve at most `max_depth` frames, innermost first, starting `skip`
  /// frames above the caller of this method.
  #[inline(never)]
  #[must_use]
  pub fn frames(&self, skip: usize, max_depth: usize) -> Vec<Frame> {
    let scratch = self.walk(Self::frames as usize, skip, max_depth);
    std::hint::black_box(scratch.frames().to_vec())
  }

  /// Process-wide capturer with the default configuration, used by
  /// [`Trace::new`] and [`Trace::with_max_depth`].
  #[must_use]
  pub fn global() -> &'static Capturer {
    static GLOBAL: OnceLock<Capturer> = OnceLock::new();
    GLOBAL.get_or_init(Capturer::new)
  }

  #[must_use]
  pub fn new() -> Self {
    Self::with_config(CaptureConfig::default())
  }

  #[must_use]
  pub fn pool(&self) -> &Arc<ScratchPool> {
    &self.pool
  }

  #[must_use]
  pub fn with_config(config: CaptureConfig) -> Self {
    let pool = Arc::new(ScratchPool::new(
      config.pool_capacity,
      config.effective_max_depth(),
    ));

    Self { config, pool }
  }

  /// Capture on behalf of the public function starting at address `entry`.
  ///
  /// Every frame up to and including `entry`'s frame belongs to this crate
  /// and is dropped before `skip` is applied. Callers must not be inlined
  /// and must not tail-call into this method, or their frame is missing.
  pub(crate) fn capture_from(
    &self,
    entry: usize,
    skip: usize,
    max_depth: usize,
  ) -> Trace {
    let scratch = self.walk(entry, skip, max_depth);
    Trace::from_frames(scratch.frames())
  }

  fn walk(
    &self,
    entry: usize,
    skip: usize,
    max_depth: usize,
  ) -> ScratchGuard<'_> {
    let max_depth = max_depth.max(1);
    let mut scratch = self.pool.acquire();

    let mut found = collect(&mut scratch, skip, max_depth, |frame| {
      frame.symbol_address() as usize == entry
    });

    // Some unwinders report the instruction pointer instead of the enclosing
    // function's start, so fall back to matching on the symbol name.
    if !found {
      if let Some(name) = symbol_name(entry) {
        found = collect(&mut scratch, skip, max_depth, |frame| {
          frame_has_symbol(frame, &name)
        });
      }
    }

    if !found {
      tracing::debug!(
        entry,
        skip,
        "entry frame not found on the stack, capture is empty"
      );
    }

    scratch.resolve();

    tracing::trace!(
      skip,
      max_depth,
      frames = scratch.frames().len(),
      "captured stack"
    );

    scratch
  }
}

/// Push the program counters of up to `max_depth` frames found after the
/// frame matching `is_entry`, skipping `skip` of them first. Returns whether
/// the entry frame was seen.
fn collect<F>(
  scratch: &mut Scratch,
  skip: usize,
  max_depth: usize,
  mut is_entry: F,
) -> bool
where
  F: FnMut(&backtrace::Frame) -> bool,
{
  let mut found = false;
  let mut remaining_skip = skip;

  backtrace::trace(|frame| {
    if !found {
      found = is_entry(frame);
      return true;
    }

    if remaining_skip > 0 {
      remaining_skip -= 1;
      return true;
    }

    scratch.push_pc(frame.ip() as usize);
    scratch.program_counters().len() < max_depth
  });

  found
}

fn frame_has_symbol(frame: &backtrace::Frame, expected: &str) -> bool {
  let mut matched = false;

  backtrace::resolve_frame(frame, |symbol| {
    if let Some(name) = symbol.name() {
      matched |= format!("{name:#}") == expected;
    }
  });

  matched
}

fn symbol_name(address: usize) -> Option<String> {
  let mut name = None;

  // `resolve` steps one byte back, landing on the first instruction.
  backtrace::resolve((address + 1) as *mut c_void, |symbol| {
    if name.is_none() {
      name = symbol.name().map(|name| format!("{name:#}"));
    }
  });

  name
}

/// Thin builder that customizes `CaptureConfig` and the capturer's pool.
#[derive(Debug, Default)]
pub struct CapturerBuilder {
  config: CaptureConfig,
  pool: Option<Arc<ScratchPool>>,
}

impl CapturerBuilder {
  #[must_use]
  pub fn finish(self) -> Capturer {
    match self.pool {
      Some(pool) => Capturer {
        config: self.config,
        pool,
      },
      None => Capturer::with_config(self.config),
    }
  }

  #[must_use]
  pub fn max_depth(mut self, depth: usize) -> Self {
    self.config.max_depth = depth;
    self
  }

  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Share an existing pool instead of creating one for this capturer.
  #[must_use]
  pub fn pool(mut self, pool: Arc<ScratchPool>) -> Self {
    self.pool = Some(pool);
    self
  }

  #[must_use]
  pub fn pool_capacity(mut self, capacity: usize) -> Self {
    self.config.pool_capacity = capacity;
    self
  }

  #[must_use]
  pub fn with_config(mut self, config: CaptureConfig) -> Self {
    self.config = config;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[inline(never)]
  fn frames_here(capturer: &Capturer, max_depth: usize) -> (Vec<Frame>, u32) {
    (capturer.frames(0, max_depth), line!())
  }

  #[inline(never)]
  fn skip_pair(capturer: &Capturer) -> (Vec<Frame>, Vec<Frame>) {
    (capturer.frames(0, 4), capturer.frames(1, 4))
  }

  #[inline(never)]
  fn site_a(capturer: &Capturer) -> (Trace, u32) {
    (capturer.capture(0), line!())
  }

  #[inline(never)]
  fn site_b(capturer: &Capturer) -> (Trace, u32) {
    (capturer.capture(0), line!())
  }

  #[test]
  fn first_frame_is_the_call_site() {
    let capturer = Capturer::new();
    let (frames, line) = frames_here(&capturer, 2);

    assert_eq!(frames.len(), 2);
    assert!(frames[0].file.ends_with("capture.rs"), "{}", frames[0].file);
    assert!(frames[0].function.ends_with("frames_here"));
    assert_eq!(frames[0].line, line);
    assert!(frames[1].function.contains("first_frame_is_the_call_site"));
  }

  #[test]
  fn never_returns_more_than_max_depth() {
    let capturer = Capturer::new();

    assert_eq!(capturer.frames(0, 3).len(), 3);
    assert_eq!(capturer.frames(0, 1).len(), 1);
    assert_eq!(capturer.frames(0, 0).len(), 1);
  }

  #[test]
  fn skip_moves_by_whole_frames() {
    let capturer = Capturer::new();
    let (zero, one) = skip_pair(&capturer);

    assert!(zero[0].function.ends_with("skip_pair"));
    assert_eq!(one[0].function, zero[1].function);
    assert_eq!(one[1].function, zero[2].function);
  }

  #[test]
  fn skip_beyond_stack_depth_is_empty() {
    let capturer = Capturer::new();

    assert!(capturer.frames(100_000, 10).is_empty());

    let trace = capturer.capture(100_000);
    assert_eq!(trace.caller(), "");
    assert_eq!(trace.stack_trace(), "");
  }

  #[test]
  fn capture_returns_scratch_to_pool() {
    let capturer = Capturer::builder().pool_capacity(2).finish();
    assert_eq!(capturer.pool().idle(), 0);

    let _ = capturer.capture(0);
    let _ = capturer.frames(0, 4);

    assert_eq!(capturer.pool().idle(), 1);
  }

  #[test]
  fn builder_can_share_a_pool() {
    let pool = Arc::new(ScratchPool::new(4, 10));
    let first = Capturer::builder().pool(Arc::clone(&pool)).finish();
    let second = Capturer::builder().pool(Arc::clone(&pool)).finish();

    let _ = first.capture(0);
    let _ = second.capture(0);

    assert!(Arc::ptr_eq(first.pool(), second.pool()));
    assert_eq!(pool.idle(), 1);
  }

  #[test]
  fn capture_honours_configured_depth() {
    let capturer = Capturer::builder().max_depth(2).finish();
    let trace = capturer.capture(0);

    assert_eq!(trace.stack_trace().matches(":func:").count(), 1);

    let deeper = capturer.capture_with_depth(0, 4);
    assert_eq!(deeper.stack_trace().matches(":func:").count(), 3);
  }

  #[test]
  fn concurrent_captures_keep_their_own_call_site() {
    let capturer = Capturer::builder().pool_capacity(4).finish();
    let capturer = &capturer;

    let results = std::thread::scope(|scope| {
      let handles = (0..64)
        .map(|index| {
          scope.spawn(move || {
            let (trace, line) = if index % 2 == 0 {
              site_a(capturer)
            } else {
              site_b(capturer)
            };
            (trace.caller().to_string(), line)
          })
        })
        .collect::<Vec<_>>();

      handles
        .into_iter()
        .map(|handle| handle.join().expect("capture thread panicked"))
        .collect::<Vec<_>>()
    });

    assert_eq!(results.len(), 64);

    for (caller, line) in results {
      assert_eq!(caller, format!("src/capture.rs:{line}"));
    }

    assert!(capturer.pool().idle() <= 4);
  }
}
