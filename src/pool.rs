use super::*;

/// Program-counter and frame slots borrowed by a single capture.
#[derive(Debug, Default)]
pub struct Scratch {
  filled: usize,
  frames: Vec<Frame>,
  pcs: Vec<usize>,
}

impl Scratch {
  /// The frames resolved by the current capture, innermost first.
  #[must_use]
  pub fn frames(&self) -> &[Frame] {
    &self.frames[..self.filled]
  }

  #[must_use]
  pub fn program_counters(&self) -> &[usize] {
    &self.pcs
  }

  pub(crate) fn push_pc(&mut self, pc: usize) {
    self.pcs.push(pc);
  }

  /// Resolve every collected program counter into a frame slot, reusing the
  /// slots left behind by earlier captures.
  pub(crate) fn resolve(&mut self) {
    let Self { filled, frames, pcs } = self;

    if frames.len() < pcs.len() {
      frames.resize_with(pcs.len(), Frame::default);
    }

    for (slot, pc) in frames.iter_mut().zip(pcs.iter()) {
      slot.resolve_into(*pc);
    }

    *filled = pcs.len();
  }

  fn reset(&mut self) {
    self.pcs.clear();
    self.filled = 0;
  }

  fn with_capacity(depth: usize) -> Self {
    Self {
      filled: 0,
      frames: Vec::with_capacity(depth),
      pcs: Vec::with_capacity(depth),
    }
  }
}

/// Shared pool of scratch buffers that can be used without taking locks.
///
/// Acquiring pops an idle buffer or allocates a new one; the returned guard
/// hands the buffer back when dropped. Buffers released while the pool is
/// already holding `capacity` idle buffers are freed.
#[derive(Debug)]
pub struct ScratchPool {
  depth_hint: usize,
  queue: ArrayQueue<Scratch>,
}

impl ScratchPool {
  /// Take exclusive ownership of a scratch buffer until the guard drops.
  #[must_use]
  pub fn acquire(&self) -> ScratchGuard<'_> {
    let scratch = self
      .queue
      .pop()
      .unwrap_or_else(|| Scratch::with_capacity(self.depth_hint));

    ScratchGuard {
      pool: self,
      scratch,
    }
  }

  #[must_use]
  pub fn capacity(&self) -> usize {
    self.queue.capacity()
  }

  /// Number of idle buffers currently held by the pool.
  #[must_use]
  pub fn idle(&self) -> usize {
    self.queue.len()
  }

  #[must_use]
  pub fn new(capacity: usize, depth_hint: usize) -> Self {
    Self {
      depth_hint: depth_hint.max(1),
      queue: ArrayQueue::new(capacity.max(1)),
    }
  }

  fn release(&self, mut scratch: Scratch) {
    scratch.reset();

    if self.queue.push(scratch).is_err() {
      tracing::trace!(
        capacity = self.queue.capacity(),
        "scratch pool full, dropping buffer"
      );
    }
  }
}

/// Exclusive handle on a pooled [`Scratch`] buffer.
#[derive(Debug)]
pub struct ScratchGuard<'a> {
  pool: &'a ScratchPool,
  scratch: Scratch,
}

impl std::ops::Deref for ScratchGuard<'_> {
  type Target = Scratch;

  fn deref(&self) -> &Scratch {
    &self.scratch
  }
}

impl std::ops::DerefMut for ScratchGuard<'_> {
  fn deref_mut(&mut self) -> &mut Scratch {
    &mut self.scratch
  }
}

impl Drop for ScratchGuard<'_> {
  fn drop(&mut self) {
    self.pool.release(std::mem::take(&mut self.scratch));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn released_buffers_are_reused() {
    let pool = ScratchPool::new(2, 4);
    assert_eq!(pool.idle(), 0);

    {
      let mut guard = pool.acquire();
      guard.push_pc(0xdead);
      assert_eq!(guard.program_counters(), &[0xdead]);
    }

    assert_eq!(pool.idle(), 1);

    let guard = pool.acquire();
    assert_eq!(pool.idle(), 0);
    assert!(guard.program_counters().is_empty());
    assert!(guard.frames().is_empty());
  }

  #[test]
  fn concurrent_guards_own_distinct_buffers() {
    let pool = ScratchPool::new(4, 4);

    let mut first = pool.acquire();
    let mut second = pool.acquire();
    first.push_pc(1);
    second.push_pc(2);

    assert_eq!(first.program_counters(), &[1]);
    assert_eq!(second.program_counters(), &[2]);

    drop(first);
    drop(second);
    assert_eq!(pool.idle(), 2);
  }

  #[test]
  fn drops_buffers_beyond_capacity() {
    let pool = ScratchPool::new(1, 4);

    let first = pool.acquire();
    let second = pool.acquire();
    drop(first);
    drop(second);

    assert_eq!(pool.capacity(), 1);
    assert_eq!(pool.idle(), 1);
  }

  #[test]
  fn releases_on_unwind() {
    let pool = ScratchPool::new(2, 4);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      let _guard = pool.acquire();
      panic!("capture failed");
    }));

    assert!(result.is_err());
    assert_eq!(pool.idle(), 1);
  }

  #[test]
  fn resolve_keeps_slots_between_captures() {
    let pool = ScratchPool::new(1, 2);

    {
      let mut guard = pool.acquire();
      guard.push_pc(1);
      guard.push_pc(1);
      guard.resolve();
      assert_eq!(guard.frames().len(), 2);
    }

    let mut guard = pool.acquire();
    guard.push_pc(1);
    guard.resolve();
    assert_eq!(guard.frames().len(), 1);
    assert_eq!(guard.frames()[0].file, crate::frame::UNKNOWN);
  }
}
