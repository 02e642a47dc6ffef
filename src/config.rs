/// Default number of frames walked per capture.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default number of idle scratch buffers a pool keeps around.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Controls how a [`Capturer`](crate::Capturer) walks the stack.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CaptureConfig {
  /// Maximum number of frames retained per capture, caller frame included.
  pub max_depth: usize,
  /// Number of idle scratch buffers retained by the capturer's pool.
  pub pool_capacity: usize,
}

impl Default for CaptureConfig {
  fn default() -> Self {
    Self {
      max_depth: DEFAULT_MAX_DEPTH,
      pool_capacity: DEFAULT_POOL_CAPACITY,
    }
  }
}

impl CaptureConfig {
  /// Builder-style helper to adjust the maximum stack depth.
  #[must_use]
  pub fn with_max_depth(mut self, depth: usize) -> Self {
    self.max_depth = depth;
    self
  }

  /// Builder-style helper to adjust the number of pooled scratch buffers.
  #[must_use]
  pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
    self.pool_capacity = capacity;
    self
  }

  /// The configured depth, never less than one frame.
  #[must_use]
  pub fn effective_max_depth(&self) -> usize {
    self.max_depth.max(1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_to_ten_frames() {
    let config = CaptureConfig::default();
    assert_eq!(config.max_depth, 10);
    assert_eq!(config.pool_capacity, DEFAULT_POOL_CAPACITY);
  }

  #[test]
  fn zero_depth_is_clamped_to_one() {
    let config = CaptureConfig::default().with_max_depth(0);
    assert_eq!(config.effective_max_depth(), 1);
  }
}
