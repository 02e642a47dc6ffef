//! Rendering of captured frames into the `caller` and `stack_trace` strings.

use {super::*, std::fmt::Write as _};

/// Number of trailing path segments kept in the caller identifier.
pub const CALLER_PATH_SEGMENTS: usize = 2;

/// `file:line` of the first frame, with the file shortened by
/// [`short_path`]. Empty when there are no frames.
#[must_use]
pub fn caller(frames: &[Frame]) -> String {
  frames
    .first()
    .map(|frame| format!("{}:{}", short_path(&frame.file), frame.line))
    .unwrap_or_default()
}

/// One `file:line:func:name` entry per frame after the first, each
/// terminated by a newline and a tab. The separator after the last entry is
/// kept.
#[must_use]
pub fn trace(frames: &[Frame]) -> String {
  let mut out = String::new();

  for frame in frames.iter().skip(1) {
    let _ = write!(
      out,
      "{}:{}:func:{}\n\t",
      frame.file,
      frame.line,
      trim_function_name(&frame.function, &frame.file)
    );
  }

  out
}

/// Keep the last [`CALLER_PATH_SEGMENTS`] `/`-separated segments of `path`.
///
/// Paths with fewer segments are returned unchanged.
#[must_use]
pub fn short_path(path: &str) -> &str {
  let start = path
    .rmatch_indices('/')
    .nth(CALLER_PATH_SEGMENTS - 1)
    .map_or(0, |(index, _)| index + 1);

  &path[start..]
}

/// Strip every leading character of `function` that also occurs in `file`.
///
/// This is a character-set trim, not a prefix match: file paths and
/// qualified function names rarely share a prefix, so most names come out
/// untouched or lose only a few leading letters. The exact output is kept
/// stable for consumers that parse `stack_trace`.
#[must_use]
pub fn trim_function_name<'a>(function: &'a str, file: &str) -> &'a str {
  function.trim_start_matches(|c: char| file.contains(c))
}
