use super::*;

#[derive(Debug, Clone, Default)]
enum StreamState {
  #[default]
  Pending,
  Encoded(Cursor<Vec<u8>>),
}

/// A captured call site and the frames leading to it.
///
/// `caller` is the `file:line` of the first retained frame, `stack_trace`
/// lists every frame after it. Reading from a `Trace` yields its JSON
/// encoding; the encoding is produced on the first read and drained by the
/// following ones.
#[derive(Debug, Clone, Default)]
pub struct Trace {
  caller: String,
  stack_trace: String,
  stream: StreamState,
}

impl Trace {
  #[must_use]
  pub fn caller(&self) -> &str {
    &self.caller
  }

  /// Build a record from frames captured elsewhere, innermost first.
  #[must_use]
  pub fn from_frames(frames: &[Frame]) -> Self {
    Self {
      caller: format::caller(frames),
      stack_trace: format::trace(frames),
      stream: StreamState::Pending,
    }
  }

  /// Whether the capture found no frames at all.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.caller.is_empty() && self.stack_trace.is_empty()
  }

  /// Capture the current stack with the default depth of
  /// [`DEFAULT_MAX_DEPTH`](crate::DEFAULT_MAX_DEPTH) frames.
  ///
  /// With `skip == 0` the caller of `Trace::new` becomes the `caller`.
  #[inline(never)]
  #[must_use]
  pub fn new(skip: usize) -> Self {
    let capturer = Capturer::global();
    std::hint::black_box(capturer.capture_from(
      Self::new as usize,
      skip,
      capturer.config().max_depth,
    ))
  }

  #[must_use]
  pub fn stack_trace(&self) -> &str {
    &self.stack_trace
  }

  /// Encode the record as JSON followed by a newline and return a fresh
  /// reader over it. Independent of the record's own read position.
  ///
  /// # Errors
  ///
  /// Returns a `TraceError` if the record cannot be encoded.
  pub fn to_json(&self) -> Result<JsonReader, TraceError> {
    Ok(JsonReader::new(export::to_line(self)?))
  }

  /// # Errors
  ///
  /// Returns a `TraceError` if the record cannot be encoded.
  pub fn to_json_string(&self) -> Result<String, TraceError> {
    export::to_string(self)
  }

  /// Capture the current stack walking at most `max_depth` frames.
  #[inline(never)]
  #[must_use]
  pub fn with_max_depth(skip: usize, max_depth: usize) -> Self {
    std::hint::black_box(Capturer::global().capture_from(
      Self::with_max_depth as usize,
      skip,
      max_depth,
    ))
  }

  /// Write the record as one newline-terminated JSON line.
  ///
  /// # Errors
  ///
  /// Returns a `TraceError` if encoding fails or the writer rejects the data.
  pub fn write_json<W: Write>(&self, writer: W) -> Result<(), TraceError> {
    export::write_line(writer, self)
  }
}

/// Renders `caller`, a newline and a tab, then `stack_trace`; an empty record
/// renders as an empty string.
impl Display for Trace {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    if self.is_empty() {
      return Ok(());
    }

    write!(f, "{}\n\t{}", self.caller, self.stack_trace)
  }
}

impl Eq for Trace {}

impl PartialEq for Trace {
  fn eq(&self, other: &Self) -> bool {
    self.caller == other.caller && self.stack_trace == other.stack_trace
  }
}

impl Read for Trace {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if let StreamState::Pending = self.stream {
      let encoded = export::to_line(&*self)?;
      self.stream = StreamState::Encoded(Cursor::new(encoded));
    }

    match &mut self.stream {
      StreamState::Encoded(cursor) => cursor.read(buf),
      StreamState::Pending => Ok(0),
    }
  }
}

impl Serialize for Trace {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut state = serializer.serialize_struct("Trace", 2)?;
    state.serialize_field("caller", &self.caller)?;
    state.serialize_field("stack_trace", &self.stack_trace)?;
    state.end()
  }
}
