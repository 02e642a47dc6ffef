use super::*;

/// Errors that can occur when encoding a trace.
#[derive(Debug)]
pub enum TraceError {
  Io(io::Error),
  Json(serde_json::Error),
}

impl Display for TraceError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Self::Io(err) => write!(f, "i/o error while writing trace: {err}"),
      Self::Json(err) => write!(f, "failed to encode trace as json: {err}"),
    }
  }
}

impl std::error::Error for TraceError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(err) => Some(err),
      Self::Json(err) => Some(err),
    }
  }
}

impl From<io::Error> for TraceError {
  fn from(value: io::Error) -> Self {
    Self::Io(value)
  }
}

impl From<serde_json::Error> for TraceError {
  fn from(value: serde_json::Error) -> Self {
    Self::Json(value)
  }
}

/// Readable, already-encoded JSON document.
#[derive(Debug, Clone)]
pub struct JsonReader {
  inner: Cursor<Vec<u8>>,
}

impl JsonReader {
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    self.inner.get_ref()
  }

  #[must_use]
  pub fn into_inner(self) -> Vec<u8> {
    self.inner.into_inner()
  }

  pub(crate) fn new(encoded: Vec<u8>) -> Self {
    Self {
      inner: Cursor::new(encoded),
    }
  }
}

impl Read for JsonReader {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.inner.read(buf)
  }
}

/// Compact JSON output that escapes `<`, `>`, `&`, U+2028 and U+2029 so the
/// document can be embedded in HTML and JavaScript unchanged.
#[derive(Debug, Clone, Copy, Default)]
struct HtmlSafeFormatter;

impl serde_json::ser::Formatter for HtmlSafeFormatter {
  fn write_string_fragment<W>(
    &mut self,
    writer: &mut W,
    fragment: &str,
  ) -> io::Result<()>
  where
    W: ?Sized + Write,
  {
    let mut start = 0;

    for (index, ch) in fragment.char_indices() {
      let escaped = match ch {
        '<' => "\\u003c",
        '>' => "\\u003e",
        '&' => "\\u0026",
        '\u{2028}' => "\\u2028",
        '\u{2029}' => "\\u2029",
        _ => continue,
      };

      writer.write_all(&fragment.as_bytes()[start..index])?;
      writer.write_all(escaped.as_bytes())?;
      start = index + ch.len_utf8();
    }

    writer.write_all(&fragment.as_bytes()[start..])
  }
}

/// Encode `value` into `writer` without a trailing newline.
pub(crate) fn write_compact<T, W>(
  writer: W,
  value: &T,
) -> Result<(), serde_json::Error>
where
  T: Serialize + ?Sized,
  W: Write,
{
  let mut serializer =
    serde_json::Serializer::with_formatter(writer, HtmlSafeFormatter);
  value.serialize(&mut serializer)
}

/// Encode `value` into `writer` as a single newline-terminated line.
pub(crate) fn write_line<T, W>(
  mut writer: W,
  value: &T,
) -> Result<(), TraceError>
where
  T: Serialize + ?Sized,
  W: Write,
{
  write_compact(&mut writer, value).map_err(classify)?;
  writer.write_all(b"\n")?;
  Ok(())
}

pub(crate) fn to_line<T>(value: &T) -> Result<Vec<u8>, serde_json::Error>
where
  T: Serialize + ?Sized,
{
  let mut encoded = Vec::with_capacity(128);
  write_compact(&mut encoded, value)?;
  encoded.push(b'\n');
  Ok(encoded)
}

pub(crate) fn to_string<T>(value: &T) -> Result<String, TraceError>
where
  T: Serialize + ?Sized,
{
  let mut encoded = Vec::with_capacity(128);
  write_compact(&mut encoded, value).map_err(classify)?;

  // The formatter only ever emits UTF-8, so this arm cannot fire.
  String::from_utf8(encoded).map_err(|err| {
    TraceError::Io(io::Error::new(io::ErrorKind::InvalidData, err))
  })
}

/// Writer failures surface as `Io`, everything else as `Json`.
fn classify(err: serde_json::Error) -> TraceError {
  if err.is_io() {
    TraceError::Io(io::Error::from(err))
  } else {
    TraceError::Json(err)
  }
}
