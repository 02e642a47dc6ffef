use {super::*, std::fmt::Write as _};

/// Placeholder used when a program counter has no file or symbol name.
pub(crate) const UNKNOWN: &str = "<unknown>";

/// A single resolved entry of the call stack.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Frame {
  pub file: String,
  pub function: String,
  pub line: u32,
}

impl Frame {
  #[must_use]
  pub fn new(
    file: impl Into<String>,
    function: impl Into<String>,
    line: u32,
  ) -> Self {
    Self {
      file: file.into(),
      function: function.into(),
      line,
    }
  }

  /// Overwrite this slot with the symbol information found for `pc`.
  ///
  /// The slot's string buffers are cleared and refilled in place so a pooled
  /// slot keeps its capacity across captures.
  pub(crate) fn resolve_into(&mut self, pc: usize) {
    let Self {
      file,
      function,
      line,
    } = self;

    file.clear();
    function.clear();

    let mut lineno = None;

    backtrace::resolve(pc as *mut c_void, |symbol| {
      if file.is_empty() {
        if let Some(path) = symbol.filename().and_then(path_to_str) {
          file.push_str(path);
        }
      }

      if function.is_empty() {
        if let Some(name) = symbol.name() {
          push_symbol_name(function, &name);
        }
      }

      if lineno.is_none() {
        lineno = symbol.lineno();
      }
    });

    if file.is_empty() {
      file.push_str(UNKNOWN);
    }

    if function.is_empty() {
      function.push_str(UNKNOWN);
    }

    *line = lineno.unwrap_or(0);
  }
}

impl Display for Frame {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{} {}", self.file, self.line, self.function)
  }
}

fn path_to_str(path: &Path) -> Option<&str> {
  path
    .to_str()
    .or_else(|| path.file_name().and_then(OsStr::to_str))
}

// Alternate formatting drops the trailing `::h<hash>` of Rust symbols.
fn push_symbol_name(out: &mut String, name: &SymbolName<'_>) {
  let _ = write!(out, "{name:#}");
}
