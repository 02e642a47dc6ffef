//! Bounded call-stack capture rendered as a compact, serializable record.
//!
//! A [`Trace`] holds two strings: the `caller` (the `file:line` of the call
//! site) and the `stack_trace` (one line per outer frame). Captures walk at
//! most a configured number of frames and borrow their scratch storage from
//! a [`ScratchPool`], so a busy host does not allocate fresh buffers on every
//! call.

mod capture;
mod config;
mod export;
pub mod format;
mod frame;
mod pool;
mod trace;

use {
  backtrace::SymbolName,
  crossbeam_queue::ArrayQueue,
  serde::{Serialize, Serializer, ser::SerializeStruct},
  std::{
    ffi::{OsStr, c_void},
    fmt::{self, Display, Formatter},
    io::{self, Cursor, Read, Write},
    path::Path,
    sync::{Arc, OnceLock},
  },
};

pub use {
  capture::{Capturer, CapturerBuilder},
  config::{CaptureConfig, DEFAULT_MAX_DEPTH, DEFAULT_POOL_CAPACITY},
  export::{JsonReader, TraceError},
  frame::Frame,
  pool::{Scratch, ScratchGuard, ScratchPool},
  trace::Trace,
};
