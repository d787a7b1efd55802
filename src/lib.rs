//! proptrace - Record every property read and call on an object graph
//!
//! Wrap a value once; every property read, function call, call result and
//! asynchronous settlement reached through the wrapper is reported to a
//! callback as a structured access path. Useful for auto-logging, for
//! record/replay of API usage, and for building fixtures from observed
//! traversals.

pub mod config;
pub mod error;
pub mod trace;
pub mod value;

pub use config::TraceOptions;
pub use error::{Result, TraceError};
pub use trace::{wrap, wrap_with_group, Kind, Path, PathGroup, PathSegment, Shape};
pub use value::{Deferred, Function, Key, Object, Outcome, Symbol, Value};
