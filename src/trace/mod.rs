//! Property Access Tracing
//!
//! This module instruments an object graph so that every property read,
//! function call and call result is reported as a structured access path:
//! - Path model (segments, paths, path groups)
//! - Value classification (reflected kind, structural shape)
//! - Object proxy intercepting reads
//! - Call trampoline dispatching sync, deferred and rejected results
//!
//! Tracing is lazy: nothing is reported when a value is wrapped. Each read
//! through a wrapper either reports a leaf, reports a boundary, or returns
//! a further wrapper that carries its own copy of the path so far.
//!
//! @module trace

pub mod path;
mod proxy;
mod trampoline;
pub mod types;

use std::sync::Arc;

use tracing::trace;

use crate::config::TraceOptions;
use crate::value::{Object, Value};

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use path::{Path, PathGroup, PathSegment};
pub use types::{Kind, Shape};

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Instrument `target` with a fresh path group
///
/// Only keyed and indexed objects are instrumented; any other value is
/// returned unchanged.
///
/// # Example
/// ```
/// use proptrace::{wrap, TraceOptions, Value};
///
/// let options = TraceOptions::new().callback(|group, value| {
///     println!("{} = {}", group, value);
/// });
/// let traced = wrap(Value::object([("hello", Value::from("world"))]), &options);
/// assert_eq!(traced.get("hello"), Value::from("world"));
/// ```
pub fn wrap(target: Value, options: &TraceOptions) -> Value {
    wrap_with_group(target, options, PathGroup::new())
}

/// Instrument `target`, continuing an existing path group
pub fn wrap_with_group(target: Value, options: &TraceOptions, group: PathGroup) -> Value {
    wrap_shared(target, Arc::new(options.clone()), group)
}

pub(crate) fn wrap_shared(target: Value, options: Arc<TraceOptions>, group: PathGroup) -> Value {
    if !Shape::of(&target).is_traceable() {
        return target;
    }
    match target {
        Value::Object(object) => {
            trace!(path = %group, "Wrapping object");
            Value::Object(Object::from_handle(proxy::TracedObject::new(
                object, options, group,
            )))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_objects_returned_unchanged() {
        let options = TraceOptions::new();
        let data = Value::bytes(vec![1, 2]);
        assert_eq!(wrap(data.clone(), &options), data);
        assert_eq!(wrap(Value::from("x"), &options), Value::from("x"));

        let f = Value::function("f", |_, _| Ok(Value::Null));
        assert_eq!(wrap(f.clone(), &options), f);
    }

    #[test]
    fn test_objects_become_proxies() {
        let options = TraceOptions::new();
        let raw = Value::object([("a", Value::from(1))]);
        let traced = wrap(raw.clone(), &options);

        assert_ne!(traced, raw);
        assert_eq!(traced.kind(), Kind::Object);
        assert_eq!(traced.shape(), Shape::Mapping);
        assert_eq!(traced.to_string(), raw.to_string());
    }

    #[test]
    fn test_wrap_with_inherited_group() {
        let reported = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = reported.clone();
        let options = TraceOptions::new().callback(move |group, _| {
            sink.lock().push(group.to_string());
        });
        let inherited = PathGroup::from(vec![vec![PathSegment::call("load", vec![])], vec![]]);

        let traced = wrap_with_group(Value::object([("id", Value::from(1))]), &options, inherited);
        traced.get("id");

        assert_eq!(*reported.lock(), vec!["load() -> id".to_string()]);
    }
}
