//! Traced Object Proxy
//!
//! `TracedObject` stands in for an object of the instrumented graph. Every
//! read goes through [`TracedObject::intercept`], which either:
//! - stops: reports the boundary and hands back the raw value
//! - records a segment and reports a leaf value
//! - records a segment and returns a further-wrapped object, trampoline,
//!   or chained deferred, so tracing continues lazily
//!
//! Everything else (`has`, `keys`, writes, classification) is forwarded to
//! the target untouched.
//!
//! @module trace/proxy

use std::sync::Arc;

use compact_str::CompactString;
use tracing::{debug, trace};

use super::path::{PathGroup, PathSegment};
use super::trampoline::{settle, Trampoline};
use super::types::{Kind, Shape};
use super::wrap_shared;
use crate::config::TraceOptions;
use crate::value::{Function, Key, Object, ObjectHandle, Value};

pub(crate) struct TracedObject {
    target: Object,
    /// `target` as a value, handed to hooks and boundary reports
    target_value: Value,
    group: PathGroup,
    options: Arc<TraceOptions>,
}

impl TracedObject {
    pub(crate) fn new(target: Object, options: Arc<TraceOptions>, group: PathGroup) -> Self {
        Self {
            target_value: Value::Object(target.clone()),
            target,
            group,
            options,
        }
    }

    fn intercept(&self, key: &Key) -> Value {
        let raw = self.target.get(key);

        let name = match key.as_name() {
            Some(name)
                if self.target.has(key) && self.options.follows(&self.target_value, key) =>
            {
                CompactString::new(name)
            }
            _ => {
                self.stop(key);
                return raw;
            }
        };

        let kind = Kind::of(&raw);
        let group = self.group.with_segment(PathSegment::access(name.clone(), kind));

        match Shape::of(&raw) {
            Shape::Mapping | Shape::Sequence => {
                trace!(key = %name, "Following nested object");
                wrap_shared(raw, self.options.clone(), group)
            }
            Shape::Function => match raw {
                Value::Function(function) => Value::Function(Function::from_callable(
                    Trampoline::new(
                        self.target_value.clone(),
                        name,
                        function,
                        group,
                        self.options.clone(),
                    ),
                )),
                other => other,
            },
            Shape::Deferred => match raw {
                // Reached by a read, not a call: the open path stays as is
                Value::Deferred(deferred) => Value::Deferred(settle(
                    deferred,
                    group.clone(),
                    group,
                    self.options.clone(),
                )),
                other => other,
            },
            Shape::Primitive | Shape::OpaqueBinary => {
                debug!(path = %group, value = %raw, "Leaf value reached");
                self.options.report(&group, &raw);
                raw
            }
        }
    }

    /// Report that tracing stops at this object
    ///
    /// Nothing is reported while no call boundary has been crossed yet.
    fn stop(&self, key: &Key) {
        let completed = self.group.completed();
        if completed.is_empty() {
            trace!(key = %key, "Not following, nothing traced yet");
            return;
        }
        debug!(key = %key, path = %completed, "Not following, reporting boundary");
        self.options.report(&completed, &self.target_value);
    }
}

impl ObjectHandle for TracedObject {
    fn get(&self, key: &Key) -> Value {
        self.intercept(key)
    }

    fn has(&self, key: &Key) -> bool {
        self.target.has(key)
    }

    fn set(&self, key: Key, value: Value) {
        self.target.set(key, value)
    }

    fn keys(&self) -> Vec<Key> {
        self.target.keys()
    }

    fn byte_length(&self) -> Option<usize> {
        self.target.byte_length()
    }

    fn is_sequence(&self) -> bool {
        self.target.is_sequence()
    }

    fn class_name(&self) -> &str {
        self.target.class_name()
    }

    fn describe(&self) -> String {
        self.target.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::wrap;
    use parking_lot::Mutex;

    type Calls = Arc<Mutex<Vec<(PathGroup, Value)>>>;

    fn recording() -> (TraceOptions, Calls) {
        let calls: Calls = Arc::default();
        let sink = calls.clone();
        let options = TraceOptions::new().callback(move |group, value| {
            sink.lock().push((group.clone(), value.clone()));
        });
        (options, calls)
    }

    #[test]
    fn test_leaf_read_reports_once() {
        let (options, calls) = recording();
        let traced = wrap(Value::object([("hello", Value::from("world"))]), &options);

        assert_eq!(traced.get("hello"), Value::from("world"));

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            PathGroup::from(vec![vec![PathSegment::access("hello", Kind::String)]])
        );
        assert_eq!(calls[0].1, Value::from("world"));
    }

    #[test]
    fn test_nested_object_is_lazy() {
        let (options, calls) = recording();
        let inner = Value::object([("value", Value::from("hello"))]);
        let traced = wrap(Value::object([("nested", inner.clone())]), &options);

        let nested = traced.get("nested");
        // A proxy, not the raw object, and nothing reported yet
        assert_ne!(nested, inner);
        assert!(calls.lock().is_empty());

        assert_eq!(nested.get("value"), Value::from("hello"));
        assert_eq!(
            calls.lock()[0].0,
            PathGroup::from(vec![vec![
                PathSegment::access("nested", Kind::Object),
                PathSegment::access("value", Kind::String),
            ]])
        );
    }

    #[test]
    fn test_falsy_leaves_reported() {
        let (options, calls) = recording();
        let traced = wrap(
            Value::object([
                ("zero", Value::from(0)),
                ("empty", Value::from("")),
                ("off", Value::Bool(false)),
                ("none", Value::Null),
                ("nothing", Value::Undefined),
            ]),
            &options,
        );

        assert_eq!(traced.get("zero"), Value::from(0));
        assert_eq!(traced.get("empty"), Value::from(""));
        assert_eq!(traced.get("off"), Value::Bool(false));
        assert_eq!(traced.get("none"), Value::Null);
        assert!(traced.get("nothing").is_undefined());

        let kinds: Vec<Kind> = calls.lock().iter().map(|(g, _)| g.paths()[0][0].kind).collect();
        assert_eq!(
            kinds,
            vec![Kind::Number, Kind::String, Kind::Boolean, Kind::Object, Kind::Undefined]
        );
    }

    #[test]
    fn test_missing_key_at_root_is_silent() {
        let (options, calls) = recording();
        let traced = wrap(Value::object(Vec::<(&str, Value)>::new()), &options);

        assert!(traced.get("hello").is_undefined());
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_symbol_keys_pass_through() {
        let (options, calls) = recording();
        let tag = crate::value::Symbol::new(Some("tag"));
        let traced = wrap(
            Value::object([(Key::from(tag.clone()), Value::from("raw"))]),
            &options,
        );

        assert_eq!(traced.get(tag), Value::from("raw"));
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_binary_leaf_is_identity() {
        let (options, calls) = recording();
        let data = Value::bytes(vec![0x30, 0x00]);
        let traced = wrap(Value::object([("data", data.clone())]), &options);

        assert_eq!(traced.get("data"), data);
        let calls = calls.lock();
        assert_eq!(calls[0].0.paths()[0][0].kind, Kind::Object);
        assert_eq!(calls[0].1, data);
    }

    #[test]
    fn test_byte_length_view_is_identity() {
        let (options, calls) = recording();
        let view = Value::object([("byteLength", Value::from(4)), ("offset", Value::from(0))]);
        let traced = wrap(Value::object([("view", view.clone())]), &options);

        // Reported and returned raw, never wrapped
        let read = traced.get("view");
        assert_eq!(read, view);
        assert_eq!(read.get("offset"), Value::from(0));

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            PathGroup::from(vec![vec![PathSegment::access("view", Kind::Object)]])
        );
        assert_eq!(calls[0].1, view);
    }

    #[test]
    fn test_sequence_traced_by_index() {
        let (options, calls) = recording();
        let traced = wrap(
            Value::object([("items", Value::array([Value::from("a"), Value::from("b")]))]),
            &options,
        );

        assert_eq!(traced.get("items").get(1usize), Value::from("b"));
        assert_eq!(traced.get("items").get("length"), Value::from(2));

        let calls = calls.lock();
        assert_eq!(calls[0].0.to_string(), "items.1");
        assert_eq!(calls[1].0.to_string(), "items.length");
    }

    #[test]
    fn test_writes_and_keys_forwarded() {
        let (options, calls) = recording();
        let raw = Value::object([("a", Value::from(1))]);
        let traced = wrap(raw.clone(), &options);

        assert!(traced.set("b", Value::from(2)));
        assert_eq!(raw.get("b"), Value::from(2));
        assert_eq!(traced.keys().len(), 2);
        assert!(traced.has("a"));
        assert!(calls.lock().is_empty());
    }
}
