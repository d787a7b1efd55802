//! Object handles
//!
//! @module value/object

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::RwLock;

use super::{Key, Value};

// =============================================================================
// OBJECT HANDLE TRAIT
// =============================================================================

/// Property-access capability of an object
///
/// Every object in a graph, including traced proxies, is reached through
/// this trait. Implementations must not call back into the tracer from
/// `has`, `keys`, `byte_length` or `is_sequence`: those are used for
/// classification and must be free of side effects.
pub trait ObjectHandle: Send + Sync {
    /// Read a property; missing keys yield `Value::Undefined`
    fn get(&self, key: &Key) -> Value;

    /// Whether the key resolves, own or inherited
    fn has(&self, key: &Key) -> bool;

    /// Write a property
    fn set(&self, key: Key, value: Value);

    /// Own enumerable keys in insertion order
    fn keys(&self) -> Vec<Key>;

    /// Byte length, for binary-like objects
    fn byte_length(&self) -> Option<usize> {
        None
    }

    /// Whether this object is an indexed sequence
    fn is_sequence(&self) -> bool {
        false
    }

    /// Constructor-style class name used when formatting
    fn class_name(&self) -> &str {
        "Object"
    }

    /// Human-readable rendering
    fn describe(&self) -> String {
        format!("[object {}]", self.class_name())
    }
}

/// Shared handle to an object
#[derive(Clone)]
pub struct Object(Arc<dyn ObjectHandle>);

impl Object {
    pub fn from_handle(handle: impl ObjectHandle + 'static) -> Self {
        Self(Arc::new(handle))
    }

    /// Plain object from `(key, value)` pairs
    pub fn plain<K, I>(entries: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::from_handle(PlainObject::new(entries))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::from_handle(Array::new(items))
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Object) -> bool {
        // Compare data pointers only; vtables may differ across codegen units
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const u8,
            Arc::as_ptr(&other.0) as *const u8,
        )
    }

    pub fn get(&self, key: &Key) -> Value {
        self.0.get(key)
    }

    pub fn has(&self, key: &Key) -> bool {
        self.0.has(key)
    }

    pub fn set(&self, key: Key, value: Value) {
        self.0.set(key, value)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.0.keys()
    }

    pub fn byte_length(&self) -> Option<usize> {
        self.0.byte_length()
    }

    pub fn is_sequence(&self) -> bool {
        self.0.is_sequence()
    }

    pub fn class_name(&self) -> &str {
        self.0.class_name()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.describe())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Object").field(&self.0.describe()).finish()
    }
}

// =============================================================================
// PLAIN OBJECT
// =============================================================================

/// Ordered property table with an optional prototype
///
/// Reads fall back to the prototype chain; writes always land on the
/// object itself.
pub struct PlainObject {
    class: CompactString,
    properties: RwLock<Vec<(Key, Value)>>,
    prototype: Option<Object>,
}

impl PlainObject {
    pub fn new<K, I>(entries: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::with_class("Object", entries)
    }

    pub fn with_class<K, I>(class: &str, entries: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut properties: Vec<(Key, Value)> = Vec::new();
        for (key, value) in entries {
            let key = key.into();
            match properties.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => properties.push((key, value)),
            }
        }
        Self {
            class: CompactString::new(class),
            properties: RwLock::new(properties),
            prototype: None,
        }
    }

    /// Attach a prototype whose properties this object inherits
    pub fn with_prototype(mut self, prototype: Object) -> Self {
        self.prototype = Some(prototype);
        self
    }

    fn own(&self, key: &Key) -> Option<Value> {
        self.properties
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl ObjectHandle for PlainObject {
    fn get(&self, key: &Key) -> Value {
        match self.own(key) {
            Some(value) => value,
            None => self
                .prototype
                .as_ref()
                .map(|proto| proto.get(key))
                .unwrap_or_default(),
        }
    }

    fn has(&self, key: &Key) -> bool {
        self.properties.read().iter().any(|(k, _)| k == key)
            || self.prototype.as_ref().map_or(false, |proto| proto.has(key))
    }

    fn set(&self, key: Key, value: Value) {
        let mut properties = self.properties.write();
        match properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => properties.push((key, value)),
        }
    }

    fn keys(&self) -> Vec<Key> {
        self.properties.read().iter().map(|(k, _)| k.clone()).collect()
    }

    fn byte_length(&self) -> Option<usize> {
        // Anything carrying a numeric byteLength is binary-like
        match self.own(&Key::from("byteLength")) {
            Some(Value::Number(n)) if n >= 0.0 => Some(n as usize),
            _ => None,
        }
    }

    fn class_name(&self) -> &str {
        &self.class
    }

    fn describe(&self) -> String {
        if self.class == "Error" {
            if let Some(Value::String(message)) = self.own(&Key::from("message")) {
                return format!("Error: {}", message);
            }
        }
        format!("[object {}]", self.class)
    }
}

// =============================================================================
// ARRAY
// =============================================================================

/// Indexed sequence exposing `length` and numeric keys
pub struct Array {
    items: RwLock<Vec<Value>>,
}

impl Array {
    pub fn new(items: impl IntoIterator<Item = Value>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl ObjectHandle for Array {
    fn get(&self, key: &Key) -> Value {
        if key.as_name() == Some("length") {
            return Value::Number(self.len() as f64);
        }
        key.as_index()
            .and_then(|i| self.items.read().get(i).cloned())
            .unwrap_or_default()
    }

    fn has(&self, key: &Key) -> bool {
        key.as_name() == Some("length") || key.as_index().map_or(false, |i| i < self.len())
    }

    fn set(&self, key: Key, value: Value) {
        let Some(index) = key.as_index() else {
            return;
        };
        let mut items = self.items.write();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
    }

    fn keys(&self) -> Vec<Key> {
        (0..self.len()).map(Key::from).collect()
    }

    fn is_sequence(&self) -> bool {
        true
    }

    fn class_name(&self) -> &str {
        "Array"
    }
}
