//! Dynamic Value Model
//!
//! The object graphs proptrace instruments are dynamically typed: any
//! property may hold a primitive, a nested object, a function, a binary
//! blob or a deferred (asynchronous) result. `Value` is the closed tagged
//! union for all of them.
//!
//! Objects and functions are capability handles (`ObjectHandle`,
//! `Callable`) rather than concrete structs, so a traced proxy and the
//! object it wraps are interchangeable wherever a `Value` is expected.
//! Callers read properties with [`Value::get`] and invoke functions with
//! [`Value::call`] instead of native syntax.
//!
//! @module value

mod deferred;
mod function;
mod json;
mod object;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use compact_str::CompactString;

use crate::error::{Result, TraceError};
use crate::trace::{Kind, Shape};

pub use deferred::{Deferred, Outcome};
pub use function::{Callable, Function, NativeFunction};
pub use object::{Array, Object, ObjectHandle, PlainObject};

// =============================================================================
// SYMBOL
// =============================================================================

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// A unique, non-string property key / value
///
/// Two symbols are equal only if they came from the same `Symbol::new` call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    id: u64,
    description: Option<CompactString>,
}

impl Symbol {
    pub fn new(description: Option<&str>) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.map(CompactString::new),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

// =============================================================================
// PROPERTY KEY
// =============================================================================

/// Property key: a name or a symbol
///
/// Only named keys take part in tracing; symbol-keyed reads pass through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(CompactString),
    Symbol(Symbol),
}

impl Key {
    /// The key's name, if it is a string key
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name.as_str()),
            Key::Symbol(_) => None,
        }
    }

    /// Parse the key as an array index
    pub fn as_index(&self) -> Option<usize> {
        let name = self.as_name()?;
        // "01" and "+1" are names, not indices
        if name.len() > 1 && name.starts_with('0') {
            return None;
        }
        if !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        name.parse().ok()
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(CompactString::new(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(CompactString::from(name))
    }
}

impl From<CompactString> for Key {
    fn from(name: CompactString) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Name(CompactString::from(index.to_string()))
    }
}

impl From<Symbol> for Key {
    fn from(symbol: Symbol) -> Self {
        Key::Symbol(symbol)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Symbol(symbol) => write!(f, "[{}]", symbol),
        }
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A dynamically typed value in an instrumented object graph
///
/// Primitives compare by value; objects, functions, binaries and deferred
/// results compare by identity, so a value reported through a trace can be
/// checked against the exact handle that produced it.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(Arc<str>),
    Symbol(Symbol),
    /// Opaque binary payload (buffer / typed array)
    Bytes(Arc<[u8]>),
    Object(Object),
    Function(Function),
    /// Deferred result of an asynchronous operation
    Deferred(Deferred),
}

impl Value {
    // =========================================================================
    // CONSTRUCTORS
    // =========================================================================

    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(Arc::from(data.into()))
    }

    /// Build a plain object from `(key, value)` pairs, preserving their order
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Object::plain(entries))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Object(Object::array(items))
    }

    /// Build a synchronous native function
    pub fn function<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Value::Function(Function::native(name, f))
    }

    /// Build a native function whose result is always a deferred value
    ///
    /// The closure runs when the function is called; the future it returns
    /// settles the deferred result.
    pub fn async_function<F, Fut>(name: &str, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        Value::function(name, move |this, args| {
            Ok(Value::Deferred(Deferred::new(f(this, args))))
        })
    }

    /// Build an `Error` object carrying `name` and `message` properties
    pub fn error(message: impl AsRef<str>) -> Self {
        Value::Object(Object::from_handle(PlainObject::with_class(
            "Error",
            [
                ("name", Value::string("Error")),
                ("message", Value::string(message)),
            ],
        )))
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Read a property
    ///
    /// Missing keys and reads on primitives yield `Undefined`, except the
    /// `byteLength`/`length` of a binary and the `length` of a string.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        self.get_key(&key.into())
    }

    pub fn get_key(&self, key: &Key) -> Value {
        match self {
            Value::Object(object) => object.get(key),
            Value::Bytes(data) => match key.as_name() {
                Some("byteLength") | Some("length") => Value::Number(data.len() as f64),
                _ => key
                    .as_index()
                    .and_then(|i| data.get(i))
                    .map(|b| Value::Number(f64::from(*b)))
                    .unwrap_or_default(),
            },
            Value::String(s) if key.as_name() == Some("length") => {
                Value::Number(s.chars().count() as f64)
            }
            _ => Value::Undefined,
        }
    }

    /// Whether `key` resolves on this value (own or inherited)
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match self {
            Value::Object(object) => object.has(&key),
            Value::Bytes(data) => match key.as_name() {
                Some("byteLength") | Some("length") => true,
                _ => key.as_index().map_or(false, |i| i < data.len()),
            },
            Value::String(_) => key.as_name() == Some("length"),
            _ => false,
        }
    }

    /// Own enumerable keys, in insertion order
    pub fn keys(&self) -> Vec<Key> {
        match self {
            Value::Object(object) => object.keys(),
            _ => Vec::new(),
        }
    }

    /// Write a property. Writes are never traced.
    pub fn set(&self, key: impl Into<Key>, value: Value) -> bool {
        match self {
            Value::Object(object) => {
                object.set(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Call this value with an unbound receiver
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        self.call_with_this(&Value::Undefined, &args)
    }

    /// Call this value with an explicit receiver
    pub fn call_with_this(&self, this: &Value, args: &[Value]) -> Result<Value> {
        match self {
            Value::Function(function) => function.call(this, args),
            other => Err(TraceError::NotCallable(other.kind())),
        }
    }

    /// Reflected runtime type
    pub fn kind(&self) -> Kind {
        Kind::of(self)
    }

    /// Structural classification used by the tracer
    pub fn shape(&self) -> Shape {
        Shape::of(self)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Value::Deferred(deferred) => Some(deferred),
            _ => None,
        }
    }

    /// Take the deferred result out of this value
    pub fn into_deferred(self) -> Option<Deferred> {
        match self {
            Value::Deferred(deferred) => Some(deferred),
            _ => None,
        }
    }
}

// =============================================================================
// EQUALITY / FORMATTING
// =============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => fmt_number(*n, f),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Symbol(symbol) => write!(f, "{}", symbol),
            Value::Bytes(data) => write!(f, "[bytes; {}]", data.len()),
            Value::Object(object) => write!(f, "{}", object),
            Value::Function(function) => write!(f, "[function {}]", function.name()),
            Value::Deferred(_) => f.write_str("[deferred]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

impl From<Deferred> for Value {
    fn from(deferred: Deferred) -> Self {
        Value::Deferred(deferred)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
