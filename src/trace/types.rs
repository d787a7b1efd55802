//! Value Classification
//!
//! Two views of a value drive the tracer:
//! - `Kind`: the reflected runtime type recorded in a path segment
//! - `Shape`: the structural class that decides whether to recurse
//!
//! @module trace/types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

// =============================================================================
// KIND
// =============================================================================

/// Reflected runtime type of an accessed value
///
/// `null`, sequences, binaries and deferred values all reflect as `Object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Function,
    Object,
    String,
    Number,
    Boolean,
    Symbol,
    Undefined,
    BigInt,
}

impl Kind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Undefined => Kind::Undefined,
            Value::Bool(_) => Kind::Boolean,
            Value::Number(_) => Kind::Number,
            Value::BigInt(_) => Kind::BigInt,
            Value::String(_) => Kind::String,
            Value::Symbol(_) => Kind::Symbol,
            Value::Function(_) => Kind::Function,
            Value::Null | Value::Bytes(_) | Value::Object(_) | Value::Deferred(_) => Kind::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Function => "function",
            Kind::Object => "object",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Symbol => "symbol",
            Kind::Undefined => "undefined",
            Kind::BigInt => "bigint",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SHAPE
// =============================================================================

/// Structural class of a value at a wrap boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// undefined, null, booleans, numbers, strings, symbols, bigints
    Primitive,
    /// Indexed object (array)
    Sequence,
    /// Keyed object
    Mapping,
    Function,
    /// Pending asynchronous result
    Deferred,
    /// Buffer / typed array / anything with a byte length
    OpaqueBinary,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Function(_) => Shape::Function,
            Value::Deferred(_) => Shape::Deferred,
            Value::Bytes(_) => Shape::OpaqueBinary,
            Value::Object(object) if object.byte_length().is_some() => Shape::OpaqueBinary,
            Value::Object(object) if object.is_sequence() => Shape::Sequence,
            Value::Object(_) => Shape::Mapping,
            _ => Shape::Primitive,
        }
    }

    /// Whether the tracer wraps values of this shape and keeps following
    pub fn is_traceable(self) -> bool {
        matches!(self, Shape::Sequence | Shape::Mapping)
    }
}
