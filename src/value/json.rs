//! JSON fixtures
//!
//! Converts `serde_json` documents into object graphs, so traced fixtures
//! can be written as `json!` literals.
//!
//! @module value/json

use super::{Object, Value};

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Object(Object::array(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(map) => Value::Object(Object::plain(
                map.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}
