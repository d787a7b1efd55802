use thiserror::Error;

use crate::trace::Kind;
use crate::value::Value;

pub type Result<T> = std::result::Result<T, TraceError>;

#[derive(Error, Debug, Clone)]
pub enum TraceError {
    #[error("Value of kind {0} is not callable")]
    NotCallable(Kind),

    #[error("Uncaught {0}")]
    Thrown(Value),
}

impl TraceError {
    /// Create an error carrying a thrown `Error` object with the given message
    pub fn thrown(message: impl AsRef<str>) -> Self {
        Self::Thrown(Value::error(message))
    }

    /// The value a deferred result rejects with when this error surfaces
    /// inside an asynchronous continuation
    pub fn into_reason(self) -> Value {
        match self {
            Self::Thrown(value) => value,
            Self::NotCallable(kind) => Value::error(format!("Value of kind {} is not callable", kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrown_reason_is_identity() {
        let reason = Value::error("Bad error!");
        let err = TraceError::Thrown(reason.clone());
        assert_eq!(err.into_reason(), reason);
    }

    #[test]
    fn test_not_callable_reason_is_error_object() {
        let reason = TraceError::NotCallable(Kind::Number).into_reason();
        assert_eq!(reason.to_string(), "Error: Value of kind number is not callable");
    }

    #[test]
    fn test_display() {
        let err = TraceError::NotCallable(Kind::String);
        assert_eq!(err.to_string(), "Value of kind string is not callable");

        let err = TraceError::thrown("boom");
        assert_eq!(err.to_string(), "Uncaught Error: boom");
    }
}
