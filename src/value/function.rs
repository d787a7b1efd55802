//! Callable handles
//!
//! @module value/function

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;

use super::Value;
use crate::error::Result;

/// Invocation capability of a function value
pub trait Callable: Send + Sync {
    /// Invoke with a receiver and arguments
    ///
    /// `Err` models a synchronous throw; asynchronous failures are
    /// expressed by returning a rejected `Value::Deferred`.
    fn call(&self, this: &Value, args: &[Value]) -> Result<Value>;

    fn name(&self) -> &str {
        ""
    }
}

/// Shared handle to a callable
#[derive(Clone)]
pub struct Function(Arc<dyn Callable>);

impl Function {
    pub fn from_callable(callable: impl Callable + 'static) -> Self {
        Self(Arc::new(callable))
    }

    pub fn native<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::from_callable(NativeFunction::new(name, f))
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        self.0.call(this, args)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const u8,
            Arc::as_ptr(&other.0) as *const u8,
        )
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Function").field(&self.name()).finish()
    }
}

/// A Rust closure exposed as a function value
pub struct NativeFunction<F> {
    name: CompactString,
    f: F,
}

impl<F> NativeFunction<F>
where
    F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync,
{
    pub fn new(name: &str, f: F) -> Self {
        Self {
            name: CompactString::new(name),
            f,
        }
    }
}

impl<F> Callable for NativeFunction<F>
where
    F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync,
{
    fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        (self.f)(this, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
