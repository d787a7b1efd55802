//! Deferred (asynchronous) results
//!
//! A `Deferred` is a cloneable, single-assignment handle to the outcome of
//! an asynchronous operation: it either resolves to a value or rejects
//! with a reason (also a value). Every clone observes the same outcome.
//! Like any Rust future it makes progress only while some clone is being
//! polled.
//!
//! @module value/deferred

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::Value;

/// Settled state of a deferred: `Ok` resolution or `Err` rejection reason
pub type Outcome = std::result::Result<Value, Value>;

#[derive(Clone)]
pub struct Deferred {
    inner: Shared<BoxFuture<'static, Outcome>>,
}

impl Deferred {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Already-resolved deferred
    pub fn resolved(value: Value) -> Self {
        Self::new(futures::future::ready(Ok(value)))
    }

    /// Already-rejected deferred
    pub fn rejected(reason: Value) -> Self {
        Self::new(futures::future::ready(Err(reason)))
    }

    /// The outcome, if some clone has already driven this to completion
    pub fn peek(&self) -> Option<&Outcome> {
        self.inner.peek()
    }

    /// Await the outcome, following resolutions that are themselves deferred
    pub async fn settled(self) -> Outcome {
        let mut current = self;
        loop {
            match current.await {
                Ok(Value::Deferred(next)) => current = next,
                outcome => return outcome,
            }
        }
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl Future for Deferred {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(Ok(value)) => write!(f, "Deferred(resolved: {})", value),
            Some(Err(reason)) => write!(f, "Deferred(rejected: {})", reason),
            None => f.write_str("Deferred(pending)"),
        }
    }
}
