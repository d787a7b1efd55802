//! Trace configuration
//!
//! The tracer consults four caller-supplied hooks but implements no policy
//! of its own:
//! - `callback`: receives every completed path group and its value
//! - `should_follow`: decides per access whether to keep tracing
//! - `async_trap`: may gate a traced call behind a pending operation
//! - `async_result_side_effect`: awaited before an async result is reported
//!
//! Hooks are infallible closures. A panic inside one unwinds through the
//! access that triggered it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::trace::PathGroup;
use crate::value::{Deferred, Key, Value};

/// Environment variable holding the `tracing` filter used by the test suite
pub const LOG_ENV: &str = "PROPTRACE_LOG";

pub type Callback = Arc<dyn Fn(&PathGroup, &Value) + Send + Sync>;
pub type FollowPredicate = Arc<dyn Fn(&Value, &Key) -> bool + Send + Sync>;
pub type AsyncTrap = Arc<dyn Fn(&Value, &str, &PathGroup) -> Option<Deferred> + Send + Sync>;
pub type AsyncResultSideEffect =
    Arc<dyn Fn(&PathGroup, Option<&Value>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Hooks the tracer calls out to
///
/// Cloning is cheap: every hook is reference counted.
#[derive(Clone, Default)]
pub struct TraceOptions {
    callback: Option<Callback>,
    should_follow: Option<FollowPredicate>,
    async_trap: Option<AsyncTrap>,
    async_result_side_effect: Option<AsyncResultSideEffect>,
}

impl TraceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive `(group, value)` once per completed traversal unit
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&PathGroup, &Value) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    /// Only trace accesses for which `f(target, key)` holds (default: all)
    pub fn should_follow<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Key) -> bool + Send + Sync + 'static,
    {
        self.should_follow = Some(Arc::new(f));
        self
    }

    /// Gate traced calls: when `f(target, key, group)` yields a deferred,
    /// the real call waits until it settles, whatever its outcome
    pub fn async_trap<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &str, &PathGroup) -> Option<Deferred> + Send + Sync + 'static,
    {
        self.async_trap = Some(Arc::new(f));
        self
    }

    /// Await `f(group, error)` after every asynchronous settlement, before
    /// the result is reported or handed to the caller
    pub fn async_result_side_effect<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&PathGroup, Option<&Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.async_result_side_effect = Some(Arc::new(
            move |group: &PathGroup, error: Option<&Value>| f(group, error).boxed(),
        ));
        self
    }

    // =========================================================================
    // ENGINE-FACING CALLS
    // =========================================================================

    pub(crate) fn report(&self, group: &PathGroup, value: &Value) {
        if let Some(callback) = &self.callback {
            callback(group, value);
        }
    }

    pub(crate) fn follows(&self, target: &Value, key: &Key) -> bool {
        self.should_follow
            .as_ref()
            .map_or(true, |predicate| predicate(target, key))
    }

    pub(crate) fn trap(&self, target: &Value, key: &str, group: &PathGroup) -> Option<Deferred> {
        self.async_trap
            .as_ref()
            .and_then(|trap| trap(target, key, group))
    }

    pub(crate) async fn side_effect(&self, group: &PathGroup, error: Option<&Value>) {
        if let Some(hook) = &self.async_result_side_effect {
            hook(group, error).await;
        }
    }
}

impl fmt::Debug for TraceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceOptions")
            .field("callback", &self.callback.is_some())
            .field("should_follow", &self.should_follow.is_some())
            .field("async_trap", &self.async_trap.is_some())
            .field("async_result_side_effect", &self.async_result_side_effect.is_some())
            .finish()
    }
}
