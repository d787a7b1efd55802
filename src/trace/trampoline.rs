//! Call Trampoline & Result Dispatch
//!
//! A traced function read returns a `Trampoline` in place of the raw
//! function. Invoking it:
//! 1. Records the call arguments on the function's segment
//! 2. Opens a new, empty path (the call boundary)
//! 3. Optionally waits on the async trap before the real call
//! 4. Calls the raw function bound to the raw target
//! 5. Dispatches the result: literal, traceable object, or deferred
//!
//! @module trace/trampoline

use std::sync::Arc;

use compact_str::CompactString;
use tracing::{debug, trace};

use super::path::PathGroup;
use super::types::Shape;
use super::wrap_shared;
use crate::config::TraceOptions;
use crate::error::{Result, TraceError};
use crate::value::{Callable, Deferred, Function, Outcome, Value};

// =============================================================================
// TRAMPOLINE
// =============================================================================

pub(crate) struct Trampoline {
    /// Raw receiver the function was read from
    target: Value,
    key: CompactString,
    function: Function,
    /// Group recorded at read time; its last segment is this function
    group: PathGroup,
    options: Arc<TraceOptions>,
}

impl Trampoline {
    pub(crate) fn new(
        target: Value,
        key: CompactString,
        function: Function,
        group: PathGroup,
        options: Arc<TraceOptions>,
    ) -> Self {
        Self {
            target,
            key,
            function,
            group,
            options,
        }
    }
}

impl Callable for Trampoline {
    fn call(&self, _this: &Value, args: &[Value]) -> Result<Value> {
        let group = self.group.with_call(args);

        if let Some(gate) = self.options.trap(&self.target, &self.key, &group) {
            debug!(path = %group, "Call gated by async trap");
            return Ok(Value::Deferred(gated_call(
                gate,
                self.target.clone(),
                self.function.clone(),
                args.to_vec(),
                group,
                self.options.clone(),
            )));
        }

        trace!(path = %group, "Invoking traced function");
        // Synchronous throws propagate untouched and are never reported
        let result = self.function.call(&self.target, args)?;
        Ok(dispatch(result, group, &self.options))
    }

    fn name(&self) -> &str {
        self.function.name()
    }
}

/// Deferred call that runs once `gate` settles, whatever its outcome
fn gated_call(
    gate: Deferred,
    target: Value,
    function: Function,
    args: Vec<Value>,
    group: PathGroup,
    options: Arc<TraceOptions>,
) -> Deferred {
    Deferred::new(async move {
        if let Err(reason) = gate.await {
            trace!(reason = %reason, "Async trap rejected, calling anyway");
        }

        let result = function
            .call(&target, &args)
            .map_err(TraceError::into_reason)?;

        let outcome = match result {
            Value::Deferred(inner) => inner.settled().await,
            other => Ok(other),
        };
        let report = group.completed();
        deliver(outcome, group, report, &options).await
    })
}

// =============================================================================
// RESULT DISPATCH
// =============================================================================

/// Route a synchronous call result
///
/// `group` is the post-call group: its last path is the empty one opened
/// by the call boundary.
fn dispatch(result: Value, group: PathGroup, options: &Arc<TraceOptions>) -> Value {
    match Shape::of(&result) {
        Shape::Deferred => match result {
            Value::Deferred(deferred) => {
                let report = group.completed();
                Value::Deferred(settle(deferred, group, report, options.clone()))
            }
            other => other,
        },
        Shape::Mapping | Shape::Sequence => {
            trace!(path = %group, "Following call result");
            wrap_shared(result, options.clone(), group)
        }
        // Functions returned from calls are handed back raw
        Shape::Primitive | Shape::OpaqueBinary | Shape::Function => {
            let report = group.completed();
            debug!(path = %report, value = %result, "Call returned literal");
            options.report(&report, &result);
            result
        }
    }
}

/// Chain the tracer onto a deferred result
///
/// `open` is the group later reads on a resolved object extend; `report`
/// is the group announced when the deferred settles.
pub(crate) fn settle(
    deferred: Deferred,
    open: PathGroup,
    report: PathGroup,
    options: Arc<TraceOptions>,
) -> Deferred {
    Deferred::new(async move {
        let outcome = deferred.settled().await;
        deliver(outcome, open, report, &options).await
    })
}

/// Report a settled outcome and produce what the awaiting caller receives
///
/// Rejections are reported and re-raised. A traceable object is reported
/// once as it reaches the caller, then handed over wrapped so later reads
/// continue the same group. Anything else is reported and passed through.
async fn deliver(
    outcome: Outcome,
    open: PathGroup,
    report: PathGroup,
    options: &Arc<TraceOptions>,
) -> Outcome {
    options.side_effect(&open, outcome.as_ref().err()).await;

    match outcome {
        Err(reason) => {
            debug!(path = %report, reason = %reason, "Deferred call rejected");
            options.report(&report, &reason);
            Err(reason)
        }
        Ok(value) if Shape::of(&value).is_traceable() => {
            debug!(path = %report, "Deferred call resolved to object");
            options.report(&report, &value);
            Ok(wrap_shared(value, options.clone(), open))
        }
        Ok(value) => {
            debug!(path = %report, value = %value, "Deferred call resolved");
            options.report(&report, &value);
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{wrap, Kind, PathSegment};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

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
    fn test_call_args_recorded() {
        let (options, calls) = recording();
        let root = Value::object([(
            "nested",
            Value::object([("fn", Value::function("fn", |_, _| Ok(Value::from("world"))))]),
        )]);
        let traced = wrap(root, &options);

        let result = traced.get("nested").get("fn").call(vec![Value::from("da")]).unwrap();
        assert_eq!(result, Value::from("world"));

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            PathGroup::from(vec![vec![
                PathSegment::access("nested", Kind::Object),
                PathSegment::call("fn", vec![Value::from("da")]),
            ]])
        );
    }

    #[test]
    fn test_receiver_is_raw_target() {
        let (options, _) = recording();
        let raw = Value::object([("count", Value::from(1))]);
        raw.set(
            "bump",
            Value::function("bump", |this, _| {
                let next = this.get("count").as_f64().unwrap_or(0.0) + 1.0;
                this.set("count", Value::from(next));
                Ok(Value::from(next))
            }),
        );
        let traced = wrap(raw.clone(), &options);

        // The receiver passed at call time is ignored in favour of the target
        let bump = traced.get("bump");
        assert_eq!(bump.call_with_this(&Value::Null, &[]).unwrap(), Value::from(2));
        assert_eq!(raw.get("count"), Value::from(2));
    }

    #[test]
    fn test_sync_throw_propagates_unreported() {
        let (options, calls) = recording();
        let root = Value::object([(
            "fail",
            Value::function("fail", |_, _| Err(TraceError::thrown("sync"))),
        )]);
        let traced = wrap(root, &options);

        let err = traced.get("fail").call(vec![]).unwrap_err();
        assert!(matches!(err, TraceError::Thrown(_)));
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_function_result_returned_raw() {
        let (options, calls) = recording();
        let inner = Value::function("inner", |_, _| Ok(Value::from(1)));
        let returned = inner.clone();
        let root = Value::object([(
            "factory",
            Value::function("factory", move |_, _| Ok(returned.clone())),
        )]);
        let traced = wrap(root, &options);

        let result = traced.get("factory").call(vec![]).unwrap();
        assert_eq!(result, inner);
        assert_eq!(calls.lock()[0].0.to_string(), "factory()");
    }

    #[test]
    fn test_sync_object_result_continues_group() {
        let (options, calls) = recording();
        let root = Value::object([(
            "nested",
            Value::object([(
                "fn",
                Value::function("fn", |_, _| Ok(Value::object([("hello", Value::from("world"))]))),
            )]),
        )]);
        let traced = wrap(root, &options);

        let result = traced.get("nested").get("fn").call(vec![Value::from("someArg")]).unwrap();
        assert!(calls.lock().is_empty());
        assert_eq!(result.get("hello"), Value::from("world"));

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            PathGroup::from(vec![
                vec![
                    PathSegment::access("nested", Kind::Object),
                    PathSegment::call("fn", vec![Value::from("someArg")]),
                ],
                vec![PathSegment::access("hello", Kind::String)],
            ])
        );
    }

    #[test]
    fn test_sync_binary_result_is_literal() {
        let (options, calls) = recording();
        let data = Value::bytes(vec![0x30]);
        let returned = data.clone();
        let root = Value::object([(
            "read",
            Value::function("read", move |_, _| Ok(returned.clone())),
        )]);
        let traced = wrap(root, &options);

        assert_eq!(traced.get("read").call(vec![]).unwrap(), data);
        assert_eq!(calls.lock()[0].1, data);
    }

    #[test]
    fn test_stop_after_call_reports_boundary() {
        let (options, calls) = recording();
        let result_obj = Value::object([("name", Value::from("yury"))]);
        let returned = result_obj.clone();
        let root = Value::object([(
            "open",
            Value::function("open", move |_, _| Ok(returned.clone())),
        )]);
        let traced = wrap(root, &options);

        let opened = traced.get("open").call(vec![Value::from("a")]).unwrap();
        assert!(opened.get("missing").is_undefined());

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.to_string(), "open(\"a\")");
        assert_eq!(calls[0].1, result_obj);
    }

    #[tokio::test]
    async fn test_deferred_literal() {
        let (options, calls) = recording();
        let root = Value::object([(
            "fn",
            Value::async_function("fn", |_, _| async { Ok(Value::from(5)) }),
        )]);
        let traced = wrap(root, &options);

        let pending = traced.get("fn").call(vec![Value::from("someArg")]).unwrap();
        assert_eq!(pending.into_deferred().unwrap().await.unwrap(), Value::from(5));

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.to_string(), "fn(\"someArg\")");
        assert_eq!(calls[0].1, Value::from(5));
    }

    #[tokio::test]
    async fn test_deferred_rejection_reported_and_reraised() {
        let (options, calls) = recording();
        let reason = Value::error("Bad error!");
        let rejected = reason.clone();
        let root = Value::object([(
            "goto",
            Value::async_function("goto", move |_, _| {
                let rejected = rejected.clone();
                async move { Err(rejected) }
            }),
        )]);
        let traced = wrap(root, &options);

        let pending = traced.get("goto").call(vec![]).unwrap();
        assert_eq!(pending.into_deferred().unwrap().await.unwrap_err(), reason);

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, reason);
    }

    #[tokio::test]
    async fn test_side_effect_runs_before_report() {
        let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let report_order = order.clone();
        let effect_order = order.clone();
        let effect_groups = Arc::new(AtomicUsize::new(0));
        let effect_len = effect_groups.clone();

        let options = TraceOptions::new()
            .callback(move |_, _| report_order.lock().push("report"))
            .async_result_side_effect(move |group, _| {
                effect_len.store(group.len(), Ordering::SeqCst);
                let effect_order = effect_order.clone();
                async move {
                    tokio::task::yield_now().await;
                    effect_order.lock().push("side-effect");
                }
            });
        let root = Value::object([(
            "fn",
            Value::async_function("fn", |_, _| async { Ok(Value::from(1)) }),
        )]);
        let traced = wrap(root, &options);

        let pending = traced.get("fn").call(vec![]).unwrap();
        pending.into_deferred().unwrap().await.unwrap();

        assert_eq!(*order.lock(), vec!["side-effect", "report"]);
        // The side effect sees the open group, trailing empty path included
        assert_eq!(effect_groups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_side_effect_sees_rejection_before_report() {
        let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let seen = Arc::new(Mutex::new(Vec::<(usize, Option<Value>)>::new()));
        let report_order = order.clone();
        let effect_order = order.clone();
        let effect_seen = seen.clone();

        let options = TraceOptions::new()
            .callback(move |_, _| report_order.lock().push("report"))
            .async_result_side_effect(move |group, error| {
                effect_seen.lock().push((group.len(), error.cloned()));
                let effect_order = effect_order.clone();
                async move {
                    tokio::task::yield_now().await;
                    effect_order.lock().push("side-effect");
                }
            });
        let reason = Value::error("x");
        let rejected = reason.clone();
        let root = Value::object([(
            "f",
            Value::async_function("f", move |_, _| {
                let rejected = rejected.clone();
                async move { Err(rejected) }
            }),
        )]);
        let traced = wrap(root, &options);

        let pending = traced.get("f").call(vec![]).unwrap();
        assert_eq!(pending.into_deferred().unwrap().await.unwrap_err(), reason);

        assert_eq!(*order.lock(), vec!["side-effect", "report"]);
        assert_eq!(*seen.lock(), vec![(2, Some(reason))]);
    }

    #[tokio::test]
    async fn test_deferred_property_keeps_open_path() {
        let (options, calls) = recording();
        let root = Value::object([(
            "ready",
            Value::Deferred(Deferred::resolved(Value::object([("id", Value::from(3))]))),
        )]);
        let traced = wrap(root, &options);

        let ready = traced.get("ready").into_deferred().unwrap().await.unwrap();
        assert_eq!(ready.get("id"), Value::from(3));

        let calls = calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0.to_string(), "ready");
        assert_eq!(calls[1].0.to_string(), "ready.id");
    }
}
