//! Timed invocation of instrumented callables
//!
//! `invoke_wrapper` is what a patched method calls instead of loading
//! `InvokeAction::action` and invoking it. All timing state lives in an
//! [`InvokeTimer`] created for the single call it measures, so concurrent and
//! re-entrant invocations never share a clock or a failure flag.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Instant,
};

use tracing::warn;

use crate::{
    code::core::MethodRef,
    metrics::sink::{self, InvokeSample, MetricsSink},
};

/// Measures one invocation and reports it exactly once when dropped.
///
/// A timer counts as failed until [`InvokeTimer::finish`] records a
/// successful outcome, so a callable that unwinds is reported as failed.
/// A panicking sink is caught and logged instead of escaping `drop`.
pub struct InvokeTimer<'a> {
    callable: &'a MethodRef,
    sink: Option<&'a dyn MetricsSink>,
    started: Instant,
    failed: bool,
}

impl<'a> InvokeTimer<'a> {
    /// Report to the process-wide sink, looked up when the call ends.
    pub fn start(callable: &'a MethodRef) -> Self {
        InvokeTimer {
            callable,
            sink: None,
            started: Instant::now(),
            failed: true,
        }
    }

    pub fn start_with(callable: &'a MethodRef, sink: &'a dyn MetricsSink) -> Self {
        InvokeTimer {
            callable,
            sink: Some(sink),
            started: Instant::now(),
            failed: true,
        }
    }

    /// Record how the call ended. Never called when the callable unwinds.
    pub fn finish(&mut self, succeeded: bool) {
        self.failed = !succeeded;
    }

    fn sample(&self) -> InvokeSample {
        InvokeSample {
            callable: self.callable.clone(),
            elapsed_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            failed: self.failed,
        }
    }
}

impl Drop for InvokeTimer<'_> {
    fn drop(&mut self) {
        let sample = self.sample();
        let recorded = panic::catch_unwind(AssertUnwindSafe(|| match self.sink {
            Some(sink) => sink.record(&sample),
            None => {
                if let Some(sink) = sink::sink() {
                    sink.record(&sample);
                }
            }
        }));
        if recorded.is_err() {
            warn!("[ServerMetrics]: Sink panicked while recording {}", sample.callable);
        }
    }
}

/// Run `callable`, report its duration to the process-wide sink, and hand
/// its result back untouched.
pub fn invoke_and_time<E>(
    identity: &MethodRef,
    callable: impl FnOnce() -> Result<(), E>,
) -> Result<(), E> {
    let mut timer = InvokeTimer::start(identity);
    let result = callable();
    timer.finish(result.is_ok());
    drop(timer);
    result
}

/// [`invoke_and_time`] reporting to an explicit sink.
pub fn invoke_and_time_with<E>(
    sink: &dyn MetricsSink,
    identity: &MethodRef,
    callable: impl FnOnce() -> Result<(), E>,
) -> Result<(), E> {
    let mut timer = InvokeTimer::start_with(identity, sink);
    let result = callable();
    timer.finish(result.is_ok());
    drop(timer);
    result
}

type ActionFn = dyn Fn() -> anyhow::Result<()> + Send + Sync;

/// Zero-argument callable scheduled by the host, identified by the method it
/// was created from.
#[derive(Clone)]
pub struct Action {
    method: MethodRef,
    body: Arc<ActionFn>,
}

impl Action {
    pub fn new(
        method: MethodRef,
        body: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Action {
            method,
            body: Arc::new(body),
        }
    }

    pub fn method(&self) -> &MethodRef {
        &self.method
    }

    pub fn invoke(&self) -> anyhow::Result<()> {
        (self.body)()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Scheduled invocation entry as the host stores it.
#[derive(Debug, Clone)]
pub struct InvokeAction {
    pub action: Action,
}

impl InvokeAction {
    pub fn new(action: Action) -> Self {
        InvokeAction { action }
    }
}

/// Replacement call target installed by the invoke timing patch.
pub fn invoke_wrapper(invoke_action: &InvokeAction) -> anyhow::Result<()> {
    let action = &invoke_action.action;
    invoke_and_time(action.method(), || action.invoke())
}

#[cfg(test)]
mod tests {
    use std::{
        panic::{self, AssertUnwindSafe},
        sync::Mutex,
        thread,
        time::Duration,
    };

    use thiserror::Error;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<InvokeSample>>);

    impl Recorder {
        fn samples(&self) -> Vec<InvokeSample> {
            self.0.lock().unwrap().clone()
        }
    }

    impl MetricsSink for Recorder {
        fn record(&self, sample: &InvokeSample) {
            self.0.lock().unwrap().push(sample.clone());
        }
    }

    #[derive(Debug, Error, PartialEq)]
    #[error("entity destroyed: {0}")]
    struct EntityDestroyed(u32);

    fn identity() -> MethodRef {
        MethodRef::new("BaseEntity", "Think")
    }

    #[test]
    fn success_reports_one_sample() {
        let recorder = Recorder::default();
        let result: Result<(), EntityDestroyed> =
            invoke_and_time_with(&recorder, &identity(), || {
                thread::sleep(Duration::from_millis(5));
                Ok(())
            });

        assert!(result.is_ok());
        let samples = recorder.samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].callable, identity());
        assert!(!samples[0].failed);
        assert!(samples[0].elapsed_ms >= 5.0);
    }

    #[test]
    fn error_is_returned_unchanged_after_reporting() {
        let recorder = Recorder::default();
        let result = invoke_and_time_with(&recorder, &identity(), || Err(EntityDestroyed(42)));

        assert_eq!(result, Err(EntityDestroyed(42)));
        let samples = recorder.samples();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].failed);
    }

    #[test]
    fn panic_keeps_unwinding_after_reporting() {
        let recorder = Recorder::default();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), ()> = invoke_and_time_with(&recorder, &identity(), || {
                panic!("think loop exploded")
            });
        }));

        let payload = outcome.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"think loop exploded"));
        let samples = recorder.samples();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].failed);
    }

    struct FlushOnDrop<'a>(&'a Recorder);

    impl Drop for FlushOnDrop<'_> {
        fn drop(&mut self) {
            let result: Result<(), EntityDestroyed> =
                invoke_and_time_with(self.0, &identity(), || Ok(()));
            assert!(result.is_ok());
        }
    }

    #[test]
    fn success_during_unrelated_unwind_is_not_a_failure() {
        let recorder = Recorder::default();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _flush = FlushOnDrop(&recorder);
            panic!("unrelated");
        }));

        assert!(outcome.is_err());
        let samples = recorder.samples();
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].failed);
    }

    struct ExplodingSink;

    impl MetricsSink for ExplodingSink {
        fn record(&self, _sample: &InvokeSample) {
            panic!("sink exploded");
        }
    }

    #[test]
    fn panicking_sink_does_not_escape() {
        let result: Result<(), EntityDestroyed> =
            invoke_and_time_with(&ExplodingSink, &identity(), || Ok(()));
        assert!(result.is_ok());

        let outcome = panic::catch_unwind(|| {
            let _: Result<(), ()> = invoke_and_time_with(&ExplodingSink, &identity(), || {
                panic!("think loop exploded")
            });
        });
        let payload = outcome.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"think loop exploded"));
    }

    #[test]
    fn reentrant_calls_are_timed_separately() {
        let recorder = Recorder::default();
        let inner = MethodRef::new("BaseEntity", "Inner");

        let result: Result<(), ()> = invoke_and_time_with(&recorder, &identity(), || {
            invoke_and_time_with(&recorder, &inner, || {
                thread::sleep(Duration::from_millis(2));
                Ok(())
            })
        });

        assert!(result.is_ok());
        let samples = recorder.samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].callable, inner);
        assert_eq!(samples[1].callable, identity());
        assert!(samples[1].elapsed_ms >= samples[0].elapsed_ms);
    }

    #[test]
    fn concurrent_calls_each_report_once() {
        let recorder = Recorder::default();
        thread::scope(|scope| {
            for i in 0..8u64 {
                let recorder = &recorder;
                scope.spawn(move || {
                    let result: Result<(), EntityDestroyed> =
                        invoke_and_time_with(recorder, &identity(), || {
                            thread::sleep(Duration::from_millis(i));
                            if i % 2 == 0 {
                                Ok(())
                            } else {
                                Err(EntityDestroyed(i as u32))
                            }
                        });
                    assert_eq!(result.is_err(), i % 2 == 1);
                });
            }
        });

        let samples = recorder.samples();
        assert_eq!(samples.len(), 8);
        assert_eq!(samples.iter().filter(|sample| sample.failed).count(), 4);
    }

    #[test]
    fn wrapper_without_sink_still_invokes() {
        let action = Action::new(MethodRef::new("BaseNetworkable", "Untimed"), || {
            Err(anyhow::anyhow!("kicked"))
        });

        // No assumption about the process-wide sink here, only transparency
        let err = invoke_wrapper(&InvokeAction::new(action)).unwrap_err();
        assert_eq!(err.to_string(), "kicked");
    }
}
