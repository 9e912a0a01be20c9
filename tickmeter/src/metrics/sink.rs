use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::code::core::MethodRef;

/// One timed invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeSample {
    pub callable: MethodRef,
    pub elapsed_ms: f64,
    pub failed: bool,
}

/// Receiver of invocation timings.
///
/// `record` is called from whatever thread ran the callable, possibly from
/// many threads at once.
pub trait MetricsSink: Send + Sync {
    fn record(&self, sample: &InvokeSample);
}

impl<T: MetricsSink + ?Sized> MetricsSink for Arc<T> {
    fn record(&self, sample: &InvokeSample) {
        (**self).record(sample)
    }
}

static INSTALLED_SINK: RwLock<Option<Arc<dyn MetricsSink>>> = RwLock::new(None);

/// Make `sink` the process-wide receiver, replacing any previous one.
pub fn install_sink(sink: Arc<dyn MetricsSink>) {
    let mut slot = INSTALLED_SINK
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = Some(sink);
}

pub fn clear_sink() {
    let mut slot = INSTALLED_SINK
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = None;
}

/// Currently installed sink, if any.
pub fn sink() -> Option<Arc<dyn MetricsSink>> {
    INSTALLED_SINK
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}
