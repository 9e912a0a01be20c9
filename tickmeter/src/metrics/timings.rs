use std::{collections::HashMap, sync::Mutex};

use serde::Serialize;

use crate::{
    code::core::MethodRef,
    metrics::sink::{InvokeSample, MetricsSink},
};

/// Aggregate of every sample recorded for one callable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvokeStats {
    pub count: u64,
    pub failures: u64,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl InvokeStats {
    fn add(&mut self, sample: &InvokeSample) {
        self.count += 1;
        if sample.failed {
            self.failures += 1;
        }
        self.total_ms += sample.elapsed_ms;
        if sample.elapsed_ms > self.max_ms {
            self.max_ms = sample.elapsed_ms;
        }
    }

    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// Per-callable invocation timings, safe to feed from many threads.
#[derive(Debug, Default)]
pub struct InvokeTimings {
    stats: Mutex<HashMap<MethodRef, InvokeStats>>,
}

impl InvokeTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, callable: &MethodRef) -> Option<InvokeStats> {
        self.lock().get(callable).cloned()
    }

    /// All callables, most total time first.
    pub fn snapshot(&self) -> Vec<(MethodRef, InvokeStats)> {
        let mut entries = self
            .lock()
            .iter()
            .map(|(callable, stats)| (callable.clone(), stats.clone()))
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| b.1.total_ms.total_cmp(&a.1.total_ms));
        entries
    }

    /// Take everything recorded so far and start over.
    pub fn drain(&self) -> Vec<(MethodRef, InvokeStats)> {
        let mut entries = self.lock().drain().collect::<Vec<_>>();
        entries.sort_by(|a, b| b.1.total_ms.total_cmp(&a.1.total_ms));
        entries
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MethodRef, InvokeStats>> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricsSink for InvokeTimings {
    fn record(&self, sample: &InvokeSample) {
        self.lock()
            .entry(sample.callable.clone())
            .or_default()
            .add(sample);
    }
}
