//! Registry of patches waiting for the readiness gate
//!
//! Patches are applied as soon as `prepare` lets them through. Delayed ones
//! stay pending while the host is starting and are applied when
//! `on_server_started` opens the gate.

use tracing::{debug, info};

use crate::{
    gate::{GateDecision, ReadinessGate, SERVER_STARTED},
    host::MethodHost,
    patching::{apply, MethodReport, Patch},
};

#[derive(Default)]
pub struct DelayedPatches {
    pending: Vec<Box<dyn Patch>>,
    applied: Vec<String>,
}

impl DelayedPatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, patch: Box<dyn Patch>) {
        debug!("Registered patch {}", patch.name());
        self.pending.push(patch);
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|patch| patch.name())
    }

    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    /// Apply every pending patch the gate lets through.
    pub fn apply_ready(
        &mut self,
        gate: &ReadinessGate,
        host: &mut dyn MethodHost,
    ) -> Vec<MethodReport> {
        let mut reports = Vec::new();
        let mut still_pending = Vec::new();

        for patch in self.pending.drain(..) {
            match patch.prepare(gate) {
                GateDecision::Proceed => {
                    reports.extend(apply(patch.as_ref(), host));
                    self.applied.push(patch.name().to_string());
                }
                GateDecision::Defer => still_pending.push(patch),
            }
        }

        self.pending = still_pending;
        reports
    }

    /// Open the gate and apply what was waiting for it.
    pub fn on_server_started(
        &mut self,
        gate: &ReadinessGate,
        host: &mut dyn MethodHost,
    ) -> Vec<MethodReport> {
        gate.mark_ready();
        let already_applied = self.applied.len();
        let reports = self.apply_ready(gate, host);
        info!(
            "Applied {} delayed patch(es) to {} method(s) upon server start",
            self.applied.len() - already_applied,
            reports.len()
        );
        reports
    }

    /// [`apply_ready`](Self::apply_ready) against [`SERVER_STARTED`].
    pub fn apply_pending(&mut self, host: &mut dyn MethodHost) -> Vec<MethodReport> {
        self.apply_ready(&SERVER_STARTED, host)
    }

    /// [`on_server_started`](Self::on_server_started) for [`SERVER_STARTED`].
    pub fn server_started(&mut self, host: &mut dyn MethodHost) -> Vec<MethodReport> {
        self.on_server_started(&SERVER_STARTED, host)
    }
}
