use std::sync::OnceLock;

use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NotReady,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    /// Not ready yet, the scheduler retries once the host is up.
    Defer,
}

/// One-way `NotReady -> Ready` switch flipped once by host startup.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    ready: OnceLock<()>,
}

/// Set once when the host server has finished starting. Patches scheduled
/// through [`DelayedPatches::apply_pending`](crate::DelayedPatches::apply_pending)
/// wait on it.
pub static SERVER_STARTED: ReadinessGate = ReadinessGate::new();

impl ReadinessGate {
    pub const fn new() -> Self {
        ReadinessGate {
            ready: OnceLock::new(),
        }
    }

    /// Flip to `Ready`. Returns false if the gate was already open.
    pub fn mark_ready(&self) -> bool {
        let opened = self.ready.set(()).is_ok();
        if opened {
            info!("Readiness gate opened");
        }
        opened
    }

    pub fn state(&self) -> Readiness {
        match self.ready.get() {
            Some(()) => Readiness::Ready,
            None => Readiness::NotReady,
        }
    }

    pub fn authorize(&self, patch: &str) -> GateDecision {
        match self.state() {
            Readiness::Ready => {
                debug!("{} authorized", patch);
                GateDecision::Proceed
            }
            Readiness::NotReady => {
                info!(
                    "Note: Cannot patch {} yet. We will patch it upon server start.",
                    patch
                );
                GateDecision::Defer
            }
        }
    }
}
