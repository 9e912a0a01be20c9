use std::{
    backtrace::Backtrace,
    panic::{self, AssertUnwindSafe},
};

use tracing::{error, info, warn};

use crate::{
    code::{
        analysis::SequencePattern,
        core::{MethodBody, MethodRef},
        modification::{rewrite_all, SpliceRule},
        utils::debug_print_body,
    },
    error::{PatchError, Result},
    gate::{GateDecision, ReadinessGate},
    host::MethodHost,
    types::PatchConfig,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchStatus {
    Patched,
    /// Nothing matched; the target's shape may have changed upstream
    NoMatch,
    /// The body lacks a local the template needs
    TemplateNotInstantiated,
    Failed(String),
}

/// Result of transpiling one body. On anything but `Patched` the body is the
/// one that came in.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub body: MethodBody,
    pub replacements: usize,
    pub status: PatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodReport {
    pub patch: String,
    pub method: MethodRef,
    pub replacements: usize,
    pub status: PatchStatus,
    pub installed: bool,
}

pub trait Patch {
    fn name(&self) -> &str;

    /// Delayed patches are only applied once the readiness gate is open.
    fn is_delayed(&self) -> bool {
        false
    }

    fn prepare(&self, gate: &ReadinessGate) -> GateDecision {
        if self.is_delayed() {
            gate.authorize(self.name())
        } else {
            GateDecision::Proceed
        }
    }

    fn target_methods(&self) -> Vec<MethodRef>;

    fn transpile(&self, body: MethodBody) -> PatchOutcome;
}

/// Rewrites every occurrence of one instruction pattern with a splice rule.
#[derive(Debug, Clone)]
pub struct SequencePatch {
    name: String,
    targets: Vec<MethodRef>,
    pattern: SequencePattern,
    splice: SpliceRule,
    delayed: bool,
}

impl SequencePatch {
    pub fn new(
        name: impl Into<String>,
        targets: Vec<MethodRef>,
        pattern: SequencePattern,
        splice: SpliceRule,
    ) -> Result<Self> {
        if pattern.steps.is_empty() {
            return Err(PatchError::EmptyTemplate);
        }
        splice.validate(pattern.steps.len())?;
        Ok(SequencePatch {
            name: name.into(),
            targets,
            pattern,
            splice,
            delayed: false,
        })
    }

    pub fn delayed(mut self, delayed: bool) -> Self {
        self.delayed = delayed;
        self
    }

    fn rewrite(&self, body: &mut MethodBody) -> Result<usize> {
        let template = self.pattern.instantiate(body)?;
        rewrite_all(body, &template, &self.splice)
    }
}

/// The patch that routes every scheduled invoke through the timing wrapper.
pub fn invoke_timing_patch(config: &PatchConfig) -> Result<SequencePatch> {
    Ok(SequencePatch::new(
        config.name.clone(),
        vec![config.target.clone()],
        config.pattern(),
        config.splice_rule()?,
    )?
    .delayed(config.delayed))
}

impl Patch for SequencePatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_delayed(&self) -> bool {
        self.delayed
    }

    fn target_methods(&self) -> Vec<MethodRef> {
        self.targets.clone()
    }

    fn transpile(&self, body: MethodBody) -> PatchOutcome {
        guarded_rewrite(&self.name, body, |working| self.rewrite(working))
    }
}

/// Run `rewrite` on a copy of `body` and keep the copy only if it succeeded
/// with at least one replacement. Errors and panics leave `body` untouched.
fn guarded_rewrite(
    name: &str,
    body: MethodBody,
    rewrite: impl FnOnce(&mut MethodBody) -> Result<usize>,
) -> PatchOutcome {
    let mut working = body.clone();
    let result = panic::catch_unwind(AssertUnwindSafe(|| rewrite(&mut working)));

    let (failure, backtrace) = match result {
        Ok(Ok(0)) => {
            warn!(
                "[ServerMetrics]: Failed to find any replacement sequences for {} - skipping patch (game code may have changed)",
                name
            );
            warn!(
                "[ServerMetrics]: Total instructions in method: {}",
                working.len()
            );
            return PatchOutcome {
                body,
                replacements: 0,
                status: PatchStatus::NoMatch,
            };
        }
        Ok(Ok(replacements)) => {
            info!(
                "[ServerMetrics]: Successfully patched {} call(s) in {}",
                replacements, name
            );
            info!(
                "[ServerMetrics]: Transpiled {} now has {} instructions",
                working.method,
                working.len()
            );
            debug_print_body(&working);
            return PatchOutcome {
                body: working,
                replacements,
                status: PatchStatus::Patched,
            };
        }
        Ok(Err(PatchError::MissingLocal { method, local_type })) => {
            error!(
                "[ServerMetrics]: Failed to find {} local variable in {} ({})",
                local_type, name, method
            );
            return PatchOutcome {
                body,
                replacements: 0,
                status: PatchStatus::TemplateNotInstantiated,
            };
        }
        Ok(Err(err)) => (err.to_string(), None),
        Err(payload) => (
            PatchError::Panicked(panic_message(payload.as_ref())).to_string(),
            Some(Backtrace::force_capture()),
        ),
    };

    error!("[ServerMetrics]: Exception in {}: {}", name, failure);
    if let Some(backtrace) = backtrace {
        error!("[ServerMetrics]: Stack trace:\n{}", backtrace);
    }
    error!("[ServerMetrics]: Body left untouched: {} instructions", body.len());
    PatchOutcome {
        body,
        replacements: 0,
        status: PatchStatus::Failed(failure),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Transpile every target of `patch` and install the bodies that changed.
///
/// A body the host cannot supply counts as "no match".
pub fn apply(patch: &dyn Patch, host: &mut dyn MethodHost) -> Vec<MethodReport> {
    patch
        .target_methods()
        .into_iter()
        .map(|method| {
            let body = match host.method_body(&method) {
                Ok(body) => body,
                Err(err) => {
                    warn!("[ServerMetrics]: {} cannot read {}: {}", patch.name(), method, err);
                    return MethodReport {
                        patch: patch.name().to_string(),
                        method,
                        replacements: 0,
                        status: PatchStatus::NoMatch,
                        installed: false,
                    };
                }
            };

            let outcome = patch.transpile(body);
            let mut installed = false;
            if outcome.status == PatchStatus::Patched {
                match host.install_body(outcome.body) {
                    Ok(()) => installed = true,
                    Err(err) => {
                        error!("[ServerMetrics]: Failed to install {}: {}", method, err)
                    }
                }
            }

            MethodReport {
                patch: patch.name().to_string(),
                method,
                replacements: outcome.replacements,
                status: outcome.status,
                installed,
            }
        })
        .collect()
}
