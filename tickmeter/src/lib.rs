//! Invoke timing instrumentation through instruction-stream rewriting
//!
//! The crate finds `ldloc.s <InvokeAction>; ldfld action; callvirt Invoke`
//! sequences in a host method body and collapses the last two instructions
//! into a single call to [`metrics::invoke_wrapper`], which times the
//! invocation and reports it to a [`metrics::MetricsSink`].
//!
//! - `code`: instruction model, template matching and splicing
//! - `patching`: the patch trait, the sequence patch and `apply`
//! - `schedule`: patches deferred until the readiness gate opens
//! - `gate`: the one-way readiness gate
//! - `host`: the method host boundary
//! - `metrics`: timing wrapper, sink and aggregate store
//!
//! # Example Usage
//!
//! ```no_run
//! use tickmeter::{apply, invoke_timing_patch, InMemoryHost, PatchConfig};
//!
//! let config = PatchConfig { delayed: false, ..PatchConfig::default() };
//! let patch = invoke_timing_patch(&config)?;
//! let mut host = InMemoryHost::new();
//! // host.insert(body_read_from_the_host);
//! for report in apply(&patch, &mut host) {
//!     println!("{}: {} replacement(s)", report.method, report.replacements);
//! }
//! # Ok::<(), tickmeter::PatchError>(())
//! ```

pub mod code;
pub mod error;
pub mod gate;
pub mod host;
pub mod metrics;
pub mod patching;
pub mod schedule;
pub mod types;

pub use code::{
    find_all, find_next, rewrite_all, Instruction, Label, MethodBody, MethodRef, Opcode, Operand,
    OperandRule, SequencePattern, SpliceRule, Template,
};
pub use error::{HostError, PatchError, Result};
pub use gate::{GateDecision, Readiness, ReadinessGate, SERVER_STARTED};
pub use host::{InMemoryHost, MethodHost};
pub use metrics::{invoke_and_time, invoke_wrapper, InvokeSample, InvokeTimings, MetricsSink};
pub use patching::{
    apply, invoke_timing_patch, MethodReport, Patch, PatchOutcome, PatchStatus, SequencePatch,
};
pub use schedule::DelayedPatches;
pub use types::PatchConfig;
