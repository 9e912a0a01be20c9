//! Invocation timing: the wrapper installed by the patch, the sink it reports
//! to, and an in-memory aggregate store.

pub mod sink;
pub mod timings;
pub mod wrapper;

pub use sink::{clear_sink, install_sink, sink, InvokeSample, MetricsSink};
pub use timings::{InvokeStats, InvokeTimings};
pub use wrapper::{
    invoke_and_time, invoke_and_time_with, invoke_wrapper, Action, InvokeAction, InvokeTimer,
};
