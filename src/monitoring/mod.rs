/*!
 * Monitoring
 * Typed kernel events, event sinks and structured tracing
 */

mod bus;
mod events;
mod tracer;

pub use bus::{EventBus, EventSink, NullSink, RecordingSink};
pub use events::{Category, EventRecord, KernelEvent, Severity};
pub use tracer::{generate_trace_id, init_tracing, CommandSpan};
