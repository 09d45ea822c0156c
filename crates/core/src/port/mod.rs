// Port Layer - Interfaces the poller consumes and condition sources implement

pub mod condition;
pub mod diagnostic_sink;

// Re-exports
pub use condition::{from_async_fn, from_fn, not, AsyncFnCondition, Condition, FnCondition, Not};
pub use diagnostic_sink::DiagnosticSink;
