// Application Layer - Poll loop and cancellation

pub mod cancel;
pub mod constants;
pub mod poller;

// Re-exports
pub use cancel::{cancel_channel, CancelSource, CancelToken};
pub use poller::{ConditionPoller, PollRequest};
