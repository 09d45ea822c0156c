// Domain Layer - Poll outcomes and value types shared by every condition source

pub mod exit_code;
pub mod network;
pub mod outcome;

// Re-exports
pub use exit_code::{normalize_exit_code, LAUNCH_FAILURE_EXIT_CODE};
pub use network::Network;
pub use outcome::{CancelReason, PollError, PollStats};
