// waitfor Core - Poll Loop & Ports
// NO infrastructure dependencies: condition sources live in infra-system

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::poller::{
    poll_until_canceled, poll_with_timeout, poll_with_timeout_and_cancel, ConditionPoller,
};
pub use domain::{CancelReason, PollError, PollStats};
pub use error::AppError;
