// Poll Outcome Domain Model

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Why a wait was cut short before its condition became true
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// A deadline attached to the cancellation token expired
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The process received an interrupt (Ctrl-C / SIGINT)
    #[error("interrupted")]
    Interrupted,

    /// Canceled by the caller, with a free-form cause
    #[error("{0}")]
    Requested(String),
}

/// Terminal failure of a poll operation
///
/// `TimedOut` and `Canceled` both end the loop without success but are kept
/// apart so callers can tell "ran out of time" from "was told to stop".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("timeout exceeded")]
    TimedOut,

    #[error("canceled: {0}")]
    Canceled(CancelReason),
}

impl PollError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::TimedOut)
    }
}

/// Statistics of a poll operation whose condition was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollStats {
    /// Number of condition evaluations, including the final successful one
    pub evaluations: u32,
    /// Wall time from entry until the condition reported true
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
