// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Poll outcomes have their own type ([`crate::PollError`]); this one covers
/// configuration that cannot be turned into a poll request at all.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
}
