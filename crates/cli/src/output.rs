// Outcome rendering and exit codes
use colored::Colorize;
use serde::Serialize;

use waitfor_core::{CancelReason, PollError, PollStats};

use crate::commands::Plan;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
/// 128 + SIGINT, as shells report an interrupted command
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Satisfied,
    TimedOut,
    Canceled,
}

/// Machine-readable outcome printed with `--json`
#[derive(Debug, Serialize)]
struct Report<'a> {
    status: Status,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(flatten)]
    stats: Option<&'a PollStats>,
}

pub fn exit_code(outcome: &Result<PollStats, PollError>) -> u8 {
    match outcome {
        Ok(_) => EXIT_SUCCESS,
        Err(PollError::Canceled(CancelReason::Interrupted)) => EXIT_INTERRUPTED,
        Err(_) => EXIT_FAILURE,
    }
}

/// Line printed once the wait is over
pub fn message(plan: &Plan, outcome: &Result<PollStats, PollError>) -> String {
    match outcome {
        Ok(_) => plan.success.clone(),
        Err(e) => format!("{}: {}", plan.failure, e),
    }
}

pub fn print_waiting(plan: &Plan) {
    println!("{}", plan.waiting);
}

pub fn print_outcome(plan: &Plan, outcome: &Result<PollStats, PollError>) {
    let line = message(plan, outcome);
    match outcome {
        Ok(_) => println!("{}", line.green()),
        Err(_) => println!("{}", line.red()),
    }
}

pub fn print_json(plan: &Plan, outcome: &Result<PollStats, PollError>) -> serde_json::Result<()> {
    println!("{}", render_json(plan, outcome)?);
    Ok(())
}

fn render_json(plan: &Plan, outcome: &Result<PollStats, PollError>) -> serde_json::Result<String> {
    let report = Report {
        status: match outcome {
            Ok(_) => Status::Satisfied,
            Err(PollError::TimedOut) => Status::TimedOut,
            Err(PollError::Canceled(_)) => Status::Canceled,
        },
        message: message(plan, outcome),
        error: outcome.as_ref().err().map(ToString::to_string),
        stats: outcome.as_ref().ok(),
    };
    serde_json::to_string(&report)
}
