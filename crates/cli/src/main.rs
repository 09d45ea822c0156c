//! waitfor - block until a port, HTTP endpoint or command reaches the expected state

mod args;
mod commands;
mod logging;
mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, warn};

use waitfor_core::application::cancel_channel;
use waitfor_core::port::DiagnosticSink;
use waitfor_core::{CancelReason, ConditionPoller};
use waitfor_infra_system::{TracingSink, WriterSink};

use args::{Cli, Commands, PollArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.poll.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(output::EXIT_USAGE)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let poll = cli.poll;
    let sink = diagnostic_sink(&poll);

    let mut plan = match cli.command {
        Some(Commands::Sh { shell, program }) => {
            commands::shell(&shell.or(cli.shell), &program, sink)?
        }
        Some(Commands::Port(port)) => commands::port(&port, sink)?,
        Some(Commands::Curl(curl)) => commands::curl(&curl, sink)?,
        None => {
            if cli.program.is_empty() {
                bail!("missing command to wait for, see 'waitfor --help'");
            }
            commands::shell(&cli.shell, &cli.program, sink)?
        }
    };

    let (interrupt, cancel) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, giving up the wait");
            interrupt.cancel(CancelReason::Interrupted);
        }
    });

    if !poll.json {
        output::print_waiting(&plan);
    }

    debug!(
        timeout_ms = %poll.timeout.as_millis(),
        interval_ms = %poll.interval.as_millis(),
        "Polling condition"
    );
    let poller = ConditionPoller::new(poll.interval).with_timeout(poll.timeout);
    let outcome = poller.poll(plan.condition.as_mut(), &cancel).await;

    if poll.json {
        output::print_json(&plan, &outcome).context("Failed to render outcome as JSON")?;
    } else {
        output::print_outcome(&plan, &outcome);
    }

    Ok(output::exit_code(&outcome))
}

/// Where check diagnostics go with `--verbose`
///
/// Plain output shares stdout with the messages; with `--json` the lines are
/// routed through tracing so stdout stays parseable.
fn diagnostic_sink(poll: &PollArgs) -> Option<Arc<dyn DiagnosticSink>> {
    if !poll.verbose {
        return None;
    }
    if poll.json {
        Some(Arc::new(TracingSink))
    } else {
        Some(Arc::new(WriterSink::new(std::io::stdout())))
    }
}
