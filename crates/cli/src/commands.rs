// Builds the condition (and its messages) for each command
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::sync::Arc;

use waitfor_core::port::{from_async_fn, not, Condition, DiagnosticSink};
use waitfor_infra_system::{CommandCheck, HttpCheck, PortCheck, StdinSource};

use crate::args::{split_by_colon, CurlArgs, PortArgs, ShellArgs};

/// A condition ready to be polled, with the messages that frame it
pub struct Plan {
    /// Printed before polling starts
    pub waiting: String,
    /// Printed when the condition holds
    pub success: String,
    /// Prefix of the error line, followed by `: <cause>`
    pub failure: String,
    pub condition: Box<dyn Condition>,
}

/// Which command query the shell flags select
#[derive(Debug, Clone)]
enum ShellQuery {
    Succeeds,
    Fails,
    ExitCode(i32),
    Output(Regex),
}

impl ShellQuery {
    /// Precedence: match, then a non-zero exit code, then fail, then succeed
    fn from_args(args: &ShellArgs) -> Result<Self> {
        if let Some(pattern) = args.pattern.as_deref().filter(|p| !p.is_empty()) {
            let regex =
                Regex::new(pattern).with_context(|| format!("invalid regex '{}'", pattern))?;
            return Ok(Self::Output(regex));
        }
        if args.exit_code != 0 {
            return Ok(Self::ExitCode(args.exit_code));
        }
        if args.fail {
            return Ok(Self::Fails);
        }
        Ok(Self::Succeeds)
    }

    fn state(&self) -> String {
        match self {
            Self::Succeeds => "succeed".to_string(),
            Self::Fails => "fail".to_string(),
            Self::ExitCode(code) => format!("match exit code {}", code),
            Self::Output(regex) => format!("match regex '{}'", regex.as_str()),
        }
    }

    async fn evaluate(&self, check: &CommandCheck) -> bool {
        match self {
            Self::Succeeds => check.succeeds().await,
            Self::Fails => check.fails().await,
            Self::ExitCode(code) => check.matches_exit_code(*code).await,
            Self::Output(regex) => check.matches_output(regex).await,
        }
    }
}

pub fn shell(
    args: &ShellArgs,
    program: &[String],
    sink: Option<Arc<dyn DiagnosticSink>>,
) -> Result<Plan> {
    let Some((cmd, rest)) = program.split_first() else {
        bail!("no command given");
    };

    let query = Arc::new(ShellQuery::from_args(args)?);
    let state = query.state();

    let mut check = CommandCheck::new(cmd.as_str(), rest.iter().cloned());
    check.with_stdin(StdinSource::Inherit);
    if let Some(sink) = sink {
        check.with_sink(sink);
    }
    let check = Arc::new(check);

    let condition = from_async_fn(move || {
        let check = Arc::clone(&check);
        let query = Arc::clone(&query);
        async move { query.evaluate(&check).await }
    });

    Ok(Plan {
        waiting: format!("Waiting for {} to {}", cmd, state),
        success: format!("Success: {} did {}", cmd, state),
        failure: format!("Error waiting for {}", cmd),
        condition: Box::new(condition),
    })
}

pub fn port(args: &PortArgs, sink: Option<Arc<dyn DiagnosticSink>>) -> Result<Plan> {
    let mut check = PortCheck::new(args.port);
    check.on_host(args.host.as_str()).for_network(args.network);
    if let Some(sink) = sink {
        check.with_sink(sink);
    }

    let state = if args.closed { "closed" } else { "open" };
    let waiting = format!("Waiting for {} to be {}...", check.target(), state);

    let check = Arc::new(check);
    let open = from_async_fn(move || {
        let check = Arc::clone(&check);
        async move { check.is_open().await }
    });

    Ok(Plan {
        waiting,
        success: format!("Success: port is {}", state),
        failure: format!("Error waiting for {} port", state),
        condition: boxed_negatable(open, args.closed),
    })
}

pub fn curl(args: &CurlArgs, sink: Option<Arc<dyn DiagnosticSink>>) -> Result<Plan> {
    let check = Arc::new(http_check(args, sink));

    let condition = match args.pattern.as_deref().filter(|p| !p.is_empty()) {
        Some(pattern) => {
            let regex = Arc::new(
                Regex::new(pattern).with_context(|| format!("invalid regex '{}'", pattern))?,
            );
            boxed_negatable(
                from_async_fn(move || {
                    let check = Arc::clone(&check);
                    let regex = Arc::clone(&regex);
                    async move { check.matches_body(&regex).await }
                }),
                args.fail,
            )
        }
        None => {
            let status = args.status;
            boxed_negatable(
                from_async_fn(move || {
                    let check = Arc::clone(&check);
                    async move { check.matches_status(status).await }
                }),
                args.fail,
            )
        }
    };

    let state = if args.fail { "fail" } else { "succeed" };
    Ok(Plan {
        waiting: format!("Waiting for curl to {}...", state),
        success: format!("Success: curl did {}", state),
        failure: format!("Error waiting for curl to {}", state),
        condition,
    })
}

fn http_check(args: &CurlArgs, sink: Option<Arc<dyn DiagnosticSink>>) -> HttpCheck {
    let mut check = HttpCheck::new(args.url.as_str());
    check.with_method(args.method.as_str());

    if let Some(user) = args.user.as_deref().filter(|u| !u.is_empty()) {
        let (username, password) = split_by_colon(user);
        check.with_auth(username, password);
    }

    for (name, value) in request_headers(&args.header) {
        check.with_header(name, value);
    }

    if !args.data.is_empty() {
        check.with_data(args.data.join("&"));
    }

    if let Some(sink) = sink {
        check.with_sink(sink);
    }
    check
}

/// User headers followed by the tool's own user agent
fn request_headers(raw: &[String]) -> Vec<(String, String)> {
    raw.iter()
        .map(|header| {
            let (name, value) = split_by_colon(header);
            (name.trim().to_string(), value.trim().to_string())
        })
        .chain(std::iter::once((
            "user-agent".to_string(),
            format!("waitfor/{}", env!("CARGO_PKG_VERSION")),
        )))
        .collect()
}

fn boxed_negatable<C: Condition + 'static>(condition: C, negate: bool) -> Box<dyn Condition> {
    if negate {
        Box::new(not(condition))
    } else {
        Box::new(condition)
    }
}
