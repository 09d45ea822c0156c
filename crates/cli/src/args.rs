//! Command-line arguments

use clap::{ArgAction, Args, Parser, Subcommand};
use std::time::Duration;

use waitfor_core::domain::Network;

#[derive(Parser, Debug)]
#[command(name = "waitfor")]
#[command(about = "Waits for a given condition before returning", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub poll: PollArgs,

    #[command(flatten)]
    pub shell: ShellArgs,

    /// Command (and arguments) to run when no subcommand is given
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub program: Vec<String>,
}

/// Timing and output flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Maximum time to wait for
    #[arg(
        short,
        long,
        global = true,
        env = "WAITFOR_TIMEOUT",
        default_value = "300s",
        value_parser = parse_duration
    )]
    pub timeout: Duration,

    /// Time in-between checks
    #[arg(
        short,
        long,
        global = true,
        env = "WAITFOR_INTERVAL",
        default_value = "1s",
        value_parser = parse_duration
    )]
    pub interval: Duration,

    /// Enable additional logging
    #[arg(short, long, global = true, env = "WAITFOR_VERBOSE")]
    pub verbose: bool,

    /// Print the outcome as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Flags of the shell condition (root command and `sh`)
#[derive(Args, Debug, Clone, Default)]
pub struct ShellArgs {
    /// Wait for the command to fail
    #[arg(short, long)]
    pub fail: bool,

    /// Match exit code
    #[arg(
        long = "status",
        visible_alias = "rc",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub exit_code: i32,

    /// Match regex against combined output
    #[arg(short, long = "match", value_name = "REGEX")]
    pub pattern: Option<String>,
}

impl ShellArgs {
    /// Flags given to `sh` take over those given before it
    pub fn or(self, fallback: ShellArgs) -> ShellArgs {
        ShellArgs {
            fail: self.fail || fallback.fail,
            exit_code: if self.exit_code != 0 {
                self.exit_code
            } else {
                fallback.exit_code
            },
            pattern: self.pattern.or(fallback.pattern),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for arbitrary shell commands to succeed (or fail)
    #[command(visible_alias = "shell")]
    Sh {
        #[command(flatten)]
        shell: ShellArgs,

        /// Command and arguments
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "COMMAND"
        )]
        program: Vec<String>,
    },

    /// Wait for host to listen on port (or not)
    #[command(disable_help_flag = true)]
    Port(PortArgs),

    /// Wait for curl to succeed (or fail)
    Curl(CurlArgs),
}

/// `-h` is the host, so help is `--help` only
#[derive(Args, Debug, Clone)]
pub struct PortArgs {
    /// Port number
    pub port: u16,

    /// Wait for port to be closed
    #[arg(short, long)]
    pub closed: bool,

    /// Resolvable hostname or IP address
    #[arg(short = 'h', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Named network: tcp, tcp4, tcp6, udp, udp4, udp6
    #[arg(short, long, default_value = "tcp")]
    pub network: Network,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

#[derive(Args, Debug, Clone)]
pub struct CurlArgs {
    /// URL to request
    pub url: String,

    /// Match HTTP status code
    #[arg(short, long, default_value_t = 200)]
    pub status: u16,

    /// Match regex against the response body
    #[arg(short, long = "match", value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Method for curl request
    #[arg(short = 'X', long = "request", default_value = "GET")]
    pub method: String,

    /// Username and password separated by colon, e.g. 'username:password'
    #[arg(short, long)]
    pub user: Option<String>,

    /// HTTP POST data (repeatable, joined with '&')
    #[arg(short, long)]
    pub data: Vec<String>,

    /// Custom header 'name:value' (repeatable)
    #[arg(short = 'H', long)]
    pub header: Vec<String>,

    /// Wait for the condition to fail
    #[arg(short, long)]
    pub fail: bool,
}

/// Parse durations like `500ms`, `5s`, `1m30s`, `1.5h`
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration '{}'", input))?;
        if number_len == 0 {
            return Err(format!("invalid duration '{}'", input));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid number in duration '{}'", input))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            unit => return Err(format!("unknown unit '{}' in duration '{}'", unit, input)),
        };
        rest = &rest[unit_len..];

        let part = Duration::try_from_secs_f64(value * seconds_per_unit)
            .map_err(|e| format!("invalid duration '{}': {}", input, e))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| format!("duration '{}' is out of range", input))?;
    }

    Ok(total)
}

/// Split `first:second` at the first colon; `second` is empty without one
pub fn split_by_colon(input: &str) -> (&str, &str) {
    input.split_once(':').unwrap_or((input, ""))
}
