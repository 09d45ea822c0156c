// Command condition source
// One process run per query; combined output goes to the diagnostic sink.
use bytes::Bytes;
use regex::Regex;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use waitfor_core::domain::{normalize_exit_code, LAUNCH_FAILURE_EXIT_CODE};
use waitfor_core::port::DiagnosticSink;

/// Where a command's standard input comes from
#[derive(Debug, Clone, Default)]
pub enum StdinSource {
    /// Empty input (`/dev/null`)
    #[default]
    Null,
    /// Share this process's stdin; only the first run sees its content
    Inherit,
    /// Fixed bytes, written again on every run
    Bytes(Bytes),
}

/// How a single run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Code(i32),
    /// Killed by a signal; there is no exit code to match
    Signaled,
    /// The program could not be started (or waited on)
    LaunchFailed,
}

struct Run {
    output: Vec<u8>,
    exit: Exit,
}

/// Runs a command and inspects its exit status or output
///
/// # Example
/// ```ignore
/// let mut check = CommandCheck::new("pg_isready", ["-h", "localhost"]);
/// check.with_sink(Arc::new(TracingSink));
/// let ready = check.succeeds().await;
/// ```
#[derive(Clone)]
pub struct CommandCheck {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdin: StdinSource,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl CommandCheck {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            stdin: StdinSource::default(),
            sink: None,
        }
    }

    /// Replace (not extend) the inherited environment
    ///
    /// An empty list keeps the inherited environment.
    pub fn with_env<I, K, V>(&mut self, env: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn with_stdin(&mut self, stdin: StdinSource) -> &mut Self {
        self.stdin = stdin;
        self
    }

    pub fn with_sink(&mut self, sink: Arc<dyn DiagnosticSink>) -> &mut Self {
        self.sink = Some(sink);
        self
    }

    /// True if the command exits with code 0
    pub async fn succeeds(&self) -> bool {
        self.run().await.exit == Exit::Code(0)
    }

    /// True if the command does not exit with code 0 (including launch failure)
    pub async fn fails(&self) -> bool {
        !self.succeeds().await
    }

    /// True if the command's exit code equals `exit_code` modulo 256
    ///
    /// A command that cannot be launched reports 127; one killed by a signal
    /// matches nothing.
    pub async fn matches_exit_code(&self, exit_code: i32) -> bool {
        let expected = normalize_exit_code(exit_code);
        match self.run().await.exit {
            Exit::Code(code) => code == expected,
            Exit::LaunchFailed => LAUNCH_FAILURE_EXIT_CODE == expected,
            Exit::Signaled => false,
        }
    }

    /// True if `regex` matches the combined stdout and stderr, whatever the exit code
    pub async fn matches_output(&self, regex: &Regex) -> bool {
        let run = self.run().await;
        regex.is_match(&String::from_utf8_lossy(&run.output))
    }

    async fn run(&self) -> Run {
        let command_line = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.emit(&format!("Running {}", command_line));

        let (mut reader, stdout, stderr) = match combined_output_pipe() {
            Ok(pipe) => pipe,
            Err(e) => {
                debug!(program = %self.program, error = %e, "Could not create output pipe");
                self.emit(&e.to_string());
                return Run {
                    output: Vec::new(),
                    exit: Exit::LaunchFailed,
                };
            }
        };

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        if !self.env.is_empty() {
            command.env_clear().envs(self.env.iter().map(|(k, v)| (k, v)));
        }

        command.stdin(match self.stdin {
            StdinSource::Null => Stdio::null(),
            StdinSource::Inherit => Stdio::inherit(),
            StdinSource::Bytes(_) => Stdio::piped(),
        });

        let spawned = command.spawn();
        // the command owns our copies of the write end; EOF needs them closed
        drop(command);

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                debug!(program = %self.program, error = %e, "Command could not be launched");
                self.emit(&e.to_string());
                return Run {
                    output: Vec::new(),
                    exit: Exit::LaunchFailed,
                };
            }
        };

        // feed stdin while output is drained, so large inputs cannot deadlock
        let pipe = child.stdin.take();
        let feed = async {
            if let (Some(mut pipe), StdinSource::Bytes(data)) = (pipe, &self.stdin) {
                if let Err(e) = pipe.write_all(data).await {
                    // the command may exit without reading its input
                    debug!(program = %self.program, error = %e, "Could not write stdin");
                }
            }
        };
        let drain = async {
            let mut combined = Vec::new();
            if let Err(e) = reader.read_to_end(&mut combined).await {
                debug!(program = %self.program, error = %e, "Could not read output");
            }
            combined
        };
        let (_, combined, waited) = tokio::join!(feed, drain, child.wait());

        let status = match waited {
            Ok(status) => status,
            Err(e) => {
                self.emit(&e.to_string());
                return Run {
                    output: combined,
                    exit: Exit::LaunchFailed,
                };
            }
        };

        if !combined.is_empty() {
            self.emit(String::from_utf8_lossy(&combined).trim_end());
        }

        let exit = match status.code() {
            Some(code) => Exit::Code(code),
            None => Exit::Signaled,
        };
        if exit != Exit::Code(0) {
            self.emit(&describe_status(&status));
        }

        debug!(
            program = %self.program,
            exit = ?exit,
            output_len = combined.len(),
            "Command finished"
        );

        Run {
            output: combined,
            exit,
        }
    }

    fn emit(&self, line: &str) {
        if let Some(sink) = &self.sink {
            sink.emit(line);
        }
    }
}

/// One pipe behind both stdout and stderr, read back in write order
#[cfg(unix)]
fn combined_output_pipe() -> io::Result<(File, Stdio, Stdio)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    use std::os::fd::AsRawFd;

    let (read, write) = nix::unistd::pipe()?;
    // only the descriptors installed as stdout/stderr may reach the child
    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    let write_stderr = write.try_clone()?;

    Ok((
        File::from_std(std::fs::File::from(read)),
        Stdio::from(write),
        Stdio::from(write_stderr),
    ))
}

#[cfg(windows)]
fn combined_output_pipe() -> io::Result<(File, Stdio, Stdio)> {
    use std::os::windows::io::OwnedHandle;

    let (read, write) = io::pipe()?;
    let write_stderr = write.try_clone()?;

    Ok((
        File::from_std(std::fs::File::from(OwnedHandle::from(read))),
        Stdio::from(write),
        Stdio::from(write_stderr),
    ))
}

fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {}", code);
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return match Signal::try_from(signal) {
                Ok(signal) => format!("terminated by signal {}", signal),
                Err(_) => format!("terminated by signal {}", signal),
            };
        }
    }

    status.to_string()
}
