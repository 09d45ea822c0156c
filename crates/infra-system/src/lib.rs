// waitfor Infrastructure - Condition Sources
// Implements the Condition contract for ports, HTTP endpoints and commands.
// Every query performs exactly one I/O attempt and never returns an error:
// failures become `false` plus a diagnostic line.

pub mod command_check;
pub mod http_check;
pub mod port_check;
pub mod sink;

pub use command_check::{CommandCheck, StdinSource};
pub use http_check::HttpCheck;
pub use port_check::PortCheck;
pub use sink::{TracingSink, WriterSink};
