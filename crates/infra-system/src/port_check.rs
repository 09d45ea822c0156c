// Port condition source
// One dial per query: connect, then immediately close.
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tracing::debug;

use waitfor_core::domain::Network;
use waitfor_core::port::DiagnosticSink;

/// Host dialed when none is configured
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Checks whether a host listens on a port
///
/// UDP has no handshake, so a UDP port counts as open whenever the address
/// resolves and a socket can be connected to it.
///
/// # Example
/// ```ignore
/// let mut check = PortCheck::new(5432);
/// check.on_host("db.local").for_network(Network::Tcp4);
/// let open = check.is_open().await;
/// ```
#[derive(Clone)]
pub struct PortCheck {
    port: u16,
    host: String,
    network: Network,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl PortCheck {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            host: DEFAULT_HOST.to_string(),
            network: Network::default(),
            sink: None,
        }
    }

    pub fn on_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = host.into();
        self
    }

    pub fn for_network(&mut self, network: Network) -> &mut Self {
        self.network = network;
        self
    }

    pub fn with_sink(&mut self, sink: Arc<dyn DiagnosticSink>) -> &mut Self {
        self.sink = Some(sink);
        self
    }

    /// `host:port`, with IPv6 literals bracketed
    pub fn addr(&self) -> String {
        let host = self.host.as_str();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    /// `network://host:port`
    pub fn target(&self) -> String {
        format!("{}://{}", self.network, self.addr())
    }

    /// True if a connection to the target can be established
    pub async fn is_open(&self) -> bool {
        let target = self.target();
        self.emit(&format!("Dialing {}", target));

        match self.dial().await {
            Ok(peer) => {
                debug!(target = %target, peer = %peer, "Port is open");
                self.emit(&format!("{} is open", target));
                true
            }
            Err(e) => {
                debug!(target = %target, error = %e, "Port is not open");
                self.emit(&format!("{}: {}", target, e));
                false
            }
        }
    }

    /// Logical negation of [`PortCheck::is_open`]
    pub async fn is_closed(&self) -> bool {
        !self.is_open().await
    }

    /// Resolve and connect; returns the address that answered
    async fn dial(&self) -> io::Result<SocketAddr> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let family = self.network.family();
        let candidates: Vec<SocketAddr> = lookup_host((host, self.port))
            .await?
            .filter(|addr| family.accepts(addr))
            .collect();

        let mut last_err = io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no {} address found for host '{}'", self.network, self.host),
        );

        // try each resolved address in order, like a dialer would
        for addr in candidates {
            let attempt = if self.network.is_udp() {
                connect_udp(addr).await
            } else {
                TcpStream::connect(addr).await.map(drop)
            };
            match attempt {
                Ok(()) => return Ok(addr),
                Err(e) => last_err = e,
            }
        }

        Err(last_err)
    }

    fn emit(&self, line: &str) {
        if let Some(sink) = &self.sink {
            sink.emit(line);
        }
    }
}

async fn connect_udp(addr: SocketAddr) -> io::Result<()> {
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(addr).await
}
