// Network kinds a port condition can dial

use crate::error::AppError;
use std::fmt;
use std::str::FromStr;

/// Transport and address family used to reach a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
}

/// Address family restriction derived from a [`Network`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Any,
    V4,
    V6,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Tcp4 => "tcp4",
            Network::Tcp6 => "tcp6",
            Network::Udp => "udp",
            Network::Udp4 => "udp4",
            Network::Udp6 => "udp6",
        }
    }

    pub fn is_udp(&self) -> bool {
        matches!(self, Network::Udp | Network::Udp4 | Network::Udp6)
    }

    pub fn family(&self) -> AddressFamily {
        match self {
            Network::Tcp | Network::Udp => AddressFamily::Any,
            Network::Tcp4 | Network::Udp4 => AddressFamily::V4,
            Network::Tcp6 | Network::Udp6 => AddressFamily::V6,
        }
    }
}

impl AddressFamily {
    pub fn accepts(&self, addr: &std::net::SocketAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            "udp" => Ok(Network::Udp),
            "udp4" => Ok(Network::Udp4),
            "udp6" => Ok(Network::Udp6),
            other => Err(AppError::Validation(format!(
                "unsupported network '{}', expected one of tcp, tcp4, tcp6, udp, udp4, udp6",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[test]
    fn test_parse_round_trips_display() {
        for name in ["tcp", "tcp4", "tcp6", "udp", "udp4", "udp6"] {
            let network: Network = name.parse().unwrap();
            assert_eq!(network.to_string(), name);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("TCP6".parse::<Network>().unwrap(), Network::Tcp6);
    }

    #[test]
    fn test_raw_ip_networks_are_rejected() {
        let err = "ip4".parse::<Network>().unwrap_err();
        assert!(err.to_string().contains("unsupported network 'ip4'"));
    }

    #[test]
    fn test_family_filters_addresses() {
        let v4: SocketAddr = "127.0.0.1:80".parse().unwrap();
        let v6: SocketAddr = "[::1]:80".parse().unwrap();

        assert!(Network::Tcp.family().accepts(&v4));
        assert!(Network::Tcp.family().accepts(&v6));
        assert!(Network::Udp4.family().accepts(&v4));
        assert!(!Network::Udp4.family().accepts(&v6));
        assert!(Network::Tcp6.family().accepts(&v6));
        assert!(!Network::Tcp6.family().accepts(&v4));
    }
}
