use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    str::FromStr,
};
#[cfg(unix)]
use std::path::PathBuf;

#[cfg(test)]
use mock_io::tokio::MockListener;

use crate::Error;

/// Address of an ABCI server
///
/// Parsed from `tcp://host:port`, `unix:///path/to/socket` or a bare `host:port` (TCP).
#[derive(Debug)]
pub enum Address {
    /// TCP Address
    Tcp(SocketAddr),
    /// UDS Address
    #[cfg(unix)]
    Uds(PathBuf),
    /// Mock Address
    #[cfg(test)]
    Mock(MockListener),
}

impl Address {
    /// Returns the TCP address, if this is one
    pub fn as_tcp(&self) -> Option<SocketAddr> {
        match self {
            Self::Tcp(addr) => Some(*addr),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Returns a copy of this address (mock listeners cannot be copied)
    pub fn try_clone(&self) -> Option<Self> {
        match self {
            Self::Tcp(addr) => Some(Self::Tcp(*addr)),
            #[cfg(unix)]
            Self::Uds(path) => Some(Self::Uds(path.clone())),
            #[cfg(test)]
            Self::Mock(_) => None,
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix://") {
            #[cfg(unix)]
            {
                if path.is_empty() {
                    return Err(Error::InvalidAddress(s.to_string()));
                }

                return Ok(Self::Uds(PathBuf::from(path)));
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                return Err(Error::InvalidAddress(s.to_string()));
            }
        }

        let host_port = s.strip_prefix("tcp://").unwrap_or(s);

        if let Ok(addr) = host_port.parse::<SocketAddr>() {
            return Ok(Self::Tcp(addr));
        }

        host_port
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .map(Self::Tcp)
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
            #[cfg(unix)]
            Self::Uds(path) => write!(f, "unix://{}", path.display()),
            #[cfg(test)]
            Self::Mock(_) => write!(f, "mock://"),
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self::Tcp(addr)
    }
}

#[cfg(unix)]
impl From<PathBuf> for Address {
    fn from(path: PathBuf) -> Self {
        Self::Uds(path)
    }
}

#[cfg(test)]
impl From<MockListener> for Address {
    fn from(listener: MockListener) -> Self {
        Self::Mock(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_tcp_addresses() {
        let address: Address = "tcp://127.0.0.1:26658".parse().unwrap();
        assert_eq!(address.as_tcp(), Some("127.0.0.1:26658".parse().unwrap()));

        let address: Address = "127.0.0.1:26658".parse().unwrap();
        assert_eq!(address.to_string(), "tcp://127.0.0.1:26658");

        let address: Address = "tcp://localhost:26658".parse().unwrap();
        assert_eq!(address.as_tcp().map(|addr| addr.port()), Some(26658));
    }

    #[cfg(unix)]
    #[test]
    fn check_unix_addresses() {
        let address: Address = "unix:///tmp/abci.sock".parse().unwrap();
        assert!(matches!(address, Address::Uds(ref path) if path == &PathBuf::from("/tmp/abci.sock")));
        assert_eq!(address.to_string(), "unix:///tmp/abci.sock");
        assert!(address.as_tcp().is_none());

        assert!(matches!(
            "unix://".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn check_invalid_addresses() {
        assert!(matches!(
            "tcp://not an address".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            "127.0.0.1".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
    }
}
