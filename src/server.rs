//! ABCI servers (application side of the connection).
mod grpc;
mod socket;

use std::{fmt, str::FromStr};

use async_trait::async_trait;

pub use self::grpc::GrpcServer;
pub use self::socket::SocketServer;

use crate::{adapter::AppMutex, address::Address, application::Application, Error, Result};

/// Default capacity of the per-connection response queue
pub const DEFAULT_RESPONSE_QUEUE_CAPACITY: usize = 1000;

/// Lifecycle of a long running component (servers and clients)
#[async_trait]
pub trait Service: Send + Sync {
    /// Starts the service
    ///
    /// Returns [`Error::AlreadyStarted`] when called on a running (or previously started) service.
    async fn start(&self) -> Result<()>;

    /// Stops the service
    ///
    /// Returns [`Error::NotStarted`] when the service is not running.
    async fn stop(&self) -> Result<()>;

    /// Returns `true` if the service is running
    fn is_running(&self) -> bool;
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Number of responses a connection buffers before its reader stops dispatching requests
    pub response_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            response_queue_capacity: DEFAULT_RESPONSE_QUEUE_CAPACITY,
        }
    }
}

/// Wire transport spoken between the consensus engine and the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Length-delimited protobuf frames over TCP or UDS
    Socket,
    /// One unary gRPC call per request
    Grpc,
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "socket" => Ok(Self::Socket),
            "grpc" => Ok(Self::Grpc),
            _ => Err(Error::UnknownTransport(s.to_string())),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket => write!(f, "socket"),
            Self::Grpc => write!(f, "grpc"),
        }
    }
}

/// Creates a server for `app` listening on `addr` with the given `transport` (`"socket"` or `"grpc"`)
///
/// The server is returned stopped; call [`Service::start`] to bind the address.
pub fn new_server<A: Application>(addr: &str, transport: &str, app: A) -> Result<Box<dyn Service>> {
    let transport = transport.parse()?;
    let addr = addr.parse()?;

    new_server_with(addr, transport, AppMutex::new(app))
}

/// Creates a server sharing an existing [`AppMutex`]
pub fn new_server_with<A: Application>(
    addr: Address,
    transport: Transport,
    app: AppMutex<A>,
) -> Result<Box<dyn Service>> {
    match transport {
        Transport::Socket => Ok(Box::new(SocketServer::with_app(
            addr,
            app,
            Default::default(),
        ))),
        Transport::Grpc => {
            let addr = addr
                .as_tcp()
                .ok_or_else(|| Error::InvalidAddress(addr.to_string()))?;
            Ok(Box::new(GrpcServer::with_app(addr, app)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::BaseApplication;

    #[test]
    fn check_transport_parsing() {
        assert_eq!("socket".parse::<Transport>().unwrap(), Transport::Socket);
        assert_eq!("grpc".parse::<Transport>().unwrap(), Transport::Grpc);
        assert!(matches!(
            "http".parse::<Transport>(),
            Err(Error::UnknownTransport(transport)) if transport == "http"
        ));
    }

    #[test]
    fn check_new_server_rejects_unknown_transport() {
        assert!(matches!(
            new_server("tcp://127.0.0.1:0", "carrier-pigeon", BaseApplication),
            Err(Error::UnknownTransport(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn check_grpc_server_requires_tcp() {
        assert!(matches!(
            new_server("unix:///tmp/abci-grpc.sock", "grpc", BaseApplication),
            Err(Error::InvalidAddress(_))
        ));
    }
}
