//! ABCI clients (consensus engine side of the connection).
//!
//! Every client offers two call shapes per request variant:
//!
//! - `xxx(request)` waits for the matching response and returns it;
//! - `xxx_async(request)` queues the request and returns a [`ReqRes`] that completes later. Completions (and the
//!   client wide response callback) happen in the order requests were queued.
mod grpc;
mod local;
mod socket;
mod validate;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use async_trait::async_trait;

pub use self::grpc::{GrpcClient, GrpcClientConfig};
pub use self::local::LocalClient;
pub use self::socket::{SocketClient, SocketClientConfig};
pub use self::validate::validate;

use crate::{
    address::Address,
    proto::{
        abci::{request, response, *},
        kind_name, MessageKind,
    },
    reqres::ReqRes,
    server::{Service, Transport},
    Error, Result,
};

/// Interval between two dial attempts when the server is not reachable
pub const DIAL_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Interval between two handshake attempts on a freshly dialed connection
pub const ECHO_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Time a call waits for its response before giving up
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of requests in flight on one client
pub const DEFAULT_PENDING_CAPACITY: usize = 64;

/// Message sent in the `Echo` handshake that follows every successful dial
pub const HANDSHAKE_MESSAGE: &str = "hello";

/// Callback invoked once per response, in the order requests were queued
pub type ResponseCallback = Arc<dyn Fn(&Request, &Response) + Send + Sync>;

/// Boxed future returned by the typed call methods of [`Client`]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

fn unexpected_response(expected: MessageKind, value: Option<response::Value>) -> Error {
    match value {
        Some(response::Value::Exception(exception)) => Error::Exception(exception.error),
        other => Error::UnexpectedResponse {
            expected,
            got: kind_name(other.as_ref().map(response::Value::kind)),
        },
    }
}

macro_rules! typed_calls {
    ($($(#[$meta:meta])* $name:ident, $name_async:ident($request:ty) -> $response:ty = $variant:ident;)*) => {
        $(
            $(#[$meta])*
            fn $name<'a>(&'a self, request: $request) -> BoxFuture<'a, Result<$response>> {
                Box::pin(async move {
                    let request = Request {
                        value: Some(request::Value::$variant(request)),
                    };

                    match self.call(request).await?.value {
                        Some(response::Value::$variant(response)) => Ok(response),
                        other => Err(unexpected_response(MessageKind::$variant, other)),
                    }
                })
            }

            #[doc = concat!("Queues a `", stringify!($variant), "` request without waiting for its response")]
            fn $name_async<'a>(&'a self, request: $request) -> BoxFuture<'a, Result<ReqRes>> {
                self.send(Request {
                    value: Some(request::Value::$variant(request)),
                })
            }
        )*
    };
}

/// Consensus engine side of an ABCI connection
#[async_trait]
pub trait Client: Service {
    /// Returns the error that stopped the client, if any
    fn error(&self) -> Option<Error>;

    /// Sets the callback invoked for every response received by this client
    fn set_response_callback(&self, callback: ResponseCallback);

    /// Returns how long a call waits for its response
    fn call_timeout(&self) -> Duration {
        DEFAULT_CALL_TIMEOUT
    }

    /// Queues a request (without validation) and returns its handle
    ///
    /// Suspends while the client already has the maximum number of requests in flight. When the client is stopped,
    /// the returned handle is already completed with the error that stopped it.
    async fn queue_request(&self, request: Request) -> ReqRes;

    /// Sends a request (without validation) and waits for its response
    async fn round_trip(&self, request: Request) -> Result<Response> {
        let reqres = self.queue_request(request).await;

        if !reqres.request().is_flush() {
            self.queue_request(Request::flush()).await;
        }

        let response = reqres.wait_timeout(self.call_timeout()).await;

        match self.error() {
            Some(err) => Err(err),
            None => response,
        }
    }

    /// Validates and queues a request
    fn send<'a>(&'a self, request: Request) -> BoxFuture<'a, Result<ReqRes>> {
        Box::pin(async move {
            validate(&request)?;
            Ok(self.queue_request(request).await)
        })
    }

    /// Validates a request, sends it and waits for its response
    fn call<'a>(&'a self, request: Request) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            validate(&request)?;
            self.round_trip(request).await
        })
    }

    /// Sends an `Echo` request and waits for its response
    fn echo<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<ResponseEcho>> {
        Box::pin(async move {
            match self.call(Request::echo(message)).await?.value {
                Some(response::Value::Echo(response)) => Ok(response),
                other => Err(unexpected_response(MessageKind::Echo, other)),
            }
        })
    }

    /// Queues an `Echo` request without waiting for its response
    fn echo_async<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<ReqRes>> {
        self.send(Request::echo(message))
    }

    /// Sends a `Flush` request and waits until everything queued before it was answered
    fn flush(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            match self.call(Request::flush()).await?.value {
                Some(response::Value::Flush(_)) => Ok(()),
                other => Err(unexpected_response(MessageKind::Flush, other)),
            }
        })
    }

    /// Queues a `Flush` request without waiting for its response
    fn flush_async(&self) -> BoxFuture<'_, Result<ReqRes>> {
        self.send(Request::flush())
    }

    /// Sends a `Commit` request and waits for its response
    fn commit(&self) -> BoxFuture<'_, Result<ResponseCommit>> {
        Box::pin(async move {
            match self.call(Request::commit()).await?.value {
                Some(response::Value::Commit(response)) => Ok(response),
                other => Err(unexpected_response(MessageKind::Commit, other)),
            }
        })
    }

    /// Queues a `Commit` request without waiting for its response
    fn commit_async(&self) -> BoxFuture<'_, Result<ReqRes>> {
        self.send(Request::commit())
    }

    typed_calls! {
        /// Sends an `Info` request and waits for its response
        info, info_async(RequestInfo) -> ResponseInfo = Info;
        /// Sends an `InitChain` request and waits for its response
        init_chain, init_chain_async(RequestInitChain) -> ResponseInitChain = InitChain;
        /// Sends a `Query` request and waits for its response
        query, query_async(RequestQuery) -> ResponseQuery = Query;
        /// Sends a `CheckTx` request and waits for its response
        check_tx, check_tx_async(RequestCheckTx) -> ResponseCheckTx = CheckTx;
        /// Sends a `PrepareProposal` request and waits for its response
        prepare_proposal, prepare_proposal_async(RequestPrepareProposal) -> ResponsePrepareProposal = PrepareProposal;
        /// Sends a `ProcessProposal` request and waits for its response
        process_proposal, process_proposal_async(RequestProcessProposal) -> ResponseProcessProposal = ProcessProposal;
        /// Sends an `ExtendVote` request and waits for its response
        extend_vote, extend_vote_async(RequestExtendVote) -> ResponseExtendVote = ExtendVote;
        /// Sends a `VerifyVoteExtension` request and waits for its response
        verify_vote_extension, verify_vote_extension_async(RequestVerifyVoteExtension) -> ResponseVerifyVoteExtension = VerifyVoteExtension;
        /// Sends a `FinalizeBlock` request and waits for its response
        finalize_block, finalize_block_async(RequestFinalizeBlock) -> ResponseFinalizeBlock = FinalizeBlock;
        /// Sends a `ListSnapshots` request and waits for its response
        list_snapshots, list_snapshots_async(RequestListSnapshots) -> ResponseListSnapshots = ListSnapshots;
        /// Sends an `OfferSnapshot` request and waits for its response
        offer_snapshot, offer_snapshot_async(RequestOfferSnapshot) -> ResponseOfferSnapshot = OfferSnapshot;
        /// Sends a `LoadSnapshotChunk` request and waits for its response
        load_snapshot_chunk, load_snapshot_chunk_async(RequestLoadSnapshotChunk) -> ResponseLoadSnapshotChunk = LoadSnapshotChunk;
        /// Sends an `ApplySnapshotChunk` request and waits for its response
        apply_snapshot_chunk, apply_snapshot_chunk_async(RequestApplySnapshotChunk) -> ResponseApplySnapshotChunk = ApplySnapshotChunk;
    }
}

/// Creates a client connecting to `addr` over `transport` (`"socket"` or `"grpc"`)
///
/// The client is returned stopped; [`Service::start`] dials the server. With `must_connect`, a failed dial makes
/// `start` fail instead of retrying.
pub fn new_client(addr: &str, transport: &str, must_connect: bool) -> Result<Box<dyn Client>> {
    let transport: Transport = transport.parse()?;
    let addr: Address = addr.parse()?;

    match transport {
        Transport::Socket => Ok(Box::new(SocketClient::new(
            addr,
            SocketClientConfig {
                must_connect,
                ..Default::default()
            },
        ))),
        Transport::Grpc => Ok(Box::new(GrpcClient::new(
            addr,
            GrpcClientConfig {
                must_connect,
                ..Default::default()
            },
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_new_client_rejects_unknown_transport() {
        assert!(matches!(
            new_client("tcp://127.0.0.1:26658", "quic", true),
            Err(Error::UnknownTransport(_))
        ));
    }

    #[test]
    fn check_new_client_parses_address() {
        let client = new_client("tcp://127.0.0.1:26658", "socket", true).unwrap();
        assert!(!client.is_running());

        let client = new_client("127.0.0.1:26658", "grpc", false).unwrap();
        assert!(!client.is_running());

        assert!(matches!(
            new_client("tcp://not an address", "socket", true),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn check_unexpected_response_projection() {
        assert!(matches!(
            unexpected_response(
                MessageKind::Info,
                Response::exception("app failure").value
            ),
            Error::Exception(message) if message == "app failure"
        ));

        assert!(matches!(
            unexpected_response(MessageKind::Info, Response::flush().value),
            Error::UnexpectedResponse { expected: MessageKind::Info, got } if got == "Flush"
        ));
    }
}
