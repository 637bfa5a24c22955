//! gRPC glue for the `tendermint.abci.ABCI` service.
//!
//! Each request variant is exposed as one unary RPC named after the variant (`/tendermint.abci.ABCI/CheckTx`, ...).
//! Both sides work in terms of the whole [`Request`] / [`Response`] envelope so that the same dispatching code serves
//! the socket and gRPC transports.
use std::net::SocketAddr;

use tonic::{
    codegen::{http, Arc, Body, BoxFuture, Context, Poll, Service, StdError},
    server::NamedService,
    transport::{Channel, Endpoint},
    Code, Status,
};

use crate::proto::{
    abci::{request, response, *},
    kind_name,
};

/// Fully qualified name of the ABCI gRPC service
pub const SERVICE_NAME: &str = "tendermint.abci.ABCI";

/// Handles ABCI requests received over gRPC
#[tonic::async_trait]
pub trait AbciHandler: Send + Sync + 'static {
    /// Handles a single request, returning the response of the same variant
    async fn handle(&self, request: Request) -> Result<Response, Status>;
}

fn unexpected_response(value: Option<response::Value>) -> Status {
    match value {
        Some(response::Value::Exception(exception)) => Status::unknown(exception.error),
        other => Status::internal(format!(
            "Unexpected response: {}",
            kind_name(other.as_ref().map(response::Value::kind))
        )),
    }
}

macro_rules! unary {
    ($handler:expr, $req:expr, $variant:ident, $request:ty, $response:ty) => {{
        struct Svc<T: AbciHandler>(Arc<T>);

        impl<T: AbciHandler> tonic::server::UnaryService<$request> for Svc<T> {
            type Response = $response;
            type Future = BoxFuture<tonic::Response<Self::Response>, Status>;

            fn call(&mut self, request: tonic::Request<$request>) -> Self::Future {
                let handler = Arc::clone(&self.0);

                Box::pin(async move {
                    let request = Request {
                        value: Some(request::Value::$variant(request.into_inner())),
                    };

                    match handler.handle(request).await?.value {
                        Some(response::Value::$variant(response)) => {
                            Ok(tonic::Response::new(response))
                        }
                        other => Err(unexpected_response(other)),
                    }
                })
            }
        }

        let handler = $handler;
        let req = $req;

        Box::pin(async move {
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = tonic::server::Grpc::new(codec);
            Ok(grpc.unary(Svc(handler), req).await)
        })
    }};
}

/// Tower service routing `tendermint.abci.ABCI` RPCs to an [`AbciHandler`]
#[derive(Debug)]
pub struct AbciServer<T: AbciHandler> {
    handler: Arc<T>,
}

impl<T: AbciHandler> AbciServer<T> {
    /// Creates a new instance of [`AbciServer`](self::AbciServer)
    pub fn new(handler: T) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl<T: AbciHandler> Clone for AbciServer<T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T: AbciHandler> NamedService for AbciServer<T> {
    const NAME: &'static str = SERVICE_NAME;
}

impl<T, B> Service<http::Request<B>> for AbciServer<T>
where
    T: AbciHandler,
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);

        match req.uri().path() {
            "/tendermint.abci.ABCI/Echo" => unary!(handler, req, Echo, RequestEcho, ResponseEcho),
            "/tendermint.abci.ABCI/Flush" => {
                unary!(handler, req, Flush, RequestFlush, ResponseFlush)
            }
            "/tendermint.abci.ABCI/Info" => unary!(handler, req, Info, RequestInfo, ResponseInfo),
            "/tendermint.abci.ABCI/InitChain" => unary!(
                handler,
                req,
                InitChain,
                RequestInitChain,
                ResponseInitChain
            ),
            "/tendermint.abci.ABCI/Query" => {
                unary!(handler, req, Query, RequestQuery, ResponseQuery)
            }
            "/tendermint.abci.ABCI/CheckTx" => {
                unary!(handler, req, CheckTx, RequestCheckTx, ResponseCheckTx)
            }
            "/tendermint.abci.ABCI/PrepareProposal" => unary!(
                handler,
                req,
                PrepareProposal,
                RequestPrepareProposal,
                ResponsePrepareProposal
            ),
            "/tendermint.abci.ABCI/ProcessProposal" => unary!(
                handler,
                req,
                ProcessProposal,
                RequestProcessProposal,
                ResponseProcessProposal
            ),
            "/tendermint.abci.ABCI/ExtendVote" => unary!(
                handler,
                req,
                ExtendVote,
                RequestExtendVote,
                ResponseExtendVote
            ),
            "/tendermint.abci.ABCI/VerifyVoteExtension" => unary!(
                handler,
                req,
                VerifyVoteExtension,
                RequestVerifyVoteExtension,
                ResponseVerifyVoteExtension
            ),
            "/tendermint.abci.ABCI/FinalizeBlock" => unary!(
                handler,
                req,
                FinalizeBlock,
                RequestFinalizeBlock,
                ResponseFinalizeBlock
            ),
            "/tendermint.abci.ABCI/Commit" => {
                unary!(handler, req, Commit, RequestCommit, ResponseCommit)
            }
            "/tendermint.abci.ABCI/ListSnapshots" => unary!(
                handler,
                req,
                ListSnapshots,
                RequestListSnapshots,
                ResponseListSnapshots
            ),
            "/tendermint.abci.ABCI/OfferSnapshot" => unary!(
                handler,
                req,
                OfferSnapshot,
                RequestOfferSnapshot,
                ResponseOfferSnapshot
            ),
            "/tendermint.abci.ABCI/LoadSnapshotChunk" => unary!(
                handler,
                req,
                LoadSnapshotChunk,
                RequestLoadSnapshotChunk,
                ResponseLoadSnapshotChunk
            ),
            "/tendermint.abci.ABCI/ApplySnapshotChunk" => unary!(
                handler,
                req,
                ApplySnapshotChunk,
                RequestApplySnapshotChunk,
                ResponseApplySnapshotChunk
            ),
            _ => Box::pin(async move { Ok(unimplemented_response()) }),
        }
    }
}

fn unimplemented_response() -> http::Response<tonic::body::BoxBody> {
    let mut response = http::Response::new(tonic::codegen::empty_body());
    let headers = response.headers_mut();

    headers.insert(
        "grpc-status",
        http::HeaderValue::from_static("12"), // Code::Unimplemented
    );
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/grpc"),
    );

    response
}

/// gRPC client of the `tendermint.abci.ABCI` service
#[derive(Debug, Clone)]
pub struct AbciClient {
    inner: tonic::client::Grpc<Channel>,
}

macro_rules! client_methods {
    ($($(#[$meta:meta])* $name:ident($request:ty) -> $response:ty = $path:literal;)*) => {
        $(
            $(#[$meta])*
            pub async fn $name(&mut self, request: $request) -> Result<$response, Status> {
                self.unary(request, $path).await
            }
        )*
    };
}

impl AbciClient {
    /// Connects to a gRPC server listening on `addr`
    pub async fn connect(addr: SocketAddr) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(format!("http://{}", addr))?
            .connect()
            .await?;

        Ok(Self {
            inner: tonic::client::Grpc::new(channel),
        })
    }

    async fn unary<Req, Resp>(&mut self, request: Req, path: &'static str) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner.ready().await.map_err(|err| {
            Status::new(Code::Unknown, format!("Service was not ready: {}", err))
        })?;

        let codec = tonic::codec::ProstCodec::default();
        let path = http::uri::PathAndQuery::from_static(path);

        self.inner
            .unary(tonic::Request::new(request), path, codec)
            .await
            .map(tonic::Response::into_inner)
    }

    client_methods! {
        /// Calls `Echo`
        echo(RequestEcho) -> ResponseEcho = "/tendermint.abci.ABCI/Echo";
        /// Calls `Flush`
        flush(RequestFlush) -> ResponseFlush = "/tendermint.abci.ABCI/Flush";
        /// Calls `Info`
        info(RequestInfo) -> ResponseInfo = "/tendermint.abci.ABCI/Info";
        /// Calls `InitChain`
        init_chain(RequestInitChain) -> ResponseInitChain = "/tendermint.abci.ABCI/InitChain";
        /// Calls `Query`
        query(RequestQuery) -> ResponseQuery = "/tendermint.abci.ABCI/Query";
        /// Calls `CheckTx`
        check_tx(RequestCheckTx) -> ResponseCheckTx = "/tendermint.abci.ABCI/CheckTx";
        /// Calls `PrepareProposal`
        prepare_proposal(RequestPrepareProposal) -> ResponsePrepareProposal = "/tendermint.abci.ABCI/PrepareProposal";
        /// Calls `ProcessProposal`
        process_proposal(RequestProcessProposal) -> ResponseProcessProposal = "/tendermint.abci.ABCI/ProcessProposal";
        /// Calls `ExtendVote`
        extend_vote(RequestExtendVote) -> ResponseExtendVote = "/tendermint.abci.ABCI/ExtendVote";
        /// Calls `VerifyVoteExtension`
        verify_vote_extension(RequestVerifyVoteExtension) -> ResponseVerifyVoteExtension = "/tendermint.abci.ABCI/VerifyVoteExtension";
        /// Calls `FinalizeBlock`
        finalize_block(RequestFinalizeBlock) -> ResponseFinalizeBlock = "/tendermint.abci.ABCI/FinalizeBlock";
        /// Calls `Commit`
        commit(RequestCommit) -> ResponseCommit = "/tendermint.abci.ABCI/Commit";
        /// Calls `ListSnapshots`
        list_snapshots(RequestListSnapshots) -> ResponseListSnapshots = "/tendermint.abci.ABCI/ListSnapshots";
        /// Calls `OfferSnapshot`
        offer_snapshot(RequestOfferSnapshot) -> ResponseOfferSnapshot = "/tendermint.abci.ABCI/OfferSnapshot";
        /// Calls `LoadSnapshotChunk`
        load_snapshot_chunk(RequestLoadSnapshotChunk) -> ResponseLoadSnapshotChunk = "/tendermint.abci.ABCI/LoadSnapshotChunk";
        /// Calls `ApplySnapshotChunk`
        apply_snapshot_chunk(RequestApplySnapshotChunk) -> ResponseApplySnapshotChunk = "/tendermint.abci.ABCI/ApplySnapshotChunk";
    }

    /// Sends `request` through the RPC matching its variant
    pub async fn call(&mut self, request: Request) -> Result<Response, Status> {
        use request::Value as Req;

        let value = request
            .value
            .ok_or_else(|| Status::invalid_argument("Unknown request"))?;

        let value = match value {
            Req::Echo(request) => response::Value::Echo(self.echo(request).await?),
            Req::Flush(request) => response::Value::Flush(self.flush(request).await?),
            Req::Info(request) => response::Value::Info(self.info(request).await?),
            Req::InitChain(request) => response::Value::InitChain(self.init_chain(request).await?),
            Req::Query(request) => response::Value::Query(self.query(request).await?),
            Req::CheckTx(request) => response::Value::CheckTx(self.check_tx(request).await?),
            Req::PrepareProposal(request) => {
                response::Value::PrepareProposal(self.prepare_proposal(request).await?)
            }
            Req::ProcessProposal(request) => {
                response::Value::ProcessProposal(self.process_proposal(request).await?)
            }
            Req::ExtendVote(request) => {
                response::Value::ExtendVote(self.extend_vote(request).await?)
            }
            Req::VerifyVoteExtension(request) => {
                response::Value::VerifyVoteExtension(self.verify_vote_extension(request).await?)
            }
            Req::FinalizeBlock(request) => {
                response::Value::FinalizeBlock(self.finalize_block(request).await?)
            }
            Req::Commit(request) => response::Value::Commit(self.commit(request).await?),
            Req::ListSnapshots(request) => {
                response::Value::ListSnapshots(self.list_snapshots(request).await?)
            }
            Req::OfferSnapshot(request) => {
                response::Value::OfferSnapshot(self.offer_snapshot(request).await?)
            }
            Req::LoadSnapshotChunk(request) => {
                response::Value::LoadSnapshotChunk(self.load_snapshot_chunk(request).await?)
            }
            Req::ApplySnapshotChunk(request) => {
                response::Value::ApplySnapshotChunk(self.apply_snapshot_chunk(request).await?)
            }
        };

        Ok(Response { value: Some(value) })
    }
}
