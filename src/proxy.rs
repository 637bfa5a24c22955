//! Typed views (facets) onto an ABCI client, as used by the consensus engine.
//!
//! The engine talks to the application through four facets: consensus, mempool, query and snapshot. Each facet
//! exposes only the methods of its concern and wraps the same shared [`Client`].
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    adapter::AppMutex,
    application::{Application, BaseApplication},
    client::{new_client, Client, LocalClient, ResponseCallback},
    proto::abci::*,
    reqres::ReqRes,
    Error, Result,
};

/// Consensus facet: block proposal, voting and execution
#[async_trait]
pub trait AppConnConsensus: Send + Sync {
    /// Returns the error that stopped the underlying client, if any
    fn error(&self) -> Option<Error>;

    /// Initializes the chain (genesis)
    async fn init_chain(&self, request: RequestInitChain) -> Result<ResponseInitChain>;

    /// Asks the application to prepare a block proposal
    async fn prepare_proposal(
        &self,
        request: RequestPrepareProposal,
    ) -> Result<ResponsePrepareProposal>;

    /// Asks the application to accept or reject a proposal
    async fn process_proposal(
        &self,
        request: RequestProcessProposal,
    ) -> Result<ResponseProcessProposal>;

    /// Asks the application for a vote extension
    async fn extend_vote(&self, request: RequestExtendVote) -> Result<ResponseExtendVote>;

    /// Asks the application to verify another validator's vote extension
    async fn verify_vote_extension(
        &self,
        request: RequestVerifyVoteExtension,
    ) -> Result<ResponseVerifyVoteExtension>;

    /// Delivers a decided block
    async fn finalize_block(&self, request: RequestFinalizeBlock) -> Result<ResponseFinalizeBlock>;

    /// Persists the state produced by the last finalized block
    async fn commit(&self) -> Result<ResponseCommit>;
}

/// Mempool facet: transaction admission
#[async_trait]
pub trait AppConnMempool: Send + Sync {
    /// Sets the callback invoked for every response on the underlying client
    fn set_response_callback(&self, callback: ResponseCallback);

    /// Returns the error that stopped the underlying client, if any
    fn error(&self) -> Option<Error>;

    /// Checks a transaction and waits for the verdict
    async fn check_tx(&self, request: RequestCheckTx) -> Result<ResponseCheckTx>;

    /// Queues a transaction check without waiting for the verdict
    async fn check_tx_async(&self, request: RequestCheckTx) -> Result<ReqRes>;

    /// Waits until every queued request was answered
    async fn flush(&self) -> Result<()>;

    /// Queues a `Flush` request
    async fn flush_async(&self) -> Result<ReqRes>;
}

/// Query facet: application info and state queries
#[async_trait]
pub trait AppConnQuery: Send + Sync {
    /// Returns the error that stopped the underlying client, if any
    fn error(&self) -> Option<Error>;

    /// Sends an `Echo` request
    async fn echo(&self, message: &str) -> Result<ResponseEcho>;

    /// Returns information about the application state
    async fn info(&self, request: RequestInfo) -> Result<ResponseInfo>;

    /// Queries the application state
    async fn query(&self, request: RequestQuery) -> Result<ResponseQuery>;
}

/// Snapshot facet: state sync
#[async_trait]
pub trait AppConnSnapshot: Send + Sync {
    /// Returns the error that stopped the underlying client, if any
    fn error(&self) -> Option<Error>;

    /// Lists the snapshots available locally
    async fn list_snapshots(&self, request: RequestListSnapshots) -> Result<ResponseListSnapshots>;

    /// Offers a snapshot received from a peer
    async fn offer_snapshot(&self, request: RequestOfferSnapshot) -> Result<ResponseOfferSnapshot>;

    /// Loads a chunk of a local snapshot
    async fn load_snapshot_chunk(
        &self,
        request: RequestLoadSnapshotChunk,
    ) -> Result<ResponseLoadSnapshotChunk>;

    /// Applies a chunk of the snapshot being restored
    async fn apply_snapshot_chunk(
        &self,
        request: RequestApplySnapshotChunk,
    ) -> Result<ResponseApplySnapshotChunk>;
}

/// [`AppConnConsensus`] over a shared client
#[derive(Clone)]
pub struct ConsensusConnection {
    client: Arc<dyn Client>,
}

/// [`AppConnMempool`] over a shared client
#[derive(Clone)]
pub struct MempoolConnection {
    client: Arc<dyn Client>,
}

/// [`AppConnQuery`] over a shared client
#[derive(Clone)]
pub struct QueryConnection {
    client: Arc<dyn Client>,
}

/// [`AppConnSnapshot`] over a shared client
#[derive(Clone)]
pub struct SnapshotConnection {
    client: Arc<dyn Client>,
}

impl ConsensusConnection {
    /// Creates a new instance of [`ConsensusConnection`](self::ConsensusConnection)
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }
}

impl MempoolConnection {
    /// Creates a new instance of [`MempoolConnection`](self::MempoolConnection)
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }
}

impl QueryConnection {
    /// Creates a new instance of [`QueryConnection`](self::QueryConnection)
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }
}

impl SnapshotConnection {
    /// Creates a new instance of [`SnapshotConnection`](self::SnapshotConnection)
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AppConnConsensus for ConsensusConnection {
    fn error(&self) -> Option<Error> {
        self.client.error()
    }

    async fn init_chain(&self, request: RequestInitChain) -> Result<ResponseInitChain> {
        self.client.init_chain(request).await
    }

    async fn prepare_proposal(
        &self,
        request: RequestPrepareProposal,
    ) -> Result<ResponsePrepareProposal> {
        self.client.prepare_proposal(request).await
    }

    async fn process_proposal(
        &self,
        request: RequestProcessProposal,
    ) -> Result<ResponseProcessProposal> {
        self.client.process_proposal(request).await
    }

    async fn extend_vote(&self, request: RequestExtendVote) -> Result<ResponseExtendVote> {
        self.client.extend_vote(request).await
    }

    async fn verify_vote_extension(
        &self,
        request: RequestVerifyVoteExtension,
    ) -> Result<ResponseVerifyVoteExtension> {
        self.client.verify_vote_extension(request).await
    }

    async fn finalize_block(&self, request: RequestFinalizeBlock) -> Result<ResponseFinalizeBlock> {
        self.client.finalize_block(request).await
    }

    async fn commit(&self) -> Result<ResponseCommit> {
        self.client.commit().await
    }
}

#[async_trait]
impl AppConnMempool for MempoolConnection {
    fn set_response_callback(&self, callback: ResponseCallback) {
        self.client.set_response_callback(callback)
    }

    fn error(&self) -> Option<Error> {
        self.client.error()
    }

    async fn check_tx(&self, request: RequestCheckTx) -> Result<ResponseCheckTx> {
        self.client.check_tx(request).await
    }

    async fn check_tx_async(&self, request: RequestCheckTx) -> Result<ReqRes> {
        self.client.check_tx_async(request).await
    }

    async fn flush(&self) -> Result<()> {
        self.client.flush().await
    }

    async fn flush_async(&self) -> Result<ReqRes> {
        self.client.flush_async().await
    }
}

#[async_trait]
impl AppConnQuery for QueryConnection {
    fn error(&self) -> Option<Error> {
        self.client.error()
    }

    async fn echo(&self, message: &str) -> Result<ResponseEcho> {
        self.client.echo(message).await
    }

    async fn info(&self, request: RequestInfo) -> Result<ResponseInfo> {
        self.client.info(request).await
    }

    async fn query(&self, request: RequestQuery) -> Result<ResponseQuery> {
        self.client.query(request).await
    }
}

#[async_trait]
impl AppConnSnapshot for SnapshotConnection {
    fn error(&self) -> Option<Error> {
        self.client.error()
    }

    async fn list_snapshots(&self, request: RequestListSnapshots) -> Result<ResponseListSnapshots> {
        self.client.list_snapshots(request).await
    }

    async fn offer_snapshot(&self, request: RequestOfferSnapshot) -> Result<ResponseOfferSnapshot> {
        self.client.offer_snapshot(request).await
    }

    async fn load_snapshot_chunk(
        &self,
        request: RequestLoadSnapshotChunk,
    ) -> Result<ResponseLoadSnapshotChunk> {
        self.client.load_snapshot_chunk(request).await
    }

    async fn apply_snapshot_chunk(
        &self,
        request: RequestApplySnapshotChunk,
    ) -> Result<ResponseApplySnapshotChunk> {
        self.client.apply_snapshot_chunk(request).await
    }
}

/// Builds the client behind the proxy connections
pub trait ClientCreator: Send + Sync {
    /// Creates a new (not yet started) client
    fn new_client(&self) -> Result<Box<dyn Client>>;
}

/// Creates local clients that all share one application instance
pub struct LocalClientCreator<A: Application> {
    app: AppMutex<A>,
}

impl<A: Application> LocalClientCreator<A> {
    /// Creates a new instance of [`LocalClientCreator`](self::LocalClientCreator)
    pub fn new(app: A) -> Self {
        Self::with_app(AppMutex::new(app))
    }

    /// Creates a creator sharing an existing [`AppMutex`]
    pub fn with_app(app: AppMutex<A>) -> Self {
        Self { app }
    }
}

impl<A: Application> ClientCreator for LocalClientCreator<A> {
    fn new_client(&self) -> Result<Box<dyn Client>> {
        Ok(Box::new(LocalClient::with_app(self.app.clone())))
    }
}

/// Creates socket or gRPC clients connecting to a remote application
#[derive(Debug, Clone)]
pub struct RemoteClientCreator {
    addr: String,
    transport: String,
    must_connect: bool,
}

impl RemoteClientCreator {
    /// Creates a new instance of [`RemoteClientCreator`](self::RemoteClientCreator)
    pub fn new(addr: impl Into<String>, transport: impl Into<String>, must_connect: bool) -> Self {
        Self {
            addr: addr.into(),
            transport: transport.into(),
            must_connect,
        }
    }
}

impl ClientCreator for RemoteClientCreator {
    fn new_client(&self) -> Result<Box<dyn Client>> {
        new_client(&self.addr, &self.transport, self.must_connect)
    }
}

/// Returns a local creator over [`BaseApplication`] for `"noop"`, and a remote creator (which must connect)
/// otherwise
pub fn default_client_creator(addr: &str, transport: &str) -> Box<dyn ClientCreator> {
    match addr {
        "noop" => Box::new(LocalClientCreator::new(BaseApplication)),
        _ => Box::new(RemoteClientCreator::new(addr, transport, true)),
    }
}

/// One client and the four facets built on it
pub struct AppConns {
    client: Arc<dyn Client>,
}

impl AppConns {
    /// Creates the client through `creator`; [`AppConns::start`] connects it
    pub fn new(creator: &dyn ClientCreator) -> Result<Self> {
        Ok(Self {
            client: Arc::from(creator.new_client()?),
        })
    }

    /// Starts the underlying client
    pub async fn start(&self) -> Result<()> {
        self.client.start().await?;
        info!(message = "Started proxy application connections");
        Ok(())
    }

    /// Stops the underlying client
    pub async fn stop(&self) -> Result<()> {
        self.client.stop().await?;
        info!(message = "Stopped proxy application connections");
        Ok(())
    }

    /// Returns the shared client
    pub fn client(&self) -> Arc<dyn Client> {
        self.client.clone()
    }

    /// Returns the consensus facet
    pub fn consensus(&self) -> ConsensusConnection {
        ConsensusConnection::new(self.client.clone())
    }

    /// Returns the mempool facet
    pub fn mempool(&self) -> MempoolConnection {
        MempoolConnection::new(self.client.clone())
    }

    /// Returns the query facet
    pub fn query(&self) -> QueryConnection {
        QueryConnection::new(self.client.clone())
    }

    /// Returns the snapshot facet
    pub fn snapshot(&self) -> SnapshotConnection {
        SnapshotConnection::new(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn check_noop_creator_serves_facets() {
        let conns = AppConns::new(default_client_creator("noop", "socket").as_ref()).unwrap();
        conns.start().await.unwrap();

        let query = conns.query();
        assert_eq!("hi", query.echo("hi").await.unwrap().message);

        let mempool = conns.mempool();
        let response = mempool
            .check_tx(RequestCheckTx {
                tx: b"tx".to_vec(),
                r#type: 0,
            })
            .await
            .unwrap();
        assert_eq!(0, response.code);
        mempool.flush().await.unwrap();
        assert!(mempool.error().is_none());

        let snapshot = conns.snapshot();
        let response = snapshot
            .offer_snapshot(RequestOfferSnapshot::default())
            .await
            .unwrap();
        assert_eq!(
            response_offer_snapshot::Result::Reject as i32,
            response.result
        );

        conns.stop().await.unwrap();
    }

    #[tokio::test]
    async fn check_remote_creator_rejects_bad_transport() {
        let creator = default_client_creator("tcp://127.0.0.1:26658", "quic");
        assert!(matches!(
            AppConns::new(creator.as_ref()),
            Err(Error::UnknownTransport(_))
        ));
    }

    #[tokio::test]
    async fn check_local_creator_shares_application() {
        let app = AppMutex::new(BaseApplication);
        let creator = LocalClientCreator::with_app(app);

        let first = AppConns::new(&creator).unwrap();
        let second = AppConns::new(&creator).unwrap();
        first.start().await.unwrap();
        second.start().await.unwrap();

        assert!(first.consensus().commit().await.is_ok());
        assert!(second.query().info(RequestInfo::default()).await.is_ok());
    }
}
