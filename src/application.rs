use crate::types::*;
use crate::Result;

/// An ABCI application
///
/// # Details
///
/// Every method has a default implementation (see [`BaseApplication`]), so an application only overrides the methods
/// it cares about. Methods take `&mut self`: the runtime guarantees that at most one method runs at a time on a given
/// application instance, no matter how many connections or clients share it.
///
/// Returning `Err` from a method is reported to the consensus engine as an `Exception` response. Application level
/// failures that are part of normal operation (e.g. rejecting a transaction) should instead be returned in-band with a
/// non-zero `code`.
///
/// # Determinism
///
/// [`init_chain`], [`finalize_block`] and [`commit`] must be deterministic functions of their inputs and the last
/// committed state. [`check_tx`], [`prepare_proposal`] and [`process_proposal`] may differ across nodes.
///
/// [`init_chain`]: Application::init_chain
/// [`finalize_block`]: Application::finalize_block
/// [`commit`]: Application::commit
/// [`check_tx`]: Application::check_tx
/// [`prepare_proposal`]: Application::prepare_proposal
/// [`process_proposal`]: Application::process_proposal
pub trait Application: Send + 'static {
    /// Echo a string to test abci client/server implementation.
    fn echo(&mut self, request: EchoRequest) -> Result<EchoResponse> {
        Ok(EchoResponse {
            message: request.message,
        })
    }

    /// Return information about the application state.
    ///
    /// # Crash Recovery
    ///
    /// On startup, the consensus engine calls the [`info`] method to get the **latest committed state** of the app.
    /// The app **MUST** return information consistent with the last block it successfully completed [`commit`] for.
    ///
    /// [`info`]: Application::info
    /// [`commit`]: Application::commit
    fn info(&mut self, _request: InfoRequest) -> Result<InfoResponse> {
        Ok(Default::default())
    }

    /// Query for data from the application at current or past height.
    fn query(&mut self, _request: QueryRequest) -> Result<QueryResponse> {
        Ok(QueryResponse {
            code: code::OK,
            ..Default::default()
        })
    }

    /// Guardian of the mempool: every node runs `check_tx` before letting a transaction into its local mempool.
    fn check_tx(&mut self, _request: CheckTxRequest) -> Result<CheckTxResponse> {
        Ok(CheckTxResponse {
            code: code::OK,
            ..Default::default()
        })
    }

    /// Called once upon genesis. Usually used to establish initial (genesis) state.
    fn init_chain(&mut self, _request: InitChainRequest) -> Result<InitChainResponse> {
        Ok(Default::default())
    }

    /// Lets the proposer modify the transactions of the block it is about to propose.
    ///
    /// The default keeps the longest prefix of `txs` whose total size fits in `max_tx_bytes`.
    fn prepare_proposal(
        &mut self,
        request: PrepareProposalRequest,
    ) -> Result<PrepareProposalResponse> {
        let max_tx_bytes = request.max_tx_bytes;
        let mut total_bytes: i64 = 0;

        let txs = request
            .txs
            .into_iter()
            .take_while(|tx| {
                total_bytes += tx.len() as i64;
                total_bytes <= max_tx_bytes
            })
            .collect();

        Ok(PrepareProposalResponse { txs })
    }

    /// Accepts or rejects a block proposed by another validator.
    fn process_proposal(
        &mut self,
        _request: ProcessProposalRequest,
    ) -> Result<ProcessProposalResponse> {
        Ok(ProcessProposalResponse::accept())
    }

    /// Attaches application data to this validator's precommit vote.
    fn extend_vote(&mut self, _request: ExtendVoteRequest) -> Result<ExtendVoteResponse> {
        Ok(Default::default())
    }

    /// Verifies the vote extension attached to another validator's precommit.
    fn verify_vote_extension(
        &mut self,
        _request: VerifyVoteExtensionRequest,
    ) -> Result<VerifyVoteExtensionResponse> {
        Ok(VerifyVoteExtensionResponse::accept())
    }

    /// Executes the transactions of a decided block.
    ///
    /// # Note
    ///
    /// `tx_results` must contain one entry per transaction, in block order. State changes must not be persisted before
    /// [`commit`](Application::commit) is called.
    fn finalize_block(&mut self, request: FinalizeBlockRequest) -> Result<FinalizeBlockResponse> {
        let tx_results = request
            .txs
            .iter()
            .map(|_| ExecTxResult {
                code: code::OK,
                ..Default::default()
            })
            .collect();

        Ok(FinalizeBlockResponse {
            tx_results,
            ..Default::default()
        })
    }

    /// Persist the application state computed by the last [`finalize_block`](Application::finalize_block).
    fn commit(&mut self, _request: CommitRequest) -> Result<CommitResponse> {
        Ok(Default::default())
    }

    /// Used during state sync to discover available snapshots on peers.
    fn list_snapshots(&mut self, _request: ListSnapshotsRequest) -> Result<ListSnapshotsResponse> {
        Ok(Default::default())
    }

    /// Called when bootstrapping the node using state sync.
    fn offer_snapshot(&mut self, _request: OfferSnapshotRequest) -> Result<OfferSnapshotResponse> {
        Ok(OfferSnapshotResponse {
            result: OfferSnapshotResult::Reject,
        })
    }

    /// Used during state sync to retrieve chunks of snapshots from peers.
    ///
    /// Return [`LoadSnapshotChunkResponse::missing`] when the chunk is not available.
    fn load_snapshot_chunk(
        &mut self,
        _request: LoadSnapshotChunkRequest,
    ) -> Result<LoadSnapshotChunkResponse> {
        Ok(LoadSnapshotChunkResponse::missing())
    }

    /// Apply the given snapshot chunk to the application's state.
    fn apply_snapshot_chunk(
        &mut self,
        _request: ApplySnapshotChunkRequest,
    ) -> Result<ApplySnapshotChunkResponse> {
        Ok(ApplySnapshotChunkResponse {
            result: ApplySnapshotChunkResult::RejectSnapshot,
            ..Default::default()
        })
    }
}

/// Application relying on the default implementation of every method
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseApplication;

impl Application for BaseApplication {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_prepare_proposal_respects_budget() {
        let mut app = BaseApplication;

        let response = app
            .prepare_proposal(PrepareProposalRequest {
                max_tx_bytes: 10,
                txs: vec![vec![1; 8], vec![2; 8]],
                height: 1,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(response.txs, vec![vec![1; 8]]);
    }

    #[test]
    fn check_prepare_proposal_keeps_prefix_only() {
        let mut app = BaseApplication;

        let response = app
            .prepare_proposal(PrepareProposalRequest {
                max_tx_bytes: 10,
                txs: vec![vec![1; 4], vec![2; 8], vec![3; 1]],
                height: 1,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(response.txs, vec![vec![1; 4]]);
    }

    #[test]
    fn check_base_defaults() {
        let mut app = BaseApplication;

        let echo = app
            .echo(EchoRequest {
                message: "ping".to_string(),
            })
            .unwrap();
        assert_eq!(echo.message, "ping");

        let offer = app.offer_snapshot(Default::default()).unwrap();
        assert_eq!(offer.result, OfferSnapshotResult::Reject);

        let apply = app.apply_snapshot_chunk(Default::default()).unwrap();
        assert_eq!(apply.result, ApplySnapshotChunkResult::RejectSnapshot);

        let chunk = app.load_snapshot_chunk(Default::default()).unwrap();
        assert!(chunk.is_missing());

        let process = app.process_proposal(Default::default()).unwrap();
        assert_eq!(process.status, ProposalStatus::Accept);

        let verify = app.verify_vote_extension(Default::default()).unwrap();
        assert_eq!(verify.status, VerifyStatus::Accept);

        let finalize = app
            .finalize_block(FinalizeBlockRequest {
                txs: vec![b"a".to_vec(), b"b".to_vec()],
                height: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(finalize.tx_results.len(), 2);
        assert!(finalize.tx_results.iter().all(|r| code::is_ok(r.code)));
    }
}
