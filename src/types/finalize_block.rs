use prost_types::Timestamp;

use crate::proto::abci::{RequestFinalizeBlock, ResponseFinalizeBlock};
use crate::types::{
    convert_all, convert_option, CommitInfo, ConsensusParams, Event, ExecTxResult, Misbehavior,
    ValidatorUpdate,
};
use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FinalizeBlockRequest {
    /// Transactions of the decided block, to be executed in order
    pub txs: Vec<Vec<u8>>,
    /// Votes of the previous block
    pub decided_last_commit: Option<CommitInfo>,
    /// Evidence of validator misbehavior
    pub misbehavior: Vec<Misbehavior>,
    /// Merkle root hash of the fields of the decided block
    pub hash: Vec<u8>,
    /// Height of the decided block
    pub height: i64,
    /// Timestamp of the decided block
    pub time: Option<Timestamp>,
    /// Merkle root of the next validator set
    pub next_validators_hash: Vec<u8>,
    /// Address of the validator that created the proposal
    pub proposer_address: Vec<u8>,
}

impl TryFrom<RequestFinalizeBlock> for FinalizeBlockRequest {
    type Error = Error;

    fn try_from(request: RequestFinalizeBlock) -> Result<FinalizeBlockRequest> {
        Ok(FinalizeBlockRequest {
            txs: request.txs,
            decided_last_commit: convert_option(request.decided_last_commit)?,
            misbehavior: convert_all(request.misbehavior)?,
            hash: request.hash,
            height: request.height,
            time: request.time,
            next_validators_hash: request.next_validators_hash,
            proposer_address: request.proposer_address,
        })
    }
}

impl From<FinalizeBlockRequest> for RequestFinalizeBlock {
    fn from(request: FinalizeBlockRequest) -> RequestFinalizeBlock {
        RequestFinalizeBlock {
            txs: request.txs,
            decided_last_commit: request.decided_last_commit.map(Into::into),
            misbehavior: request.misbehavior.into_iter().map(Into::into).collect(),
            hash: request.hash,
            height: request.height,
            time: request.time,
            next_validators_hash: request.next_validators_hash,
            proposer_address: request.proposer_address,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FinalizeBlockResponse {
    /// Block level events
    pub events: Vec<Event>,
    /// Result of each transaction, in the order the transactions appear in the block
    pub tx_results: Vec<ExecTxResult>,
    /// Changes to the validator set (applied at height + 2)
    pub validator_updates: Vec<ValidatorUpdate>,
    /// Changes to the consensus-critical parameters, if any
    pub consensus_param_updates: Option<ConsensusParams>,
    /// Hash of the application state after executing the block
    pub app_hash: Vec<u8>,
}

impl TryFrom<ResponseFinalizeBlock> for FinalizeBlockResponse {
    type Error = Error;

    fn try_from(response: ResponseFinalizeBlock) -> Result<FinalizeBlockResponse> {
        Ok(FinalizeBlockResponse {
            events: response.events.into_iter().map(Into::into).collect(),
            tx_results: response.tx_results.into_iter().map(Into::into).collect(),
            validator_updates: convert_all(response.validator_updates)?,
            consensus_param_updates: response.consensus_param_updates.map(Into::into),
            app_hash: response.app_hash,
        })
    }
}

impl From<FinalizeBlockResponse> for ResponseFinalizeBlock {
    fn from(response: FinalizeBlockResponse) -> ResponseFinalizeBlock {
        ResponseFinalizeBlock {
            events: response.events.into_iter().map(Into::into).collect(),
            tx_results: response.tx_results.into_iter().map(Into::into).collect(),
            validator_updates: response
                .validator_updates
                .into_iter()
                .map(Into::into)
                .collect(),
            consensus_param_updates: response.consensus_param_updates.map(Into::into),
            app_hash: response.app_hash,
        }
    }
}
