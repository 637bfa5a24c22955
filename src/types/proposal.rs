use prost_types::Timestamp;

use crate::proto::abci::{
    RequestPrepareProposal, RequestProcessProposal, ResponsePrepareProposal,
    ResponseProcessProposal,
};
use crate::types::{convert_all, convert_option, CommitInfo, ExtendedCommitInfo, Misbehavior};
use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrepareProposalRequest {
    /// Upper bound on the total size of the transactions returned by the application
    pub max_tx_bytes: i64,
    /// Transactions from the mempool, in mempool order
    ///
    /// # Note
    ///
    /// Their total size may exceed `max_tx_bytes`.
    pub txs: Vec<Vec<u8>>,
    /// Votes of the previous block, including vote extensions
    pub local_last_commit: Option<ExtendedCommitInfo>,
    /// Evidence of validator misbehavior
    pub misbehavior: Vec<Misbehavior>,
    /// Height of the block being proposed
    pub height: i64,
    /// Timestamp of the block being proposed
    pub time: Option<Timestamp>,
    /// Merkle root of the next validator set
    pub next_validators_hash: Vec<u8>,
    /// Address of the validator creating the proposal
    pub proposer_address: Vec<u8>,
}

impl TryFrom<RequestPrepareProposal> for PrepareProposalRequest {
    type Error = Error;

    fn try_from(request: RequestPrepareProposal) -> Result<PrepareProposalRequest> {
        Ok(PrepareProposalRequest {
            max_tx_bytes: request.max_tx_bytes,
            txs: request.txs,
            local_last_commit: convert_option(request.local_last_commit)?,
            misbehavior: convert_all(request.misbehavior)?,
            height: request.height,
            time: request.time,
            next_validators_hash: request.next_validators_hash,
            proposer_address: request.proposer_address,
        })
    }
}

impl From<PrepareProposalRequest> for RequestPrepareProposal {
    fn from(request: PrepareProposalRequest) -> RequestPrepareProposal {
        RequestPrepareProposal {
            max_tx_bytes: request.max_tx_bytes,
            txs: request.txs,
            local_last_commit: request.local_last_commit.map(Into::into),
            misbehavior: request.misbehavior.into_iter().map(Into::into).collect(),
            height: request.height,
            time: request.time,
            next_validators_hash: request.next_validators_hash,
            proposer_address: request.proposer_address,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrepareProposalResponse {
    /// Transactions to include in the proposed block, in order
    pub txs: Vec<Vec<u8>>,
}

impl From<ResponsePrepareProposal> for PrepareProposalResponse {
    fn from(response: ResponsePrepareProposal) -> PrepareProposalResponse {
        PrepareProposalResponse { txs: response.txs }
    }
}

impl From<PrepareProposalResponse> for ResponsePrepareProposal {
    fn from(response: PrepareProposalResponse) -> ResponsePrepareProposal {
        ResponsePrepareProposal { txs: response.txs }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessProposalRequest {
    /// Transactions of the proposed block
    pub txs: Vec<Vec<u8>>,
    /// Votes of the previous block
    pub proposed_last_commit: Option<CommitInfo>,
    /// Evidence of validator misbehavior
    pub misbehavior: Vec<Misbehavior>,
    /// Merkle root hash of the fields of the proposed block
    pub hash: Vec<u8>,
    /// Height of the proposed block
    pub height: i64,
    /// Timestamp of the proposed block
    pub time: Option<Timestamp>,
    /// Merkle root of the next validator set
    pub next_validators_hash: Vec<u8>,
    /// Address of the validator that created the proposal
    pub proposer_address: Vec<u8>,
}

impl TryFrom<RequestProcessProposal> for ProcessProposalRequest {
    type Error = Error;

    fn try_from(request: RequestProcessProposal) -> Result<ProcessProposalRequest> {
        Ok(ProcessProposalRequest {
            txs: request.txs,
            proposed_last_commit: convert_option(request.proposed_last_commit)?,
            misbehavior: convert_all(request.misbehavior)?,
            hash: request.hash,
            height: request.height,
            time: request.time,
            next_validators_hash: request.next_validators_hash,
            proposer_address: request.proposer_address,
        })
    }
}

impl From<ProcessProposalRequest> for RequestProcessProposal {
    fn from(request: ProcessProposalRequest) -> RequestProcessProposal {
        RequestProcessProposal {
            txs: request.txs,
            proposed_last_commit: request.proposed_last_commit.map(Into::into),
            misbehavior: request.misbehavior.into_iter().map(Into::into).collect(),
            hash: request.hash,
            height: request.height,
            time: request.time,
            next_validators_hash: request.next_validators_hash,
            proposer_address: request.proposer_address,
        }
    }
}

/// Verdict on a proposed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ProposalStatus {
    Unknown = 0,
    Accept = 1,
    Reject = 2,
}

impl Default for ProposalStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl From<ProposalStatus> for i32 {
    fn from(status: ProposalStatus) -> i32 {
        status as i32
    }
}

impl TryFrom<i32> for ProposalStatus {
    type Error = Error;

    fn try_from(value: i32) -> Result<ProposalStatus> {
        match value {
            0 => Ok(ProposalStatus::Unknown),
            1 => Ok(ProposalStatus::Accept),
            2 => Ok(ProposalStatus::Reject),
            other => Err(Error::conversion(format!(
                "unknown proposal status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessProposalResponse {
    pub status: ProposalStatus,
}

impl ProcessProposalResponse {
    /// Accepts the proposal
    pub fn accept() -> Self {
        Self {
            status: ProposalStatus::Accept,
        }
    }

    /// Rejects the proposal
    pub fn reject() -> Self {
        Self {
            status: ProposalStatus::Reject,
        }
    }
}

impl TryFrom<ResponseProcessProposal> for ProcessProposalResponse {
    type Error = Error;

    fn try_from(response: ResponseProcessProposal) -> Result<ProcessProposalResponse> {
        Ok(ProcessProposalResponse {
            status: ProposalStatus::try_from(response.status)?,
        })
    }
}

impl From<ProcessProposalResponse> for ResponseProcessProposal {
    fn from(response: ProcessProposalResponse) -> ResponseProcessProposal {
        ResponseProcessProposal {
            status: response.status.into(),
        }
    }
}
