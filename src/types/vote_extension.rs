use prost_types::Timestamp;

use crate::proto::abci::{
    RequestExtendVote, RequestVerifyVoteExtension, ResponseExtendVote,
    ResponseVerifyVoteExtension,
};
use crate::types::{convert_all, convert_option, CommitInfo, Misbehavior};
use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtendVoteRequest {
    /// Hash of the block this vote refers to
    pub hash: Vec<u8>,
    /// Height of the extended vote
    pub height: i64,
    /// Timestamp of the block this vote refers to
    pub time: Option<Timestamp>,
    /// Transactions of the block this vote refers to
    pub txs: Vec<Vec<u8>>,
    /// Votes of the previous block
    pub proposed_last_commit: Option<CommitInfo>,
    /// Evidence of validator misbehavior
    pub misbehavior: Vec<Misbehavior>,
    /// Merkle root of the next validator set
    pub next_validators_hash: Vec<u8>,
    /// Address of the validator that created the proposal
    pub proposer_address: Vec<u8>,
}

impl TryFrom<RequestExtendVote> for ExtendVoteRequest {
    type Error = Error;

    fn try_from(request: RequestExtendVote) -> Result<ExtendVoteRequest> {
        Ok(ExtendVoteRequest {
            hash: request.hash,
            height: request.height,
            time: request.time,
            txs: request.txs,
            proposed_last_commit: convert_option(request.proposed_last_commit)?,
            misbehavior: convert_all(request.misbehavior)?,
            next_validators_hash: request.next_validators_hash,
            proposer_address: request.proposer_address,
        })
    }
}

impl From<ExtendVoteRequest> for RequestExtendVote {
    fn from(request: ExtendVoteRequest) -> RequestExtendVote {
        RequestExtendVote {
            hash: request.hash,
            height: request.height,
            time: request.time,
            txs: request.txs,
            proposed_last_commit: request.proposed_last_commit.map(Into::into),
            misbehavior: request.misbehavior.into_iter().map(Into::into).collect(),
            next_validators_hash: request.next_validators_hash,
            proposer_address: request.proposer_address,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtendVoteResponse {
    /// Application data attached to the precommit vote
    pub vote_extension: Vec<u8>,
}

impl From<ResponseExtendVote> for ExtendVoteResponse {
    fn from(response: ResponseExtendVote) -> ExtendVoteResponse {
        ExtendVoteResponse {
            vote_extension: response.vote_extension,
        }
    }
}

impl From<ExtendVoteResponse> for ResponseExtendVote {
    fn from(response: ExtendVoteResponse) -> ResponseExtendVote {
        ResponseExtendVote {
            vote_extension: response.vote_extension,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyVoteExtensionRequest {
    /// Hash of the block the received vote refers to
    pub hash: Vec<u8>,
    /// Address of the validator that signed the extension
    pub validator_address: Vec<u8>,
    pub height: i64,
    pub vote_extension: Vec<u8>,
}

impl From<RequestVerifyVoteExtension> for VerifyVoteExtensionRequest {
    fn from(request: RequestVerifyVoteExtension) -> VerifyVoteExtensionRequest {
        VerifyVoteExtensionRequest {
            hash: request.hash,
            validator_address: request.validator_address,
            height: request.height,
            vote_extension: request.vote_extension,
        }
    }
}

impl From<VerifyVoteExtensionRequest> for RequestVerifyVoteExtension {
    fn from(request: VerifyVoteExtensionRequest) -> RequestVerifyVoteExtension {
        RequestVerifyVoteExtension {
            hash: request.hash,
            validator_address: request.validator_address,
            height: request.height,
            vote_extension: request.vote_extension,
        }
    }
}

/// Verdict on a received vote extension
///
/// Rejecting an extension rejects the whole precommit of its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VerifyStatus {
    Unknown = 0,
    Accept = 1,
    Reject = 2,
}

impl Default for VerifyStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl From<VerifyStatus> for i32 {
    fn from(status: VerifyStatus) -> i32 {
        status as i32
    }
}

impl TryFrom<i32> for VerifyStatus {
    type Error = Error;

    fn try_from(value: i32) -> Result<VerifyStatus> {
        match value {
            0 => Ok(VerifyStatus::Unknown),
            1 => Ok(VerifyStatus::Accept),
            2 => Ok(VerifyStatus::Reject),
            other => Err(Error::conversion(format!(
                "unknown vote extension status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VerifyVoteExtensionResponse {
    pub status: VerifyStatus,
}

impl VerifyVoteExtensionResponse {
    /// Accepts the vote extension
    pub fn accept() -> Self {
        Self {
            status: VerifyStatus::Accept,
        }
    }

    /// Rejects the vote extension
    pub fn reject() -> Self {
        Self {
            status: VerifyStatus::Reject,
        }
    }
}

impl TryFrom<ResponseVerifyVoteExtension> for VerifyVoteExtensionResponse {
    type Error = Error;

    fn try_from(response: ResponseVerifyVoteExtension) -> Result<VerifyVoteExtensionResponse> {
        Ok(VerifyVoteExtensionResponse {
            status: VerifyStatus::try_from(response.status)?,
        })
    }
}

impl From<VerifyVoteExtensionResponse> for ResponseVerifyVoteExtension {
    fn from(response: VerifyVoteExtensionResponse) -> ResponseVerifyVoteExtension {
        ResponseVerifyVoteExtension {
            status: response.status.into(),
        }
    }
}
