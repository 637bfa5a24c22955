#![allow(missing_docs)]
//! Application vocabulary of ABCI.
//!
//! Every wire message in [`crate::proto::abci`] has a counterpart here with the same fields. Conversions from the
//! wire are fallible ([`TryFrom`]) because the wire may carry unknown enum values or empty oneofs; conversions to the
//! wire are infallible ([`From`]).
pub mod code;

mod check_tx;
mod commit;
mod finalize_block;
mod info;
mod init_chain;
mod misc;
mod proposal;
mod query;
mod snapshot;
mod vote_extension;

pub use prost_types::{Duration, Timestamp};

pub use self::check_tx::*;
pub use self::commit::*;
pub use self::finalize_block::*;
pub use self::info::*;
pub use self::init_chain::*;
pub use self::misc::*;
pub use self::proposal::*;
pub use self::query::*;
pub use self::snapshot::*;
pub use self::vote_extension::*;

use crate::proto::abci::{
    request::Value as RequestValue, response::Value as ResponseValue, Request as ProtoRequest,
    Response as ProtoResponse,
};
use crate::proto::MessageKind;
use crate::{Error, Result};

pub(crate) fn convert_all<T, U>(items: Vec<T>) -> Result<Vec<U>>
where
    U: TryFrom<T, Error = Error>,
{
    items.into_iter().map(U::try_from).collect()
}

pub(crate) fn convert_option<T, U>(item: Option<T>) -> Result<Option<U>>
where
    U: TryFrom<T, Error = Error>,
{
    item.map(U::try_from).transpose()
}

/// Request in the application vocabulary
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Echo(EchoRequest),
    Flush(FlushRequest),
    Info(InfoRequest),
    InitChain(InitChainRequest),
    Query(QueryRequest),
    CheckTx(CheckTxRequest),
    PrepareProposal(PrepareProposalRequest),
    ProcessProposal(ProcessProposalRequest),
    ExtendVote(ExtendVoteRequest),
    VerifyVoteExtension(VerifyVoteExtensionRequest),
    FinalizeBlock(FinalizeBlockRequest),
    Commit(CommitRequest),
    ListSnapshots(ListSnapshotsRequest),
    OfferSnapshot(OfferSnapshotRequest),
    LoadSnapshotChunk(LoadSnapshotChunkRequest),
    ApplySnapshotChunk(ApplySnapshotChunkRequest),
}

impl Request {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Echo(_) => MessageKind::Echo,
            Self::Flush(_) => MessageKind::Flush,
            Self::Info(_) => MessageKind::Info,
            Self::InitChain(_) => MessageKind::InitChain,
            Self::Query(_) => MessageKind::Query,
            Self::CheckTx(_) => MessageKind::CheckTx,
            Self::PrepareProposal(_) => MessageKind::PrepareProposal,
            Self::ProcessProposal(_) => MessageKind::ProcessProposal,
            Self::ExtendVote(_) => MessageKind::ExtendVote,
            Self::VerifyVoteExtension(_) => MessageKind::VerifyVoteExtension,
            Self::FinalizeBlock(_) => MessageKind::FinalizeBlock,
            Self::Commit(_) => MessageKind::Commit,
            Self::ListSnapshots(_) => MessageKind::ListSnapshots,
            Self::OfferSnapshot(_) => MessageKind::OfferSnapshot,
            Self::LoadSnapshotChunk(_) => MessageKind::LoadSnapshotChunk,
            Self::ApplySnapshotChunk(_) => MessageKind::ApplySnapshotChunk,
        }
    }
}

impl TryFrom<ProtoRequest> for Request {
    type Error = Error;

    fn try_from(request: ProtoRequest) -> Result<Request> {
        let value = request.value.ok_or(Error::UnknownRequest)?;

        let request = match value {
            RequestValue::Echo(request) => Request::Echo(request.into()),
            RequestValue::Flush(request) => Request::Flush(request.into()),
            RequestValue::Info(request) => Request::Info(request.into()),
            RequestValue::InitChain(request) => Request::InitChain(request.try_into()?),
            RequestValue::Query(request) => Request::Query(request.into()),
            RequestValue::CheckTx(request) => Request::CheckTx(request.try_into()?),
            RequestValue::PrepareProposal(request) => {
                Request::PrepareProposal(request.try_into()?)
            }
            RequestValue::ProcessProposal(request) => {
                Request::ProcessProposal(request.try_into()?)
            }
            RequestValue::ExtendVote(request) => Request::ExtendVote(request.try_into()?),
            RequestValue::VerifyVoteExtension(request) => {
                Request::VerifyVoteExtension(request.into())
            }
            RequestValue::FinalizeBlock(request) => Request::FinalizeBlock(request.try_into()?),
            RequestValue::Commit(request) => Request::Commit(request.into()),
            RequestValue::ListSnapshots(request) => Request::ListSnapshots(request.into()),
            RequestValue::OfferSnapshot(request) => Request::OfferSnapshot(request.into()),
            RequestValue::LoadSnapshotChunk(request) => Request::LoadSnapshotChunk(request.into()),
            RequestValue::ApplySnapshotChunk(request) => {
                Request::ApplySnapshotChunk(request.into())
            }
        };

        Ok(request)
    }
}

impl From<Request> for ProtoRequest {
    fn from(request: Request) -> ProtoRequest {
        let value = match request {
            Request::Echo(request) => RequestValue::Echo(request.into()),
            Request::Flush(request) => RequestValue::Flush(request.into()),
            Request::Info(request) => RequestValue::Info(request.into()),
            Request::InitChain(request) => RequestValue::InitChain(request.into()),
            Request::Query(request) => RequestValue::Query(request.into()),
            Request::CheckTx(request) => RequestValue::CheckTx(request.into()),
            Request::PrepareProposal(request) => RequestValue::PrepareProposal(request.into()),
            Request::ProcessProposal(request) => RequestValue::ProcessProposal(request.into()),
            Request::ExtendVote(request) => RequestValue::ExtendVote(request.into()),
            Request::VerifyVoteExtension(request) => {
                RequestValue::VerifyVoteExtension(request.into())
            }
            Request::FinalizeBlock(request) => RequestValue::FinalizeBlock(request.into()),
            Request::Commit(request) => RequestValue::Commit(request.into()),
            Request::ListSnapshots(request) => RequestValue::ListSnapshots(request.into()),
            Request::OfferSnapshot(request) => RequestValue::OfferSnapshot(request.into()),
            Request::LoadSnapshotChunk(request) => RequestValue::LoadSnapshotChunk(request.into()),
            Request::ApplySnapshotChunk(request) => {
                RequestValue::ApplySnapshotChunk(request.into())
            }
        };

        ProtoRequest { value: Some(value) }
    }
}

/// Response in the application vocabulary
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Exception(ExceptionResponse),
    Echo(EchoResponse),
    Flush(FlushResponse),
    Info(InfoResponse),
    InitChain(InitChainResponse),
    Query(QueryResponse),
    CheckTx(CheckTxResponse),
    PrepareProposal(PrepareProposalResponse),
    ProcessProposal(ProcessProposalResponse),
    ExtendVote(ExtendVoteResponse),
    VerifyVoteExtension(VerifyVoteExtensionResponse),
    FinalizeBlock(FinalizeBlockResponse),
    Commit(CommitResponse),
    ListSnapshots(ListSnapshotsResponse),
    OfferSnapshot(OfferSnapshotResponse),
    LoadSnapshotChunk(LoadSnapshotChunkResponse),
    ApplySnapshotChunk(ApplySnapshotChunkResponse),
}

impl Response {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Exception(_) => MessageKind::Exception,
            Self::Echo(_) => MessageKind::Echo,
            Self::Flush(_) => MessageKind::Flush,
            Self::Info(_) => MessageKind::Info,
            Self::InitChain(_) => MessageKind::InitChain,
            Self::Query(_) => MessageKind::Query,
            Self::CheckTx(_) => MessageKind::CheckTx,
            Self::PrepareProposal(_) => MessageKind::PrepareProposal,
            Self::ProcessProposal(_) => MessageKind::ProcessProposal,
            Self::ExtendVote(_) => MessageKind::ExtendVote,
            Self::VerifyVoteExtension(_) => MessageKind::VerifyVoteExtension,
            Self::FinalizeBlock(_) => MessageKind::FinalizeBlock,
            Self::Commit(_) => MessageKind::Commit,
            Self::ListSnapshots(_) => MessageKind::ListSnapshots,
            Self::OfferSnapshot(_) => MessageKind::OfferSnapshot,
            Self::LoadSnapshotChunk(_) => MessageKind::LoadSnapshotChunk,
            Self::ApplySnapshotChunk(_) => MessageKind::ApplySnapshotChunk,
        }
    }
}

impl TryFrom<ProtoResponse> for Response {
    type Error = Error;

    fn try_from(response: ProtoResponse) -> Result<Response> {
        let value = response
            .value
            .ok_or_else(|| Error::conversion("response without value"))?;

        let response = match value {
            ResponseValue::Exception(response) => Response::Exception(response.into()),
            ResponseValue::Echo(response) => Response::Echo(response.into()),
            ResponseValue::Flush(response) => Response::Flush(response.into()),
            ResponseValue::Info(response) => Response::Info(response.into()),
            ResponseValue::InitChain(response) => Response::InitChain(response.try_into()?),
            ResponseValue::Query(response) => Response::Query(response.into()),
            ResponseValue::CheckTx(response) => Response::CheckTx(response.into()),
            ResponseValue::PrepareProposal(response) => {
                Response::PrepareProposal(response.into())
            }
            ResponseValue::ProcessProposal(response) => {
                Response::ProcessProposal(response.try_into()?)
            }
            ResponseValue::ExtendVote(response) => Response::ExtendVote(response.into()),
            ResponseValue::VerifyVoteExtension(response) => {
                Response::VerifyVoteExtension(response.try_into()?)
            }
            ResponseValue::FinalizeBlock(response) => {
                Response::FinalizeBlock(response.try_into()?)
            }
            ResponseValue::Commit(response) => Response::Commit(response.into()),
            ResponseValue::ListSnapshots(response) => Response::ListSnapshots(response.into()),
            ResponseValue::OfferSnapshot(response) => {
                Response::OfferSnapshot(response.try_into()?)
            }
            ResponseValue::LoadSnapshotChunk(response) => {
                Response::LoadSnapshotChunk(response.into())
            }
            ResponseValue::ApplySnapshotChunk(response) => {
                Response::ApplySnapshotChunk(response.try_into()?)
            }
        };

        Ok(response)
    }
}

impl From<Response> for ProtoResponse {
    fn from(response: Response) -> ProtoResponse {
        let value = match response {
            Response::Exception(response) => ResponseValue::Exception(response.into()),
            Response::Echo(response) => ResponseValue::Echo(response.into()),
            Response::Flush(response) => ResponseValue::Flush(response.into()),
            Response::Info(response) => ResponseValue::Info(response.into()),
            Response::InitChain(response) => ResponseValue::InitChain(response.into()),
            Response::Query(response) => ResponseValue::Query(response.into()),
            Response::CheckTx(response) => ResponseValue::CheckTx(response.into()),
            Response::PrepareProposal(response) => ResponseValue::PrepareProposal(response.into()),
            Response::ProcessProposal(response) => ResponseValue::ProcessProposal(response.into()),
            Response::ExtendVote(response) => ResponseValue::ExtendVote(response.into()),
            Response::VerifyVoteExtension(response) => {
                ResponseValue::VerifyVoteExtension(response.into())
            }
            Response::FinalizeBlock(response) => ResponseValue::FinalizeBlock(response.into()),
            Response::Commit(response) => ResponseValue::Commit(response.into()),
            Response::ListSnapshots(response) => ResponseValue::ListSnapshots(response.into()),
            Response::OfferSnapshot(response) => ResponseValue::OfferSnapshot(response.into()),
            Response::LoadSnapshotChunk(response) => {
                ResponseValue::LoadSnapshotChunk(response.into())
            }
            Response::ApplySnapshotChunk(response) => {
                ResponseValue::ApplySnapshotChunk(response.into())
            }
        };

        ProtoResponse { value: Some(value) }
    }
}
