//! Wire (host) vocabulary of ABCI 2.0.
//!
//! Field numbers and wire types follow the `tendermint.abci`, `tendermint.crypto` and `tendermint.types` protobuf
//! packages, so frames produced here are understood by any ABCI 2.0 consensus engine.
#[allow(missing_docs)]
pub mod abci;
#[allow(missing_docs)]
pub mod crypto;
#[allow(missing_docs)]
pub mod types;

use std::fmt;

use self::abci::{request, response, Request, Response};

/// Name of each request/response variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `Echo`
    Echo,
    /// `Flush`
    Flush,
    /// `Info`
    Info,
    /// `InitChain`
    InitChain,
    /// `Query`
    Query,
    /// `CheckTx`
    CheckTx,
    /// `PrepareProposal`
    PrepareProposal,
    /// `ProcessProposal`
    ProcessProposal,
    /// `ExtendVote`
    ExtendVote,
    /// `VerifyVoteExtension`
    VerifyVoteExtension,
    /// `FinalizeBlock`
    FinalizeBlock,
    /// `Commit`
    Commit,
    /// `ListSnapshots`
    ListSnapshots,
    /// `OfferSnapshot`
    OfferSnapshot,
    /// `LoadSnapshotChunk`
    LoadSnapshotChunk,
    /// `ApplySnapshotChunk`
    ApplySnapshotChunk,
    /// `Exception` (responses only)
    Exception,
}

impl MessageKind {
    /// Returns the variant name as used by the gRPC service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Echo => "Echo",
            Self::Flush => "Flush",
            Self::Info => "Info",
            Self::InitChain => "InitChain",
            Self::Query => "Query",
            Self::CheckTx => "CheckTx",
            Self::PrepareProposal => "PrepareProposal",
            Self::ProcessProposal => "ProcessProposal",
            Self::ExtendVote => "ExtendVote",
            Self::VerifyVoteExtension => "VerifyVoteExtension",
            Self::FinalizeBlock => "FinalizeBlock",
            Self::Commit => "Commit",
            Self::ListSnapshots => "ListSnapshots",
            Self::OfferSnapshot => "OfferSnapshot",
            Self::LoadSnapshotChunk => "LoadSnapshotChunk",
            Self::ApplySnapshotChunk => "ApplySnapshotChunk",
            Self::Exception => "Exception",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl request::Value {
    /// Returns the variant of this request
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

impl response::Value {
    /// Returns the variant of this response
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

macro_rules! request_constructors {
    ($($(#[$meta:meta])* $name:ident($ty:ty) => $variant:ident;)*) => {
        impl Request {
            $(
                $(#[$meta])*
                pub fn $name(request: $ty) -> Self {
                    Self {
                        value: Some(request::Value::$variant(request)),
                    }
                }
            )*
        }
    };
}

macro_rules! response_constructors {
    ($($(#[$meta:meta])* $name:ident($ty:ty) => $variant:ident;)*) => {
        impl Response {
            $(
                $(#[$meta])*
                pub fn $name(response: $ty) -> Self {
                    Self {
                        value: Some(response::Value::$variant(response)),
                    }
                }
            )*
        }
    };
}

request_constructors! {
    /// Wraps an `Info` request
    info(abci::RequestInfo) => Info;
    /// Wraps an `InitChain` request
    init_chain(abci::RequestInitChain) => InitChain;
    /// Wraps a `Query` request
    query(abci::RequestQuery) => Query;
    /// Wraps a `CheckTx` request
    check_tx(abci::RequestCheckTx) => CheckTx;
    /// Wraps a `PrepareProposal` request
    prepare_proposal(abci::RequestPrepareProposal) => PrepareProposal;
    /// Wraps a `ProcessProposal` request
    process_proposal(abci::RequestProcessProposal) => ProcessProposal;
    /// Wraps an `ExtendVote` request
    extend_vote(abci::RequestExtendVote) => ExtendVote;
    /// Wraps a `VerifyVoteExtension` request
    verify_vote_extension(abci::RequestVerifyVoteExtension) => VerifyVoteExtension;
    /// Wraps a `FinalizeBlock` request
    finalize_block(abci::RequestFinalizeBlock) => FinalizeBlock;
    /// Wraps a `ListSnapshots` request
    list_snapshots(abci::RequestListSnapshots) => ListSnapshots;
    /// Wraps an `OfferSnapshot` request
    offer_snapshot(abci::RequestOfferSnapshot) => OfferSnapshot;
    /// Wraps a `LoadSnapshotChunk` request
    load_snapshot_chunk(abci::RequestLoadSnapshotChunk) => LoadSnapshotChunk;
    /// Wraps an `ApplySnapshotChunk` request
    apply_snapshot_chunk(abci::RequestApplySnapshotChunk) => ApplySnapshotChunk;
}

response_constructors! {
    /// Wraps an `Echo` response
    echo(abci::ResponseEcho) => Echo;
    /// Wraps an `Info` response
    info(abci::ResponseInfo) => Info;
    /// Wraps an `InitChain` response
    init_chain(abci::ResponseInitChain) => InitChain;
    /// Wraps a `Query` response
    query(abci::ResponseQuery) => Query;
    /// Wraps a `CheckTx` response
    check_tx(abci::ResponseCheckTx) => CheckTx;
    /// Wraps a `PrepareProposal` response
    prepare_proposal(abci::ResponsePrepareProposal) => PrepareProposal;
    /// Wraps a `ProcessProposal` response
    process_proposal(abci::ResponseProcessProposal) => ProcessProposal;
    /// Wraps an `ExtendVote` response
    extend_vote(abci::ResponseExtendVote) => ExtendVote;
    /// Wraps a `VerifyVoteExtension` response
    verify_vote_extension(abci::ResponseVerifyVoteExtension) => VerifyVoteExtension;
    /// Wraps a `FinalizeBlock` response
    finalize_block(abci::ResponseFinalizeBlock) => FinalizeBlock;
    /// Wraps a `Commit` response
    commit(abci::ResponseCommit) => Commit;
    /// Wraps a `ListSnapshots` response
    list_snapshots(abci::ResponseListSnapshots) => ListSnapshots;
    /// Wraps an `OfferSnapshot` response
    offer_snapshot(abci::ResponseOfferSnapshot) => OfferSnapshot;
    /// Wraps a `LoadSnapshotChunk` response
    load_snapshot_chunk(abci::ResponseLoadSnapshotChunk) => LoadSnapshotChunk;
    /// Wraps an `ApplySnapshotChunk` response
    apply_snapshot_chunk(abci::ResponseApplySnapshotChunk) => ApplySnapshotChunk;
}

impl Request {
    /// Creates an `Echo` request
    pub fn echo(message: impl Into<String>) -> Self {
        Self {
            value: Some(request::Value::Echo(abci::RequestEcho {
                message: message.into(),
            })),
        }
    }

    /// Creates a `Flush` request
    pub fn flush() -> Self {
        Self {
            value: Some(request::Value::Flush(Default::default())),
        }
    }

    /// Creates a `Commit` request
    pub fn commit() -> Self {
        Self {
            value: Some(request::Value::Commit(Default::default())),
        }
    }

    /// Returns the variant of this request (`None` if it carries no value)
    pub fn kind(&self) -> Option<MessageKind> {
        self.value.as_ref().map(request::Value::kind)
    }

    /// Returns `true` if this is a `Flush` request
    pub fn is_flush(&self) -> bool {
        matches!(self.value, Some(request::Value::Flush(_)))
    }
}

impl Response {
    /// Creates an `Exception` response
    pub fn exception(error: impl Into<String>) -> Self {
        Self {
            value: Some(response::Value::Exception(abci::ResponseException {
                error: error.into(),
            })),
        }
    }

    /// Creates a `Flush` response
    pub fn flush() -> Self {
        Self {
            value: Some(response::Value::Flush(Default::default())),
        }
    }

    /// Returns the variant of this response (`None` if it carries no value)
    pub fn kind(&self) -> Option<MessageKind> {
        self.value.as_ref().map(response::Value::kind)
    }

    /// Returns `true` if this is a `Flush` response
    pub fn is_flush(&self) -> bool {
        matches!(self.value, Some(response::Value::Flush(_)))
    }

    /// Returns `true` if this response answers `request`
    pub fn answers(&self, request: &Request) -> bool {
        match (request.kind(), self.kind()) {
            (Some(expected), Some(got)) => expected == got,
            _ => false,
        }
    }
}

/// Formats an optional variant for logs and errors
pub(crate) fn kind_name(kind: Option<MessageKind>) -> String {
    match kind {
        Some(kind) => kind.to_string(),
        None => "empty".to_string(),
    }
}
