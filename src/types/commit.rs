use crate::proto::abci::{RequestCommit, ResponseCommit};

/// Signals the application to persist the state computed by the last `FinalizeBlock`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitRequest;

impl From<RequestCommit> for CommitRequest {
    fn from(_: RequestCommit) -> CommitRequest {
        CommitRequest
    }
}

impl From<CommitRequest> for RequestCommit {
    fn from(_: CommitRequest) -> RequestCommit {
        RequestCommit {}
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitResponse {
    /// Blocks below this height may be removed (defaults to `0`, i.e. retain all blocks)
    pub retain_height: i64,
}

impl From<ResponseCommit> for CommitResponse {
    fn from(response_commit: ResponseCommit) -> CommitResponse {
        CommitResponse {
            retain_height: response_commit.retain_height,
        }
    }
}

impl From<CommitResponse> for ResponseCommit {
    fn from(commit_response: CommitResponse) -> ResponseCommit {
        ResponseCommit {
            retain_height: commit_response.retain_height,
        }
    }
}
