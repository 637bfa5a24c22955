use crate::proto::abci::{RequestQuery, ResponseQuery};
use crate::types::ProofOps;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Raw query bytes (can be used with or in lieu of `path`)
    pub data: Vec<u8>,
    /// Path of request, like an HTTP GET path (can be used with or in lieu of `data`)
    ///
    /// # Note
    ///
    /// - Apps MUST interpret '/store' as a query by key on the underlying store. The key SHOULD be specified in the
    ///   `data` field
    /// - Apps SHOULD allow queries over specific types like '/accounts/...' or '/votes/...'
    pub path: String,
    /// Block height for which you want the query (default=0 returns data for the latest committed block)
    ///
    /// # Note
    ///
    /// This is the height of the block containing the application's Merkle root hash, which represents the state as it
    /// was after committing the block at `height-1`
    pub height: i64,
    /// Return Merkle proof with response if possible
    pub prove: bool,
}

impl From<RequestQuery> for QueryRequest {
    fn from(request_query: RequestQuery) -> QueryRequest {
        QueryRequest {
            data: request_query.data,
            path: request_query.path,
            height: request_query.height,
            prove: request_query.prove,
        }
    }
}

impl From<QueryRequest> for RequestQuery {
    fn from(query_request: QueryRequest) -> RequestQuery {
        RequestQuery {
            data: query_request.data,
            path: query_request.path,
            height: query_request.height,
            prove: query_request.prove,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    /// Response code (`0` means OK)
    pub code: u32,
    /// Output of application's logger (may be non-deterministic)
    pub log: String,
    /// Additional information (may be non-deterministic)
    pub info: String,
    /// Index of the key in the tree
    pub index: i64,
    /// Key of the matching data
    pub key: Vec<u8>,
    /// Value of the matching data
    pub value: Vec<u8>,
    /// Serialized proof for the value data, if requested, to be verified against the app_hash for the given height
    pub proof_ops: Option<ProofOps>,
    /// Block height from which data was derived
    ///
    /// # Note
    ///
    /// this is the height of the block containing the application's Merkle root hash, which represents the state as it
    /// was after committing the block at `height-1`
    pub height: i64,
    /// Namespace for the `code`
    pub codespace: String,
}

impl From<ResponseQuery> for QueryResponse {
    fn from(response_query: ResponseQuery) -> QueryResponse {
        QueryResponse {
            code: response_query.code,
            log: response_query.log,
            info: response_query.info,
            index: response_query.index,
            key: response_query.key,
            value: response_query.value,
            proof_ops: response_query.proof_ops.map(Into::into),
            height: response_query.height,
            codespace: response_query.codespace,
        }
    }
}

impl From<QueryResponse> for ResponseQuery {
    fn from(query_response: QueryResponse) -> ResponseQuery {
        ResponseQuery {
            code: query_response.code,
            log: query_response.log,
            info: query_response.info,
            index: query_response.index,
            key: query_response.key,
            value: query_response.value,
            proof_ops: query_response.proof_ops.map(Into::into),
            height: query_response.height,
            codespace: query_response.codespace,
        }
    }
}
