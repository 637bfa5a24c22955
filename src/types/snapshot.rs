use crate::proto::abci::{
    RequestApplySnapshotChunk, RequestListSnapshots, RequestLoadSnapshotChunk,
    RequestOfferSnapshot, ResponseApplySnapshotChunk, ResponseListSnapshots,
    ResponseLoadSnapshotChunk, ResponseOfferSnapshot, Snapshot as ProtoSnapshot,
};
use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The height at which the snapshot was taken (after commit)
    pub height: u64,
    /// An application-specific snapshot format, allowing applications to version their snapshot data format and make
    /// backwards-incompatible changes
    pub format: u32,
    /// The number of chunks in the snapshot
    pub chunks: u32,
    /// An arbitrary snapshot hash
    ///
    /// # Note
    ///
    /// This must be equal only for identical snapshots across nodes. The consensus engine does not use the hash for
    /// verification, this must be done by the app (e.g. in `apply_snapshot_chunk`).
    pub hash: Vec<u8>,
    /// Arbitrary application metadata, for example chunk hashes or other verification data
    pub metadata: Vec<u8>,
}

impl From<Snapshot> for ProtoSnapshot {
    fn from(snapshot: Snapshot) -> ProtoSnapshot {
        ProtoSnapshot {
            height: snapshot.height,
            format: snapshot.format,
            chunks: snapshot.chunks,
            hash: snapshot.hash,
            metadata: snapshot.metadata,
        }
    }
}

impl From<ProtoSnapshot> for Snapshot {
    fn from(proto_snapshot: ProtoSnapshot) -> Snapshot {
        Snapshot {
            height: proto_snapshot.height,
            format: proto_snapshot.format,
            chunks: proto_snapshot.chunks,
            hash: proto_snapshot.hash,
            metadata: proto_snapshot.metadata,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListSnapshotsRequest;

impl From<RequestListSnapshots> for ListSnapshotsRequest {
    fn from(_: RequestListSnapshots) -> ListSnapshotsRequest {
        ListSnapshotsRequest
    }
}

impl From<ListSnapshotsRequest> for RequestListSnapshots {
    fn from(_: ListSnapshotsRequest) -> RequestListSnapshots {
        RequestListSnapshots {}
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListSnapshotsResponse {
    /// List of local state snapshots
    pub snapshots: Vec<Snapshot>,
}

impl From<ResponseListSnapshots> for ListSnapshotsResponse {
    fn from(response: ResponseListSnapshots) -> ListSnapshotsResponse {
        ListSnapshotsResponse {
            snapshots: response.snapshots.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ListSnapshotsResponse> for ResponseListSnapshots {
    fn from(response: ListSnapshotsResponse) -> ResponseListSnapshots {
        ResponseListSnapshots {
            snapshots: response.snapshots.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OfferSnapshotRequest {
    /// Snapshot offered by peers
    pub snapshot: Option<Snapshot>,
    /// The light client-verified app hash for this height, from the blockchain
    pub app_hash: Vec<u8>,
}

impl From<RequestOfferSnapshot> for OfferSnapshotRequest {
    fn from(request: RequestOfferSnapshot) -> OfferSnapshotRequest {
        OfferSnapshotRequest {
            snapshot: request.snapshot.map(Into::into),
            app_hash: request.app_hash,
        }
    }
}

impl From<OfferSnapshotRequest> for RequestOfferSnapshot {
    fn from(request: OfferSnapshotRequest) -> RequestOfferSnapshot {
        RequestOfferSnapshot {
            snapshot: request.snapshot.map(Into::into),
            app_hash: request.app_hash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum OfferSnapshotResult {
    /// Unknown result, abort all snapshot restoration
    Unknown = 0,
    /// Snapshot accepted, apply chunks
    Accept = 1,
    /// Abort all snapshot restoration
    Abort = 2,
    /// Reject this specific snapshot, try others
    Reject = 3,
    /// Reject all snapshots of this format, try others
    RejectFormat = 4,
    /// Reject all snapshots from the sender(s), try others
    RejectSender = 5,
}

impl Default for OfferSnapshotResult {
    fn default() -> Self {
        Self::Unknown
    }
}

impl From<OfferSnapshotResult> for i32 {
    fn from(result: OfferSnapshotResult) -> i32 {
        result as i32
    }
}

impl TryFrom<i32> for OfferSnapshotResult {
    type Error = Error;

    fn try_from(value: i32) -> Result<OfferSnapshotResult> {
        match value {
            0 => Ok(OfferSnapshotResult::Unknown),
            1 => Ok(OfferSnapshotResult::Accept),
            2 => Ok(OfferSnapshotResult::Abort),
            3 => Ok(OfferSnapshotResult::Reject),
            4 => Ok(OfferSnapshotResult::RejectFormat),
            5 => Ok(OfferSnapshotResult::RejectSender),
            other => Err(Error::conversion(format!(
                "unknown offer snapshot result: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OfferSnapshotResponse {
    pub result: OfferSnapshotResult,
}

impl TryFrom<ResponseOfferSnapshot> for OfferSnapshotResponse {
    type Error = Error;

    fn try_from(response: ResponseOfferSnapshot) -> Result<OfferSnapshotResponse> {
        Ok(OfferSnapshotResponse {
            result: OfferSnapshotResult::try_from(response.result)?,
        })
    }
}

impl From<OfferSnapshotResponse> for ResponseOfferSnapshot {
    fn from(response: OfferSnapshotResponse) -> ResponseOfferSnapshot {
        ResponseOfferSnapshot {
            result: response.result.into(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSnapshotChunkRequest {
    /// The height of the snapshot the chunks belongs to
    pub height: u64,
    /// The application-specific format of the snapshot the chunk belongs to
    pub format: u32,
    /// The chunk index, starting from `0` for the initial chunk
    pub chunk: u32,
}

impl From<RequestLoadSnapshotChunk> for LoadSnapshotChunkRequest {
    fn from(request: RequestLoadSnapshotChunk) -> LoadSnapshotChunkRequest {
        LoadSnapshotChunkRequest {
            height: request.height,
            format: request.format,
            chunk: request.chunk,
        }
    }
}

impl From<LoadSnapshotChunkRequest> for RequestLoadSnapshotChunk {
    fn from(request: LoadSnapshotChunkRequest) -> RequestLoadSnapshotChunk {
        RequestLoadSnapshotChunk {
            height: request.height,
            format: request.format,
            chunk: request.chunk,
        }
    }
}

/// A chunk of a local snapshot
///
/// An empty chunk means the requested chunk is not available.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadSnapshotChunkResponse {
    /// The binary chunk contents, in an arbitray format
    ///
    /// # Note
    ///
    /// Chunk messages cannot be larger than 16 MB including metadata, so 10 MB is a good starting point.
    pub chunk: Vec<u8>,
}

impl LoadSnapshotChunkResponse {
    /// Response for a chunk that is not available
    pub fn missing() -> Self {
        Self::default()
    }

    /// Returns `true` if the requested chunk was not available
    pub fn is_missing(&self) -> bool {
        self.chunk.is_empty()
    }
}

impl From<ResponseLoadSnapshotChunk> for LoadSnapshotChunkResponse {
    fn from(response: ResponseLoadSnapshotChunk) -> LoadSnapshotChunkResponse {
        LoadSnapshotChunkResponse {
            chunk: response.chunk,
        }
    }
}

impl From<LoadSnapshotChunkResponse> for ResponseLoadSnapshotChunk {
    fn from(response: LoadSnapshotChunkResponse) -> ResponseLoadSnapshotChunk {
        ResponseLoadSnapshotChunk {
            chunk: response.chunk,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplySnapshotChunkRequest {
    /// The chunk index, starting from `0`
    ///
    /// # Note
    ///
    /// Chunks are applied sequentially in order.
    pub index: u32,
    /// The binary chunk contents, as returned by `load_snapshot_chunk`
    pub chunk: Vec<u8>,
    /// The P2P ID of the node who sent this chunk
    pub sender: String,
}

impl From<RequestApplySnapshotChunk> for ApplySnapshotChunkRequest {
    fn from(request: RequestApplySnapshotChunk) -> ApplySnapshotChunkRequest {
        ApplySnapshotChunkRequest {
            index: request.index,
            chunk: request.chunk,
            sender: request.sender,
        }
    }
}

impl From<ApplySnapshotChunkRequest> for RequestApplySnapshotChunk {
    fn from(request: ApplySnapshotChunkRequest) -> RequestApplySnapshotChunk {
        RequestApplySnapshotChunk {
            index: request.index,
            chunk: request.chunk,
            sender: request.sender,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ApplySnapshotChunkResult {
    /// Unknown result, abort all snapshot restoration
    Unknown = 0,
    /// The chunk was accepted
    Accept = 1,
    /// Abort snapshot restoration, and don't try any other snapshots
    Abort = 2,
    /// Reapply this chunk, combine with `refetch_chunks` and `reject_senders` as appropriate
    Retry = 3,
    /// Restart this snapshot from `offer_snapshot`, reusing chunks unless instructed otherwise
    RetrySnapshot = 4,
    /// Reject this snapshot, try a different one
    RejectSnapshot = 5,
}

impl Default for ApplySnapshotChunkResult {
    fn default() -> Self {
        Self::Unknown
    }
}

impl From<ApplySnapshotChunkResult> for i32 {
    fn from(result: ApplySnapshotChunkResult) -> i32 {
        result as i32
    }
}

impl TryFrom<i32> for ApplySnapshotChunkResult {
    type Error = Error;

    fn try_from(value: i32) -> Result<ApplySnapshotChunkResult> {
        match value {
            0 => Ok(ApplySnapshotChunkResult::Unknown),
            1 => Ok(ApplySnapshotChunkResult::Accept),
            2 => Ok(ApplySnapshotChunkResult::Abort),
            3 => Ok(ApplySnapshotChunkResult::Retry),
            4 => Ok(ApplySnapshotChunkResult::RetrySnapshot),
            5 => Ok(ApplySnapshotChunkResult::RejectSnapshot),
            other => Err(Error::conversion(format!(
                "unknown apply snapshot chunk result: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplySnapshotChunkResponse {
    /// The result of applying this chunk
    pub result: ApplySnapshotChunkResult,
    /// Refetch and reapply the given chunks, regardless of `result`
    ///
    /// # Note
    ///
    /// Only the listed chunks will be refetched, and reapplied in sequential order.
    pub refetch_chunks: Vec<u32>,
    /// Reject the given P2P senders, regardless of `result`
    ///
    /// # Note
    ///
    /// Any chunks already applied will not be refetched unless explicitly requested, but queued chunks from these
    /// senders will be discarded, and new chunks or other snapshots rejected.
    pub reject_senders: Vec<String>,
}

impl TryFrom<ResponseApplySnapshotChunk> for ApplySnapshotChunkResponse {
    type Error = Error;

    fn try_from(response: ResponseApplySnapshotChunk) -> Result<ApplySnapshotChunkResponse> {
        Ok(ApplySnapshotChunkResponse {
            result: ApplySnapshotChunkResult::try_from(response.result)?,
            refetch_chunks: response.refetch_chunks,
            reject_senders: response.reject_senders,
        })
    }
}

impl From<ApplySnapshotChunkResponse> for ResponseApplySnapshotChunk {
    fn from(response: ApplySnapshotChunkResponse) -> ResponseApplySnapshotChunk {
        ResponseApplySnapshotChunk {
            result: response.result.into(),
            refetch_chunks: response.refetch_chunks,
            reject_senders: response.reject_senders,
        }
    }
}
