use std::{io, sync::Arc, time::Duration};

use thiserror::Error;

use crate::proto::MessageKind;

/// Errors raised by ABCI servers, clients and the vocabulary adapter
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// I/O error on the underlying stream
    #[error("i/o error: {0}")]
    Io(Arc<io::Error>),
    /// Message could not be serialized (or is larger than the maximum frame size)
    #[error("failed to encode message: {0}")]
    Encode(String),
    /// Frame payload is not a valid protobuf message
    #[error("failed to decode message: {0}")]
    Decode(String),
    /// Frame length prefix is negative or larger than the maximum frame size
    #[error("invalid frame length: {length}")]
    InvalidFrameLength {
        /// Length read from the varint prefix
        length: i64,
    },
    /// Stream ended in the middle of a frame
    #[error("stream ended in the middle of a frame")]
    UnexpectedEof,
    /// Peer closed the connection
    #[error("connection closed by peer")]
    ConnectionClosed,
    /// Response variant does not match the variant of the request at the head of the queue
    #[error("unexpected {got} response to {expected} request")]
    UnexpectedResponse {
        /// Variant of the pending request
        expected: MessageKind,
        /// Variant that was received
        got: String,
    },
    /// A response arrived while no request was pending
    #[error("unsolicited {0} response")]
    UnsolicitedResponse(String),
    /// Server answered with an `Exception` response
    #[error("abci exception: {0}")]
    Exception(String),
    /// Request carries no (or an unknown) variant
    #[error("Unknown request")]
    UnknownRequest,
    /// Request failed client-side validation and was never sent
    #[error("invalid request: {0}")]
    Validation(String),
    /// Application method returned an error
    #[error("application error: {0}")]
    Application(String),
    /// Application method panicked
    #[error("application panicked: {0}")]
    AppPanic(String),
    /// Service or client has been stopped
    #[error("stopped")]
    Stopped,
    /// Service or client has already been started
    #[error("already started")]
    AlreadyStarted,
    /// Service or client has not been started yet
    #[error("not started")]
    NotStarted,
    /// Call did not complete in time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Transport name is neither `socket` nor `grpc`
    #[error("unknown abci transport: {0}")]
    UnknownTransport(String),
    /// Address could not be parsed or is unsupported by the transport
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// Message could not be converted between host and application vocabularies
    #[error("conversion error: {0}")]
    Conversion(String),
    /// gRPC call returned a non-OK status
    #[error("grpc status {code:?}: {message}")]
    Grpc {
        /// Status code
        code: tonic::Code,
        /// Status message
        message: String,
    },
    /// gRPC channel or server error
    #[error("grpc transport error: {0}")]
    Transport(String),
    /// Background task failed to run to completion
    #[error("task failed: {0}")]
    Join(String),
}

impl Error {
    /// Creates an application error from anything printable
    pub fn application(message: impl std::fmt::Display) -> Self {
        Self::Application(message.to_string())
    }

    pub(crate) fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion(message.into())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<prost::EncodeError> for Error {
    fn from(err: prost::EncodeError) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(err: prost::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::Grpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

/// Result type with [`Error`] as the default error
pub type Result<T, E = Error> = std::result::Result<T, E>;
