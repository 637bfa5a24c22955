use crate::proto::abci::{
    RequestEcho, RequestFlush, RequestInfo, ResponseEcho, ResponseException, ResponseFlush,
    ResponseInfo,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    /// Message to be echoed back
    pub message: String,
}

impl From<RequestEcho> for EchoRequest {
    fn from(request_echo: RequestEcho) -> EchoRequest {
        EchoRequest {
            message: request_echo.message,
        }
    }
}

impl From<EchoRequest> for RequestEcho {
    fn from(echo_request: EchoRequest) -> RequestEcho {
        RequestEcho {
            message: echo_request.message,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EchoResponse {
    /// Echoed message
    pub message: String,
}

impl From<ResponseEcho> for EchoResponse {
    fn from(response_echo: ResponseEcho) -> EchoResponse {
        EchoResponse {
            message: response_echo.message,
        }
    }
}

impl From<EchoResponse> for ResponseEcho {
    fn from(echo_response: EchoResponse) -> ResponseEcho {
        ResponseEcho {
            message: echo_response.message,
        }
    }
}

/// Barrier on the wire; never reaches the application
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushRequest;

impl From<RequestFlush> for FlushRequest {
    fn from(_: RequestFlush) -> FlushRequest {
        FlushRequest
    }
}

impl From<FlushRequest> for RequestFlush {
    fn from(_: FlushRequest) -> RequestFlush {
        RequestFlush {}
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushResponse;

impl From<ResponseFlush> for FlushResponse {
    fn from(_: ResponseFlush) -> FlushResponse {
        FlushResponse
    }
}

impl From<FlushResponse> for ResponseFlush {
    fn from(_: FlushResponse) -> ResponseFlush {
        ResponseFlush {}
    }
}

/// Error reported by the server in place of a regular response
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExceptionResponse {
    pub error: String,
}

impl From<ResponseException> for ExceptionResponse {
    fn from(response_exception: ResponseException) -> ExceptionResponse {
        ExceptionResponse {
            error: response_exception.error,
        }
    }
}

impl From<ExceptionResponse> for ResponseException {
    fn from(exception_response: ExceptionResponse) -> ResponseException {
        ResponseException {
            error: exception_response.error,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InfoRequest {
    /// Consensus engine software semantic version
    pub version: String,
    /// Consensus engine block protocol version
    pub block_version: u64,
    /// Consensus engine P2P protocol version
    pub p2p_version: u64,
    /// ABCI protocol version
    pub abci_version: String,
}

impl From<RequestInfo> for InfoRequest {
    fn from(request_info: RequestInfo) -> InfoRequest {
        InfoRequest {
            version: request_info.version,
            block_version: request_info.block_version,
            p2p_version: request_info.p2p_version,
            abci_version: request_info.abci_version,
        }
    }
}

impl From<InfoRequest> for RequestInfo {
    fn from(info_request: InfoRequest) -> RequestInfo {
        RequestInfo {
            version: info_request.version,
            block_version: info_request.block_version,
            p2p_version: info_request.p2p_version,
            abci_version: info_request.abci_version,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InfoResponse {
    /// Some arbitrary information
    pub data: String,
    /// Application software semantic version
    pub version: String,
    /// Application protocol version
    pub app_version: u64,
    /// Latest block for which the app has called Commit
    pub last_block_height: i64,
    /// Latest result of Commit
    pub last_block_app_hash: Vec<u8>,
}

impl From<ResponseInfo> for InfoResponse {
    fn from(response_info: ResponseInfo) -> InfoResponse {
        InfoResponse {
            data: response_info.data,
            version: response_info.version,
            app_version: response_info.app_version,
            last_block_height: response_info.last_block_height,
            last_block_app_hash: response_info.last_block_app_hash,
        }
    }
}

impl From<InfoResponse> for ResponseInfo {
    fn from(info_response: InfoResponse) -> ResponseInfo {
        ResponseInfo {
            data: info_response.data,
            version: info_response.version,
            app_version: info_response.app_version,
            last_block_height: info_response.last_block_height,
            last_block_app_hash: info_response.last_block_app_hash,
        }
    }
}
