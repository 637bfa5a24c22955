use crate::proto::abci::{RequestCheckTx, ResponseCheckTx};
use crate::types::Event;
use crate::{Error, Result};

/// Whether a transaction is seen for the first time or re-checked after a block was committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CheckTxType {
    New = 0,
    Recheck = 1,
}

impl Default for CheckTxType {
    fn default() -> Self {
        Self::New
    }
}

impl From<CheckTxType> for i32 {
    fn from(kind: CheckTxType) -> i32 {
        kind as i32
    }
}

impl TryFrom<i32> for CheckTxType {
    type Error = Error;

    fn try_from(value: i32) -> Result<CheckTxType> {
        match value {
            0 => Ok(CheckTxType::New),
            1 => Ok(CheckTxType::Recheck),
            other => Err(Error::conversion(format!("unknown check tx type: {}", other))),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckTxRequest {
    /// The request transaction bytes
    pub tx: Vec<u8>,
    /// Type of check
    pub kind: CheckTxType,
}

impl TryFrom<RequestCheckTx> for CheckTxRequest {
    type Error = Error;

    fn try_from(request_check_tx: RequestCheckTx) -> Result<CheckTxRequest> {
        Ok(CheckTxRequest {
            tx: request_check_tx.tx,
            kind: CheckTxType::try_from(request_check_tx.r#type)?,
        })
    }
}

impl From<CheckTxRequest> for RequestCheckTx {
    fn from(check_tx_request: CheckTxRequest) -> RequestCheckTx {
        RequestCheckTx {
            tx: check_tx_request.tx,
            r#type: check_tx_request.kind.into(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckTxResponse {
    /// Response code (`0` means the transaction is accepted into the mempool)
    pub code: u32,
    /// Result bytes, if any.
    pub data: Vec<u8>,
    /// Output of application's logger (may be non-deterministic)
    pub log: String,
    /// Additional information (may be non-deterministic)
    pub info: String,
    /// Amount of gas requested for transaction
    pub gas_wanted: i64,
    /// Amount of gas consumed by transaction
    pub gas_used: i64,
    /// Events for filtering and indexing
    pub events: Vec<Event>,
    /// Namespace for the `code`
    pub codespace: String,
}

impl From<ResponseCheckTx> for CheckTxResponse {
    fn from(response_check_tx: ResponseCheckTx) -> CheckTxResponse {
        CheckTxResponse {
            code: response_check_tx.code,
            data: response_check_tx.data,
            log: response_check_tx.log,
            info: response_check_tx.info,
            gas_wanted: response_check_tx.gas_wanted,
            gas_used: response_check_tx.gas_used,
            events: response_check_tx
                .events
                .into_iter()
                .map(Into::into)
                .collect(),
            codespace: response_check_tx.codespace,
        }
    }
}

impl From<CheckTxResponse> for ResponseCheckTx {
    fn from(check_tx_response: CheckTxResponse) -> ResponseCheckTx {
        ResponseCheckTx {
            code: check_tx_response.code,
            data: check_tx_response.data,
            log: check_tx_response.log,
            info: check_tx_response.info,
            gas_wanted: check_tx_response.gas_wanted,
            gas_used: check_tx_response.gas_used,
            events: check_tx_response
                .events
                .into_iter()
                .map(Into::into)
                .collect(),
            codespace: check_tx_response.codespace,
        }
    }
}
