use prost_types::Timestamp;

use crate::proto::abci::{RequestInitChain, ResponseInitChain};
use crate::types::{convert_all, ConsensusParams, ValidatorUpdate};
use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InitChainRequest {
    /// Genesis time
    pub time: Option<Timestamp>,
    /// ID of the blockchain
    pub chain_id: String,
    /// Initial consensus-critical parameters
    pub consensus_params: Option<ConsensusParams>,
    /// Initial genesis validators, sorted by voting power
    pub validators: Vec<ValidatorUpdate>,
    /// Serialized initial application state (amino-encoded JSON bytes)
    pub app_state_bytes: Vec<u8>,
    /// Height of the initial block (typically `1`)
    pub initial_height: i64,
}

impl TryFrom<RequestInitChain> for InitChainRequest {
    type Error = Error;

    fn try_from(request_init_chain: RequestInitChain) -> Result<InitChainRequest> {
        Ok(InitChainRequest {
            time: request_init_chain.time,
            chain_id: request_init_chain.chain_id,
            consensus_params: request_init_chain.consensus_params.map(Into::into),
            validators: convert_all(request_init_chain.validators)?,
            app_state_bytes: request_init_chain.app_state_bytes,
            initial_height: request_init_chain.initial_height,
        })
    }
}

impl From<InitChainRequest> for RequestInitChain {
    fn from(init_chain_request: InitChainRequest) -> RequestInitChain {
        RequestInitChain {
            time: init_chain_request.time,
            chain_id: init_chain_request.chain_id,
            consensus_params: init_chain_request.consensus_params.map(Into::into),
            validators: init_chain_request
                .validators
                .into_iter()
                .map(Into::into)
                .collect(),
            app_state_bytes: init_chain_request.app_state_bytes,
            initial_height: init_chain_request.initial_height,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InitChainResponse {
    /// Initial consensus-critical parameters
    ///
    /// # Note
    ///
    /// If this is set, it will override the consensus params sent in the request.
    pub consensus_params: Option<ConsensusParams>,
    /// Initial validator set
    ///
    /// # Note
    ///
    /// If this is non-empty, it will be the initial validator set instead of the genesis validators.
    pub validators: Vec<ValidatorUpdate>,
    /// Initial application hash
    pub app_hash: Vec<u8>,
}

impl TryFrom<ResponseInitChain> for InitChainResponse {
    type Error = Error;

    fn try_from(response_init_chain: ResponseInitChain) -> Result<InitChainResponse> {
        Ok(InitChainResponse {
            consensus_params: response_init_chain.consensus_params.map(Into::into),
            validators: convert_all(response_init_chain.validators)?,
            app_hash: response_init_chain.app_hash,
        })
    }
}

impl From<InitChainResponse> for ResponseInitChain {
    fn from(init_chain_response: InitChainResponse) -> ResponseInitChain {
        ResponseInitChain {
            consensus_params: init_chain_response.consensus_params.map(Into::into),
            validators: init_chain_response
                .validators
                .into_iter()
                .map(Into::into)
                .collect(),
            app_hash: init_chain_response.app_hash,
        }
    }
}
