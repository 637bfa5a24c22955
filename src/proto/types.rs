//! Messages of the `tendermint.types` protobuf package used by ABCI.

/// ConsensusParams contains consensus critical parameters that determine the validity of blocks
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsensusParams {
    #[prost(message, optional, tag = "1")]
    pub block: ::core::option::Option<BlockParams>,
    #[prost(message, optional, tag = "2")]
    pub evidence: ::core::option::Option<EvidenceParams>,
    #[prost(message, optional, tag = "3")]
    pub validator: ::core::option::Option<ValidatorParams>,
    #[prost(message, optional, tag = "4")]
    pub version: ::core::option::Option<VersionParams>,
    #[prost(message, optional, tag = "5")]
    pub abci: ::core::option::Option<AbciParams>,
}

/// BlockParams contains limits on the block size
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockParams {
    #[prost(int64, tag = "1")]
    pub max_bytes: i64,
    #[prost(int64, tag = "2")]
    pub max_gas: i64,
}

/// EvidenceParams determine how we handle evidence of malfeasance
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EvidenceParams {
    #[prost(int64, tag = "1")]
    pub max_age_num_blocks: i64,
    #[prost(message, optional, tag = "2")]
    pub max_age_duration: ::core::option::Option<::prost_types::Duration>,
    #[prost(int64, tag = "3")]
    pub max_bytes: i64,
}

/// ValidatorParams restrict the public key types validators can use
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidatorParams {
    #[prost(string, repeated, tag = "1")]
    pub pub_key_types: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

/// VersionParams contains the ABCI application version
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionParams {
    #[prost(uint64, tag = "1")]
    pub app: u64,
}

/// ABCIParams configure functionality specific to the Application Blockchain Interface
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AbciParams {
    #[prost(int64, tag = "1")]
    pub vote_extensions_enable_height: i64,
}
