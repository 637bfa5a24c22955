use prost_types::{Duration, Timestamp};

use crate::proto::abci::{
    CommitInfo as ProtoCommitInfo, Event as ProtoEvent, EventAttribute as ProtoEventAttribute,
    ExecTxResult as ProtoExecTxResult, ExtendedCommitInfo as ProtoExtendedCommitInfo,
    ExtendedVoteInfo as ProtoExtendedVoteInfo, Misbehavior as ProtoMisbehavior,
    Validator as ProtoValidator, ValidatorUpdate as ProtoValidatorUpdate,
    VoteInfo as ProtoVoteInfo,
};
use crate::proto::crypto::{
    public_key::Sum as ProtoPublicKeySum, ProofOp as ProtoProofOp, ProofOps as ProtoProofOps,
    PublicKey as ProtoPublicKey,
};
use crate::proto::types::{
    AbciParams as ProtoAbciParams, BlockParams as ProtoBlockParams,
    ConsensusParams as ProtoConsensusParams, EvidenceParams as ProtoEvidenceParams,
    ValidatorParams as ProtoValidatorParams, VersionParams as ProtoVersionParams,
};
use crate::types::{convert_all, convert_option};
use crate::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConsensusParams {
    /// Parameters limiting the size of a block and time between consecutive blocks
    pub block: Option<BlockParams>,
    /// Parameters limiting the validity of evidence of byzantine behavior
    pub evidence: Option<EvidenceParams>,
    /// Parameters limiting the types of pubkeys validators can use
    pub validator: Option<ValidatorParams>,
    /// Version of the application
    pub version: Option<VersionParams>,
    /// Parameters specific to the application blockchain interface
    pub abci: Option<AbciParams>,
}

impl From<ConsensusParams> for ProtoConsensusParams {
    fn from(consensus_params: ConsensusParams) -> ProtoConsensusParams {
        ProtoConsensusParams {
            block: consensus_params.block.map(Into::into),
            evidence: consensus_params.evidence.map(Into::into),
            validator: consensus_params.validator.map(Into::into),
            version: consensus_params.version.map(Into::into),
            abci: consensus_params.abci.map(Into::into),
        }
    }
}

impl From<ProtoConsensusParams> for ConsensusParams {
    fn from(proto_consensus_params: ProtoConsensusParams) -> ConsensusParams {
        ConsensusParams {
            block: proto_consensus_params.block.map(Into::into),
            evidence: proto_consensus_params.evidence.map(Into::into),
            validator: proto_consensus_params.validator.map(Into::into),
            version: proto_consensus_params.version.map(Into::into),
            abci: proto_consensus_params.abci.map(Into::into),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockParams {
    /// Max size of a block, in bytes
    pub max_bytes: i64,
    /// Max sum of `gas_wanted` in a proposed block
    ///
    /// # Note
    ///
    /// Blocks that violate this may be committed if there are Byzantine proposers. It's the application's
    /// responsibility to handle this when processing a block!
    pub max_gas: i64,
}

impl From<BlockParams> for ProtoBlockParams {
    fn from(block_params: BlockParams) -> ProtoBlockParams {
        ProtoBlockParams {
            max_bytes: block_params.max_bytes,
            max_gas: block_params.max_gas,
        }
    }
}

impl From<ProtoBlockParams> for BlockParams {
    fn from(proto_block_params: ProtoBlockParams) -> BlockParams {
        BlockParams {
            max_bytes: proto_block_params.max_bytes,
            max_gas: proto_block_params.max_gas,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct EvidenceParams {
    /// Max age of evidence, in blocks
    pub max_age_num_blocks: i64,
    /// Max age of evidence, in time
    ///
    /// Evidence is considered stale once both `max_age_num_blocks` and `max_age_duration` have passed.
    pub max_age_duration: Option<Duration>,
    /// Maximum size in bytes of total evidence allowed to be entered into a block
    pub max_bytes: i64,
}

impl From<EvidenceParams> for ProtoEvidenceParams {
    fn from(evidence_params: EvidenceParams) -> ProtoEvidenceParams {
        ProtoEvidenceParams {
            max_age_num_blocks: evidence_params.max_age_num_blocks,
            max_age_duration: evidence_params.max_age_duration,
            max_bytes: evidence_params.max_bytes,
        }
    }
}

impl From<ProtoEvidenceParams> for EvidenceParams {
    fn from(proto_evidence_params: ProtoEvidenceParams) -> EvidenceParams {
        EvidenceParams {
            max_age_num_blocks: proto_evidence_params.max_age_num_blocks,
            max_age_duration: proto_evidence_params.max_age_duration,
            max_bytes: proto_evidence_params.max_bytes,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidatorParams {
    /// Public key types validators can use
    pub pub_key_types: Vec<String>,
}

impl From<ValidatorParams> for ProtoValidatorParams {
    fn from(validator_params: ValidatorParams) -> ProtoValidatorParams {
        ProtoValidatorParams {
            pub_key_types: validator_params.pub_key_types,
        }
    }
}

impl From<ProtoValidatorParams> for ValidatorParams {
    fn from(proto_validator_params: ProtoValidatorParams) -> ValidatorParams {
        ValidatorParams {
            pub_key_types: proto_validator_params.pub_key_types,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VersionParams {
    /// Application protocol version
    pub app: u64,
}

impl From<VersionParams> for ProtoVersionParams {
    fn from(version_params: VersionParams) -> ProtoVersionParams {
        ProtoVersionParams {
            app: version_params.app,
        }
    }
}

impl From<ProtoVersionParams> for VersionParams {
    fn from(proto_version_params: ProtoVersionParams) -> VersionParams {
        VersionParams {
            app: proto_version_params.app,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AbciParams {
    /// First height during which vote extensions are enabled (`0` disables them)
    pub vote_extensions_enable_height: i64,
}

impl From<AbciParams> for ProtoAbciParams {
    fn from(abci_params: AbciParams) -> ProtoAbciParams {
        ProtoAbciParams {
            vote_extensions_enable_height: abci_params.vote_extensions_enable_height,
        }
    }
}

impl From<ProtoAbciParams> for AbciParams {
    fn from(proto_abci_params: ProtoAbciParams) -> AbciParams {
        AbciParams {
            vote_extensions_enable_height: proto_abci_params.vote_extensions_enable_height,
        }
    }
}

/// Event emitted by a transaction or a block, used for filtering and indexing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Event {
    /// Type of event
    pub kind: String,
    /// Attributes of the event
    pub attributes: Vec<EventAttribute>,
}

impl From<Event> for ProtoEvent {
    fn from(event: Event) -> ProtoEvent {
        ProtoEvent {
            r#type: event.kind,
            attributes: event.attributes.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ProtoEvent> for Event {
    fn from(proto_event: ProtoEvent) -> Event {
        Event {
            kind: proto_event.r#type,
            attributes: proto_event.attributes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
    /// Whether the attribute should be indexed by the consensus engine
    pub index: bool,
}

impl From<EventAttribute> for ProtoEventAttribute {
    fn from(attribute: EventAttribute) -> ProtoEventAttribute {
        ProtoEventAttribute {
            key: attribute.key,
            value: attribute.value,
            index: attribute.index,
        }
    }
}

impl From<ProtoEventAttribute> for EventAttribute {
    fn from(proto_attribute: ProtoEventAttribute) -> EventAttribute {
        EventAttribute {
            key: proto_attribute.key,
            value: proto_attribute.value,
            index: proto_attribute.index,
        }
    }
}

/// Result of executing one transaction of a finalized block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecTxResult {
    /// Response code (`0` means OK)
    pub code: u32,
    /// Result bytes, if any
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

impl From<ExecTxResult> for ProtoExecTxResult {
    fn from(result: ExecTxResult) -> ProtoExecTxResult {
        ProtoExecTxResult {
            code: result.code,
            data: result.data,
            log: result.log,
            info: result.info,
            gas_wanted: result.gas_wanted,
            gas_used: result.gas_used,
            events: result.events.into_iter().map(Into::into).collect(),
            codespace: result.codespace,
        }
    }
}

impl From<ProtoExecTxResult> for ExecTxResult {
    fn from(proto_result: ProtoExecTxResult) -> ExecTxResult {
        ExecTxResult {
            code: proto_result.code,
            data: proto_result.data,
            log: proto_result.log,
            info: proto_result.info,
            gas_wanted: proto_result.gas_wanted,
            gas_used: proto_result.gas_used,
            events: proto_result.events.into_iter().map(Into::into).collect(),
            codespace: proto_result.codespace,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Validator {
    /// Address of the validator (hash of the public key)
    pub address: Vec<u8>,
    /// Voting power of the validator
    pub power: i64,
}

impl From<Validator> for ProtoValidator {
    fn from(validator: Validator) -> ProtoValidator {
        ProtoValidator {
            address: validator.address,
            power: validator.power,
        }
    }
}

impl From<ProtoValidator> for Validator {
    fn from(proto_validator: ProtoValidator) -> Validator {
        Validator {
            address: proto_validator.address,
            power: proto_validator.power,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(Vec<u8>),
    Secp256k1(Vec<u8>),
}

impl From<PublicKey> for ProtoPublicKey {
    fn from(public_key: PublicKey) -> ProtoPublicKey {
        let sum = match public_key {
            PublicKey::Ed25519(key) => ProtoPublicKeySum::Ed25519(key),
            PublicKey::Secp256k1(key) => ProtoPublicKeySum::Secp256k1(key),
        };

        ProtoPublicKey { sum: Some(sum) }
    }
}

impl TryFrom<ProtoPublicKey> for PublicKey {
    type Error = Error;

    fn try_from(proto_public_key: ProtoPublicKey) -> Result<PublicKey> {
        match proto_public_key.sum {
            Some(ProtoPublicKeySum::Ed25519(key)) => Ok(PublicKey::Ed25519(key)),
            Some(ProtoPublicKeySum::Secp256k1(key)) => Ok(PublicKey::Secp256k1(key)),
            None => Err(Error::conversion("public key without key type")),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidatorUpdate {
    /// Public key of the validator
    pub pub_key: Option<PublicKey>,
    /// New voting power (`0` removes the validator)
    pub power: i64,
}

impl From<ValidatorUpdate> for ProtoValidatorUpdate {
    fn from(validator_update: ValidatorUpdate) -> ProtoValidatorUpdate {
        ProtoValidatorUpdate {
            pub_key: validator_update.pub_key.map(Into::into),
            power: validator_update.power,
        }
    }
}

impl TryFrom<ProtoValidatorUpdate> for ValidatorUpdate {
    type Error = Error;

    fn try_from(proto_validator_update: ProtoValidatorUpdate) -> Result<ValidatorUpdate> {
        Ok(ValidatorUpdate {
            pub_key: convert_option(proto_validator_update.pub_key)?,
            power: proto_validator_update.power,
        })
    }
}

/// Indicates which block a vote was cast for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BlockIdFlag {
    Unknown = 0,
    /// The vote was not received
    Absent = 1,
    /// Voted for the block that received the majority
    Commit = 2,
    /// Voted for nil
    Nil = 3,
}

impl Default for BlockIdFlag {
    fn default() -> Self {
        Self::Unknown
    }
}

impl From<BlockIdFlag> for i32 {
    fn from(flag: BlockIdFlag) -> i32 {
        flag as i32
    }
}

impl TryFrom<i32> for BlockIdFlag {
    type Error = Error;

    fn try_from(value: i32) -> Result<BlockIdFlag> {
        match value {
            0 => Ok(BlockIdFlag::Unknown),
            1 => Ok(BlockIdFlag::Absent),
            2 => Ok(BlockIdFlag::Commit),
            3 => Ok(BlockIdFlag::Nil),
            other => Err(Error::conversion(format!("unknown block id flag: {}", other))),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VoteInfo {
    /// Validator that cast the vote
    pub validator: Option<Validator>,
    pub block_id_flag: BlockIdFlag,
}

impl From<VoteInfo> for ProtoVoteInfo {
    fn from(vote_info: VoteInfo) -> ProtoVoteInfo {
        ProtoVoteInfo {
            validator: vote_info.validator.map(Into::into),
            block_id_flag: vote_info.block_id_flag.into(),
        }
    }
}

impl TryFrom<ProtoVoteInfo> for VoteInfo {
    type Error = Error;

    fn try_from(proto_vote_info: ProtoVoteInfo) -> Result<VoteInfo> {
        Ok(VoteInfo {
            validator: proto_vote_info.validator.map(Into::into),
            block_id_flag: BlockIdFlag::try_from(proto_vote_info.block_id_flag)?,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtendedVoteInfo {
    /// Validator that cast the vote
    pub validator: Option<Validator>,
    /// Non-deterministic extension provided by the sending validator's application
    pub vote_extension: Vec<u8>,
    /// Signature of the vote extension, created by the consensus engine
    pub extension_signature: Vec<u8>,
    pub block_id_flag: BlockIdFlag,
}

impl From<ExtendedVoteInfo> for ProtoExtendedVoteInfo {
    fn from(vote_info: ExtendedVoteInfo) -> ProtoExtendedVoteInfo {
        ProtoExtendedVoteInfo {
            validator: vote_info.validator.map(Into::into),
            vote_extension: vote_info.vote_extension,
            extension_signature: vote_info.extension_signature,
            block_id_flag: vote_info.block_id_flag.into(),
        }
    }
}

impl TryFrom<ProtoExtendedVoteInfo> for ExtendedVoteInfo {
    type Error = Error;

    fn try_from(proto_vote_info: ProtoExtendedVoteInfo) -> Result<ExtendedVoteInfo> {
        Ok(ExtendedVoteInfo {
            validator: proto_vote_info.validator.map(Into::into),
            vote_extension: proto_vote_info.vote_extension,
            extension_signature: proto_vote_info.extension_signature,
            block_id_flag: BlockIdFlag::try_from(proto_vote_info.block_id_flag)?,
        })
    }
}

/// Votes of the last commit
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Round at which the block was decided
    pub round: i32,
    pub votes: Vec<VoteInfo>,
}

impl From<CommitInfo> for ProtoCommitInfo {
    fn from(commit_info: CommitInfo) -> ProtoCommitInfo {
        ProtoCommitInfo {
            round: commit_info.round,
            votes: commit_info.votes.into_iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<ProtoCommitInfo> for CommitInfo {
    type Error = Error;

    fn try_from(proto_commit_info: ProtoCommitInfo) -> Result<CommitInfo> {
        Ok(CommitInfo {
            round: proto_commit_info.round,
            votes: convert_all(proto_commit_info.votes)?,
        })
    }
}

/// Votes of the last commit including vote extensions (only seen by the proposer)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtendedCommitInfo {
    /// Round at which the block was decided
    pub round: i32,
    pub votes: Vec<ExtendedVoteInfo>,
}

impl From<ExtendedCommitInfo> for ProtoExtendedCommitInfo {
    fn from(commit_info: ExtendedCommitInfo) -> ProtoExtendedCommitInfo {
        ProtoExtendedCommitInfo {
            round: commit_info.round,
            votes: commit_info.votes.into_iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<ProtoExtendedCommitInfo> for ExtendedCommitInfo {
    type Error = Error;

    fn try_from(proto_commit_info: ProtoExtendedCommitInfo) -> Result<ExtendedCommitInfo> {
        Ok(ExtendedCommitInfo {
            round: proto_commit_info.round,
            votes: convert_all(proto_commit_info.votes)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MisbehaviorType {
    Unknown = 0,
    DuplicateVote = 1,
    LightClientAttack = 2,
}

impl Default for MisbehaviorType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl From<MisbehaviorType> for i32 {
    fn from(kind: MisbehaviorType) -> i32 {
        kind as i32
    }
}

impl TryFrom<i32> for MisbehaviorType {
    type Error = Error;

    fn try_from(value: i32) -> Result<MisbehaviorType> {
        match value {
            0 => Ok(MisbehaviorType::Unknown),
            1 => Ok(MisbehaviorType::DuplicateVote),
            2 => Ok(MisbehaviorType::LightClientAttack),
            other => Err(Error::conversion(format!(
                "unknown misbehavior type: {}",
                other
            ))),
        }
    }
}

/// Evidence of a validator misbehaving
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Misbehavior {
    pub kind: MisbehaviorType,
    /// The offending validator
    pub validator: Option<Validator>,
    /// Height when the offense occurred
    pub height: i64,
    /// Time when the offense occurred
    pub time: Option<Timestamp>,
    /// Total voting power of the validator set at `height`
    pub total_voting_power: i64,
}

impl From<Misbehavior> for ProtoMisbehavior {
    fn from(misbehavior: Misbehavior) -> ProtoMisbehavior {
        ProtoMisbehavior {
            r#type: misbehavior.kind.into(),
            validator: misbehavior.validator.map(Into::into),
            height: misbehavior.height,
            time: misbehavior.time,
            total_voting_power: misbehavior.total_voting_power,
        }
    }
}

impl TryFrom<ProtoMisbehavior> for Misbehavior {
    type Error = Error;

    fn try_from(proto_misbehavior: ProtoMisbehavior) -> Result<Misbehavior> {
        Ok(Misbehavior {
            kind: MisbehaviorType::try_from(proto_misbehavior.r#type)?,
            validator: proto_misbehavior.validator.map(Into::into),
            height: proto_misbehavior.height,
            time: proto_misbehavior.time,
            total_voting_power: proto_misbehavior.total_voting_power,
        })
    }
}

/// Merkle proof made of a chain of operations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProofOps {
    pub ops: Vec<ProofOp>,
}

impl From<ProofOps> for ProtoProofOps {
    fn from(proof_ops: ProofOps) -> ProtoProofOps {
        ProtoProofOps {
            ops: proof_ops.ops.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ProtoProofOps> for ProofOps {
    fn from(proto_proof_ops: ProtoProofOps) -> ProofOps {
        ProofOps {
            ops: proto_proof_ops.ops.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProofOp {
    /// Type of proof operation
    pub kind: String,
    /// Key used by the operation
    pub key: Vec<u8>,
    /// Encoded operation
    pub data: Vec<u8>,
}

impl From<ProofOp> for ProtoProofOp {
    fn from(proof_op: ProofOp) -> ProtoProofOp {
        ProtoProofOp {
            r#type: proof_op.kind,
            key: proof_op.key,
            data: proof_op.data,
        }
    }
}

impl From<ProtoProofOp> for ProofOp {
    fn from(proto_proof_op: ProtoProofOp) -> ProofOp {
        ProofOp {
            kind: proto_proof_op.r#type,
            key: proto_proof_op.key,
            data: proto_proof_op.data,
        }
    }
}
