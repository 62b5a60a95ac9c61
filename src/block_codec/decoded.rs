/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The fully expanded, inspectable form of a block.
//!
//! Every nested byte string of a [`Block`](crate::types::messages::Block) that holds a known message is
//! replaced by the decoded message, recursively, down to the typed configuration values and policies
//! (and, inside those, MSP definitions and Raft metadata). Byte strings that hold no known message, such
//! as signatures, certificates and hashes, are kept and serialize into JSON as Base64 strings.
//!
//! The types in this module implement [`serde::Serialize`]; their JSON form is what the
//! [block decoding endpoint](crate::service::ChannelService::decode_block) returns.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    config_tree::{ConfigGroup, ConfigPolicy, ConfigTree, ConfigValue},
    types::{
        data_types::{BlockNumber, ChannelID, Timestamp, Version},
        encoding::Base64Bytes,
        messages::HeaderType,
        policies::{ImplicitMetaPolicy, Policy, PolicyType, SignaturePolicyEnvelope},
        values::{
            Acls, AnchorPeers, BatchSize, BatchTimeout, BlockDataHashingStructure, Capabilities,
            ConsensusState, EtcdRaftMetadata, FabricMspConfig, HashingAlgorithm, OrdererAddresses,
        },
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedBlock {
    pub header: DecodedBlockHeader,
    pub data: DecodedBlockData,
    pub metadata: DecodedBlockMetadata,
}

impl DecodedBlock {
    /// Get the JSON form of this block.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Rebuild the configuration tree carried by the first `Config` envelope of this block. The tree is
    /// identical to the one that was encoded, down to the bytes of every value.
    pub fn config_tree(&self) -> Option<ConfigTree> {
        self.data
            .data
            .iter()
            .find_map(|envelope| match &envelope.payload.data {
                DecodedPayloadData::Config(config_envelope) => Some(ConfigTree {
                    sequence: config_envelope.config.sequence,
                    channel_group: ConfigGroup::from(&config_envelope.config.channel_group),
                }),
                _ => None,
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedBlockHeader {
    pub number: BlockNumber,
    pub previous_hash: Base64Bytes,
    pub data_hash: Base64Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedBlockData {
    pub data: Vec<DecodedEnvelope>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedBlockMetadata {
    pub metadata: Vec<Base64Bytes>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedEnvelope {
    pub payload: DecodedPayload,
    pub signature: Base64Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedPayload {
    pub header: DecodedHeader,
    pub data: DecodedPayloadData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedHeader {
    pub channel_header: DecodedChannelHeader,
    pub signature_header: DecodedSignatureHeader,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedChannelHeader {
    #[serde(rename = "type")]
    pub header_type: HeaderType,
    pub version: i32,
    pub timestamp: Option<Timestamp>,
    pub channel_id: ChannelID,
    pub tx_id: String,
    pub epoch: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedSignatureHeader {
    /// The signer, or `None` for unsigned payloads.
    pub creator: Option<DecodedIdentity>,
    pub nonce: Base64Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedIdentity {
    pub mspid: String,
    pub id_bytes: Base64Bytes,
}

/// A payload's data, decoded according to the payload's header type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedPayloadData {
    Config(Box<DecodedConfigEnvelope>),
    ConfigUpdate(DecodedConfigUpdateEnvelope),
    /// Data of payloads that carry neither a configuration nor a configuration update.
    Opaque(Base64Bytes),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedConfigEnvelope {
    pub config: DecodedConfig,
    pub last_update: Option<DecodedEnvelope>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedConfig {
    pub sequence: u64,
    pub channel_group: DecodedGroup,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedConfigUpdateEnvelope {
    pub config_update: DecodedConfigUpdate,
    pub signatures: Vec<DecodedConfigSignature>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedConfigUpdate {
    pub channel_id: ChannelID,
    pub read_set: DecodedGroup,
    pub write_set: DecodedGroup,
    pub isolated_data: BTreeMap<String, Base64Bytes>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedConfigSignature {
    pub signature_header: DecodedSignatureHeader,
    pub signature: Base64Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedGroup {
    pub version: Version,
    pub groups: BTreeMap<String, DecodedGroup>,
    pub values: BTreeMap<String, DecodedConfigValue>,
    pub policies: BTreeMap<String, DecodedConfigPolicy>,
    pub mod_policy: String,
}

impl From<&DecodedGroup> for ConfigGroup {
    fn from(group: &DecodedGroup) -> Self {
        ConfigGroup {
            version: group.version,
            groups: group
                .groups
                .iter()
                .map(|(name, group)| (name.clone(), ConfigGroup::from(group)))
                .collect(),
            values: group
                .values
                .iter()
                .map(|(name, value)| {
                    let value = ConfigValue {
                        version: value.version,
                        value: value.raw.clone(),
                        mod_policy: value.mod_policy.clone(),
                    };
                    (name.clone(), value)
                })
                .collect(),
            policies: group
                .policies
                .iter()
                .map(|(name, policy)| {
                    let policy = ConfigPolicy {
                        version: policy.version,
                        policy: policy.raw.clone(),
                        mod_policy: policy.mod_policy.clone(),
                    };
                    (name.clone(), policy)
                })
                .collect(),
            mod_policy: group.mod_policy.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedConfigValue {
    pub version: Version,
    pub value: DecodedValue,
    pub mod_policy: String,

    /// The value's bytes exactly as they were encoded.
    #[serde(skip)]
    pub(crate) raw: Vec<u8>,
}

/// The content of a configuration value, decoded according to the value's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    /// A value without content, i.e., a version-only reference in a read set or write set.
    Empty,
    Msp(DecodedMspConfig),
    AnchorPeers(AnchorPeers),
    Endpoints(OrdererAddresses),
    Capabilities(Capabilities),
    Acls(Acls),
    ConsensusType(DecodedConsensusType),
    BatchSize(BatchSize),
    BatchTimeout(BatchTimeout),
    HashingAlgorithm(HashingAlgorithm),
    BlockDataHashingStructure(BlockDataHashingStructure),
    /// A value whose name does not identify a known type.
    Opaque(Base64Bytes),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedMspConfig {
    #[serde(rename = "type")]
    pub msp_type: u32,
    pub config: DecodedMspBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedMspBody {
    Fabric(Box<FabricMspConfig>),
    /// The definition of an MSP of a type other than the Fabric MSP type.
    Opaque(Base64Bytes),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedConsensusType {
    #[serde(rename = "type")]
    pub consensus_type: String,
    pub metadata: DecodedConsensusMetadata,
    pub state: ConsensusState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedConsensusMetadata {
    Empty,
    EtcdRaft(EtcdRaftMetadata),
    Opaque(Base64Bytes),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedConfigPolicy {
    pub version: Version,
    pub policy: Option<DecodedPolicy>,
    pub mod_policy: String,

    /// The policy exactly as it was encoded.
    #[serde(skip)]
    pub(crate) raw: Option<Policy>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedPolicy {
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    pub value: DecodedPolicyBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedPolicyBody {
    ImplicitMeta(ImplicitMetaPolicy),
    Signature(SignaturePolicyEnvelope),
    /// The body of a policy of a type that this library does not interpret.
    Opaque(Base64Bytes),
}
