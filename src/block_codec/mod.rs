/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Serialization of configurations into blocks, and decoding of configuration blocks.
//!
//! ## Encoding
//!
//! [`encode`] wraps a configuration tree into a genesis block: block number 0, an empty previous hash,
//! a single unsigned `Config` envelope whose payload carries the tree, a data hash computed over the
//! block's data, and [`BLOCK_METADATA_SLOTS`](crate::types::messages::BLOCK_METADATA_SLOTS) empty
//! metadata slots. [`config_block`] builds configuration blocks at other heights.
//!
//! ## Decoding
//!
//! [`decode`] parses every layer of a block (see the [messages](crate::types::messages) module for the
//! layering) into a [`DecodedBlock`]. Each layer that fails to parse produces a [`DecodeError`] that names
//! the layer, so callers can tell a truncated block from, for example, a malformed MSP definition.
//! [`extract_config`] is the cheaper alternative for callers that only need the configuration tree.

pub mod decoded;

use std::io;

use borsh::BorshDeserialize;

use crate::{
    config_tree::{ConfigGroup, ConfigPath, ConfigTree},
    types::{
        crypto_primitives::sha256,
        data_types::{BlockNumber, ChannelID, Timestamp},
        encoding::{serialize, Base64Bytes},
        messages::{
            Block, BlockData, BlockHeader, BlockMetadata, ChannelHeader, ConfigEnvelope,
            ConfigSignature, ConfigUpdate, ConfigUpdateEnvelope, Envelope, Header, HeaderType,
            Payload, SerializedIdentity, SignatureHeader,
        },
        policies::{Policy, PolicyType},
        values::{
            Acls, AnchorPeers, BatchSize, BatchTimeout, BlockDataHashingStructure, Capabilities,
            ConfigValueType, ConsensusType, EtcdRaftMetadata, FabricMspConfig, HashingAlgorithm,
            MspConfig, OrdererAddresses, FABRIC_MSP_TYPE,
        },
    },
};

use self::decoded::*;

/// Name of the consensus type whose metadata is [`EtcdRaftMetadata`].
const ETCD_RAFT: &str = "etcdraft";

/* ↓↓↓ Encoding ↓↓↓ */

/// Serialize the genesis block of the channel `channel_id` whose configuration is `tree`.
pub fn encode(tree: ConfigTree, channel_id: &ChannelID) -> Vec<u8> {
    serialize(&genesis_block(tree, channel_id, None))
}

/// Create the genesis block of the channel `channel_id` whose configuration is `tree`.
pub fn genesis_block(tree: ConfigTree, channel_id: &ChannelID, timestamp: Option<Timestamp>) -> Block {
    config_block(
        BlockNumber::new(0),
        Vec::new(),
        channel_id,
        ConfigEnvelope {
            config: tree,
            last_update: None,
        },
        timestamp,
    )
}

/// Create a block at height `number` that carries `config_envelope` in a single unsigned `Config`
/// envelope.
pub fn config_block(
    number: BlockNumber,
    previous_hash: Vec<u8>,
    channel_id: &ChannelID,
    config_envelope: ConfigEnvelope,
    timestamp: Option<Timestamp>,
) -> Block {
    let channel_header = ChannelHeader {
        header_type: HeaderType::Config,
        version: 0,
        timestamp,
        channel_id: channel_id.clone(),
        tx_id: String::new(),
        epoch: 0,
    };
    let envelope = Envelope {
        payload: serialize(&Payload {
            header: Header {
                channel_header: serialize(&channel_header),
                signature_header: serialize(&SignatureHeader::default()),
            },
            data: serialize(&config_envelope),
        }),
        signature: Vec::new(),
    };

    let data = BlockData {
        data: vec![serialize(&envelope)],
    };
    Block {
        header: BlockHeader {
            number,
            previous_hash,
            data_hash: data_hash(&data),
        },
        data,
        metadata: BlockMetadata::empty(),
    }
}

/// Compute the SHA256 hash of the concatenation of the entries of `data`.
pub fn data_hash(data: &BlockData) -> Vec<u8> {
    sha256(&data.data.concat())
}

/* ↓↓↓ Decoding ↓↓↓ */

/// Get the configuration tree carried by the first envelope of the block serialized in `bytes`.
pub fn extract_config(bytes: &[u8]) -> Result<ConfigTree, DecodeError> {
    let block = Block::try_from_slice(bytes).map_err(DecodeError::Block)?;
    let first = block.data.data.first().ok_or(DecodeError::NoConfigFound)?;
    let envelope = Envelope::try_from_slice(first).map_err(DecodeError::Envelope)?;
    let payload = Payload::try_from_slice(&envelope.payload).map_err(DecodeError::Payload)?;
    let channel_header = ChannelHeader::try_from_slice(&payload.header.channel_header)
        .map_err(DecodeError::ChannelHeader)?;
    if channel_header.header_type != HeaderType::Config {
        return Err(DecodeError::NoConfigFound);
    }
    let config_envelope =
        ConfigEnvelope::try_from_slice(&payload.data).map_err(DecodeError::ConfigEnvelope)?;
    Ok(config_envelope.config)
}

/// Decode the block serialized in `bytes` into its fully expanded form. The block must carry at least
/// one `Config` envelope.
pub fn decode(bytes: &[u8]) -> Result<DecodedBlock, DecodeError> {
    let block = Block::try_from_slice(bytes).map_err(DecodeError::Block)?;

    let data = block
        .data
        .data
        .iter()
        .map(|envelope_bytes| {
            let envelope =
                Envelope::try_from_slice(envelope_bytes).map_err(DecodeError::Envelope)?;
            decode_envelope(envelope)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let has_config = data
        .iter()
        .any(|envelope| matches!(envelope.payload.data, DecodedPayloadData::Config(_)));
    if !has_config {
        return Err(DecodeError::NoConfigFound);
    }

    Ok(DecodedBlock {
        header: DecodedBlockHeader {
            number: block.header.number,
            previous_hash: block.header.previous_hash.into(),
            data_hash: block.header.data_hash.into(),
        },
        data: DecodedBlockData { data },
        metadata: DecodedBlockMetadata {
            metadata: block.metadata.metadata.into_iter().map(Base64Bytes).collect(),
        },
    })
}

fn decode_envelope(envelope: Envelope) -> Result<DecodedEnvelope, DecodeError> {
    let payload = Payload::try_from_slice(&envelope.payload).map_err(DecodeError::Payload)?;
    let channel_header = ChannelHeader::try_from_slice(&payload.header.channel_header)
        .map_err(DecodeError::ChannelHeader)?;
    let signature_header = decode_signature_header(&payload.header.signature_header)?;

    let data = match channel_header.header_type {
        HeaderType::Config => {
            let config_envelope = ConfigEnvelope::try_from_slice(&payload.data)
                .map_err(DecodeError::ConfigEnvelope)?;
            let last_update = config_envelope
                .last_update
                .map(decode_envelope)
                .transpose()?;
            DecodedPayloadData::Config(Box::new(DecodedConfigEnvelope {
                config: DecodedConfig {
                    sequence: config_envelope.config.sequence,
                    channel_group: decode_group(
                        config_envelope.config.channel_group,
                        &ConfigPath::root(),
                    )?,
                },
                last_update,
            }))
        }
        HeaderType::ConfigUpdate => {
            let config_update_envelope = ConfigUpdateEnvelope::try_from_slice(&payload.data)
                .map_err(DecodeError::ConfigUpdateEnvelope)?;
            DecodedPayloadData::ConfigUpdate(decode_config_update_envelope(
                config_update_envelope,
            )?)
        }
        _ => DecodedPayloadData::Opaque(payload.data.into()),
    };

    Ok(DecodedEnvelope {
        payload: DecodedPayload {
            header: DecodedHeader {
                channel_header: DecodedChannelHeader {
                    header_type: channel_header.header_type,
                    version: channel_header.version,
                    timestamp: channel_header.timestamp,
                    channel_id: channel_header.channel_id,
                    tx_id: channel_header.tx_id,
                    epoch: channel_header.epoch,
                },
                signature_header,
            },
            data,
        },
        signature: envelope.signature.into(),
    })
}

fn decode_signature_header(bytes: &[u8]) -> Result<DecodedSignatureHeader, DecodeError> {
    let signature_header =
        SignatureHeader::try_from_slice(bytes).map_err(DecodeError::SignatureHeader)?;
    let creator = if signature_header.creator.is_empty() {
        None
    } else {
        let identity = SerializedIdentity::try_from_slice(&signature_header.creator)
            .map_err(DecodeError::SignatureHeader)?;
        Some(DecodedIdentity {
            mspid: identity.mspid,
            id_bytes: identity.id_bytes.into(),
        })
    };
    Ok(DecodedSignatureHeader {
        creator,
        nonce: signature_header.nonce.into(),
    })
}

fn decode_config_update_envelope(
    envelope: ConfigUpdateEnvelope,
) -> Result<DecodedConfigUpdateEnvelope, DecodeError> {
    let config_update = ConfigUpdate::try_from_slice(&envelope.config_update)
        .map_err(DecodeError::ConfigUpdate)?;
    let signatures = envelope
        .signatures
        .into_iter()
        .map(|ConfigSignature { signature_header, signature }| {
            Ok(DecodedConfigSignature {
                signature_header: decode_signature_header(&signature_header)?,
                signature: signature.into(),
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(DecodedConfigUpdateEnvelope {
        config_update: DecodedConfigUpdate {
            channel_id: config_update.channel_id,
            read_set: decode_group(config_update.read_set, &ConfigPath::root())?,
            write_set: decode_group(config_update.write_set, &ConfigPath::root())?,
            isolated_data: config_update
                .isolated_data
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect(),
        },
        signatures,
    })
}

fn decode_group(group: ConfigGroup, path: &ConfigPath) -> Result<DecodedGroup, DecodeError> {
    let mut values = std::collections::BTreeMap::new();
    for (name, value) in group.values {
        let value_path = path.value(&name);
        let decoded = decode_value(&name, &value.value).map_err(|source| DecodeError::ConfigValue {
            path: value_path,
            source,
        })?;
        values.insert(
            name,
            DecodedConfigValue {
                version: value.version,
                value: decoded,
                mod_policy: value.mod_policy,
                raw: value.value,
            },
        );
    }

    let mut policies = std::collections::BTreeMap::new();
    for (name, policy) in group.policies {
        let decoded = policy
            .policy
            .as_ref()
            .map(decode_policy)
            .transpose()
            .map_err(|source| DecodeError::Policy {
                path: path.policy(&name),
                source,
            })?;
        policies.insert(
            name,
            DecodedConfigPolicy {
                version: policy.version,
                policy: decoded,
                mod_policy: policy.mod_policy,
                raw: policy.policy,
            },
        );
    }

    let mut groups = std::collections::BTreeMap::new();
    for (name, child) in group.groups {
        let child_path = path.child(&name);
        groups.insert(name, decode_group(child, &child_path)?);
    }

    Ok(DecodedGroup {
        version: group.version,
        groups,
        values,
        policies,
        mod_policy: group.mod_policy,
    })
}

/// Decode the content of the configuration value `name`. Empty content is a version-only reference.
fn decode_value(name: &str, bytes: &[u8]) -> io::Result<DecodedValue> {
    if bytes.is_empty() {
        return Ok(DecodedValue::Empty);
    }

    let decoded = match name {
        MspConfig::KEY => {
            let msp = MspConfig::from_value_bytes(bytes)?;
            let config = if msp.msp_type == FABRIC_MSP_TYPE {
                DecodedMspBody::Fabric(Box::new(FabricMspConfig::try_from_slice(&msp.config)?))
            } else {
                DecodedMspBody::Opaque(msp.config.into())
            };
            DecodedValue::Msp(DecodedMspConfig {
                msp_type: msp.msp_type,
                config,
            })
        }
        AnchorPeers::KEY => DecodedValue::AnchorPeers(AnchorPeers::from_value_bytes(bytes)?),
        OrdererAddresses::KEY => {
            DecodedValue::Endpoints(OrdererAddresses::from_value_bytes(bytes)?)
        }
        Capabilities::KEY => DecodedValue::Capabilities(Capabilities::from_value_bytes(bytes)?),
        Acls::KEY => DecodedValue::Acls(Acls::from_value_bytes(bytes)?),
        ConsensusType::KEY => {
            let consensus_type = ConsensusType::from_value_bytes(bytes)?;
            let metadata = if consensus_type.metadata.is_empty() {
                DecodedConsensusMetadata::Empty
            } else if consensus_type.consensus_type == ETCD_RAFT {
                DecodedConsensusMetadata::EtcdRaft(EtcdRaftMetadata::try_from_slice(
                    &consensus_type.metadata,
                )?)
            } else {
                DecodedConsensusMetadata::Opaque(consensus_type.metadata.into())
            };
            DecodedValue::ConsensusType(DecodedConsensusType {
                consensus_type: consensus_type.consensus_type,
                metadata,
                state: consensus_type.state,
            })
        }
        BatchSize::KEY => DecodedValue::BatchSize(BatchSize::from_value_bytes(bytes)?),
        BatchTimeout::KEY => DecodedValue::BatchTimeout(BatchTimeout::from_value_bytes(bytes)?),
        HashingAlgorithm::KEY => {
            DecodedValue::HashingAlgorithm(HashingAlgorithm::from_value_bytes(bytes)?)
        }
        BlockDataHashingStructure::KEY => DecodedValue::BlockDataHashingStructure(
            BlockDataHashingStructure::from_value_bytes(bytes)?,
        ),
        _ => DecodedValue::Opaque(bytes.to_vec().into()),
    };
    Ok(decoded)
}

fn decode_policy(policy: &Policy) -> io::Result<DecodedPolicy> {
    let value = match policy.policy_type {
        PolicyType::ImplicitMeta => {
            DecodedPolicyBody::ImplicitMeta(BorshDeserialize::try_from_slice(&policy.value)?)
        }
        PolicyType::Signature => {
            DecodedPolicyBody::Signature(BorshDeserialize::try_from_slice(&policy.value)?)
        }
        PolicyType::Unknown | PolicyType::Msp => DecodedPolicyBody::Opaque(policy.value.clone().into()),
    };
    Ok(DecodedPolicy {
        policy_type: policy.policy_type,
        value,
    })
}

/// The layer of a block at which decoding failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeStage {
    Block,
    Envelope,
    Payload,
    ChannelHeader,
    SignatureHeader,
    ConfigEnvelope,
    ConfigUpdateEnvelope,
    ConfigUpdate,
    ConfigValue,
    Policy,
    NoConfigFound,
}

/// Error when decoding a block.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed block: {0}")]
    Block(#[source] io::Error),

    #[error("malformed envelope: {0}")]
    Envelope(#[source] io::Error),

    #[error("malformed payload: {0}")]
    Payload(#[source] io::Error),

    #[error("malformed channel header: {0}")]
    ChannelHeader(#[source] io::Error),

    #[error("malformed signature header: {0}")]
    SignatureHeader(#[source] io::Error),

    #[error("malformed config envelope: {0}")]
    ConfigEnvelope(#[source] io::Error),

    #[error("malformed config update envelope: {0}")]
    ConfigUpdateEnvelope(#[source] io::Error),

    #[error("malformed config update: {0}")]
    ConfigUpdate(#[source] io::Error),

    #[error("malformed config value at {path}: {source}")]
    ConfigValue {
        path: ConfigPath,
        #[source]
        source: io::Error,
    },

    #[error("malformed policy at {path}: {source}")]
    Policy {
        path: ConfigPath,
        #[source]
        source: io::Error,
    },

    #[error("block does not carry a configuration")]
    NoConfigFound,
}

impl DecodeError {
    pub fn stage(&self) -> DecodeStage {
        match self {
            DecodeError::Block(_) => DecodeStage::Block,
            DecodeError::Envelope(_) => DecodeStage::Envelope,
            DecodeError::Payload(_) => DecodeStage::Payload,
            DecodeError::ChannelHeader(_) => DecodeStage::ChannelHeader,
            DecodeError::SignatureHeader(_) => DecodeStage::SignatureHeader,
            DecodeError::ConfigEnvelope(_) => DecodeStage::ConfigEnvelope,
            DecodeError::ConfigUpdateEnvelope(_) => DecodeStage::ConfigUpdateEnvelope,
            DecodeError::ConfigUpdate(_) => DecodeStage::ConfigUpdate,
            DecodeError::ConfigValue { .. } => DecodeStage::ConfigValue,
            DecodeError::Policy { .. } => DecodeStage::Policy,
            DecodeError::NoConfigFound => DecodeStage::NoConfigFound,
        }
    }
}
