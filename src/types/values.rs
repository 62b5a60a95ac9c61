/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Typed messages nested inside [`ConfigValue`](crate::config_tree::ConfigValue)s.
//!
//! A configuration value stores its content as an opaque, Borsh-serialized byte string. Which type those
//! bytes decode into is decided by the value's name (its key in the enclosing group), following the
//! conventions in the table below. Each type's [`ConfigValueType::KEY`] records its name.
//!
//! | Value name                   | Type                          | Found in                          |
//! |------------------------------|-------------------------------|-----------------------------------|
//! | `MSP`                        | [`MspConfig`]                 | organization groups               |
//! | `AnchorPeers`                | [`AnchorPeers`]               | application organization groups   |
//! | `Endpoints`                  | [`OrdererAddresses`]          | orderer organization groups       |
//! | `Capabilities`               | [`Capabilities`]              | channel, application, orderer     |
//! | `ACLs`                       | [`Acls`]                      | application group                 |
//! | `ConsensusType`              | [`ConsensusType`]             | orderer group                     |
//! | `BatchSize`                  | [`BatchSize`]                 | orderer group                     |
//! | `BatchTimeout`               | [`BatchTimeout`]              | orderer group                     |
//! | `HashingAlgorithm`           | [`HashingAlgorithm`]          | channel group                     |
//! | `BlockDataHashingStructure`  | [`BlockDataHashingStructure`] | channel group                     |
//!
//! Two of these types ([`MspConfig`] and [`ConsensusType`]) themselves carry a further nested byte string,
//! which the [block codec](crate::block_codec) expands when decoding.

use std::collections::{BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::encoding::{base64_bytes, base64_bytes_list, serialize};

/// Implemented by the types that can be stored in a configuration value.
pub trait ConfigValueType: BorshSerialize + BorshDeserialize {
    /// The name of the configuration value that stores this type.
    const KEY: &'static str;

    /// Serialize this value into the bytes stored in a configuration value.
    fn to_value_bytes(&self) -> Vec<u8> {
        serialize(self)
    }

    /// Deserialize a value of this type from the bytes stored in a configuration value. Fails if `bytes`
    /// is not exactly one serialized value of this type.
    fn from_value_bytes(bytes: &[u8]) -> std::io::Result<Self> {
        Self::try_from_slice(bytes)
    }
}

/* ↓↓↓ Membership service providers ↓↓↓ */

/// The only MSP type this library creates.
pub const FABRIC_MSP_TYPE: u32 = 0;

/// Membership service provider definition of an organization.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MspConfig {
    pub msp_type: u32,

    /// Serialized [`FabricMspConfig`] if `msp_type` is [`FABRIC_MSP_TYPE`].
    pub config: Vec<u8>,
}

impl ConfigValueType for MspConfig {
    const KEY: &'static str = "MSP";
}

impl MspConfig {
    pub fn fabric(config: &FabricMspConfig) -> MspConfig {
        MspConfig {
            msp_type: FABRIC_MSP_TYPE,
            config: serialize(config),
        }
    }
}

/// Credentials and identity classification rules of an organization. Certificates are stored as PEM.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct FabricMspConfig {
    pub name: String,
    #[serde(with = "base64_bytes_list")]
    pub root_certs: Vec<Vec<u8>>,
    #[serde(with = "base64_bytes_list")]
    pub intermediate_certs: Vec<Vec<u8>>,
    #[serde(with = "base64_bytes_list")]
    pub admins: Vec<Vec<u8>>,
    #[serde(with = "base64_bytes_list")]
    pub revocation_list: Vec<Vec<u8>>,
    pub organizational_unit_identifiers: Vec<FabricOuIdentifier>,
    pub crypto_config: FabricCryptoConfig,
    #[serde(with = "base64_bytes_list")]
    pub tls_root_certs: Vec<Vec<u8>>,
    #[serde(with = "base64_bytes_list")]
    pub tls_intermediate_certs: Vec<Vec<u8>>,
    pub fabric_node_ous: Option<FabricNodeOus>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct FabricOuIdentifier {
    #[serde(with = "base64_bytes")]
    pub certificate: Vec<u8>,
    pub organizational_unit_identifier: String,
}

/// Organizational unit identifiers that classify identities into clients, peers, admins and orderers.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct FabricNodeOus {
    pub enable: bool,
    pub client_ou_identifier: Option<FabricOuIdentifier>,
    pub peer_ou_identifier: Option<FabricOuIdentifier>,
    pub admin_ou_identifier: Option<FabricOuIdentifier>,
    pub orderer_ou_identifier: Option<FabricOuIdentifier>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct FabricCryptoConfig {
    pub signature_hash_family: String,
    pub identity_identifier_hash_function: String,
}

impl Default for FabricCryptoConfig {
    fn default() -> Self {
        Self {
            signature_hash_family: "SHA2".to_string(),
            identity_identifier_hash_function: "SHA256".to_string(),
        }
    }
}

/* ↓↓↓ Addresses ↓↓↓ */

/// Network address of a peer advertised for cross-organization discovery.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct AnchorPeerAddress {
    pub host: String,
    pub port: u16,
}

impl AnchorPeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// The anchor peers of an application organization.
///
/// Anchor peers form a set: [`AnchorPeers::from_set`] produces them sorted and without duplicates, but
/// values decoded from committed blocks may carry any order, so compare them with
/// [`AnchorPeers::to_set`].
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct AnchorPeers {
    pub anchor_peers: Vec<AnchorPeerAddress>,
}

impl ConfigValueType for AnchorPeers {
    const KEY: &'static str = "AnchorPeers";
}

impl AnchorPeers {
    pub fn from_set(anchor_peers: &BTreeSet<AnchorPeerAddress>) -> Self {
        Self {
            anchor_peers: anchor_peers.iter().cloned().collect(),
        }
    }

    pub fn to_set(&self) -> BTreeSet<AnchorPeerAddress> {
        self.anchor_peers.iter().cloned().collect()
    }
}

/// Endpoints (`host:port`) of the ordering nodes run by an orderer organization.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct OrdererAddresses {
    pub addresses: Vec<String>,
}

impl ConfigValueType for OrdererAddresses {
    const KEY: &'static str = "Endpoints";
}

/* ↓↓↓ Channel-wide settings ↓↓↓ */

/// Named feature sets that every member of a channel section must support.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Capabilities {
    pub capabilities: BTreeSet<String>,
}

impl ConfigValueType for Capabilities {
    const KEY: &'static str = "Capabilities";
}

impl<S: Into<String>> FromIterator<S> for Capabilities {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Mapping from resources (e.g., `qscc/GetChainInfo`) to the path of the policy that guards them.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Acls {
    pub acls: BTreeMap<String, String>,
}

impl ConfigValueType for Acls {
    const KEY: &'static str = "ACLs";
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct HashingAlgorithm {
    pub name: String,
}

impl ConfigValueType for HashingAlgorithm {
    const KEY: &'static str = "HashingAlgorithm";
}

impl Default for HashingAlgorithm {
    fn default() -> Self {
        Self {
            name: "SHA256".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BlockDataHashingStructure {
    pub width: u32,
}

impl ConfigValueType for BlockDataHashingStructure {
    const KEY: &'static str = "BlockDataHashingStructure";
}

impl Default for BlockDataHashingStructure {
    fn default() -> Self {
        Self { width: u32::MAX }
    }
}

/* ↓↓↓ Ordering service ↓↓↓ */

/// Consensus family identifier, consensus-specific metadata, and operating state of the ordering
/// service.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConsensusType {
    pub consensus_type: String,

    /// Serialized [`EtcdRaftMetadata`] if `consensus_type` is `"etcdraft"`, empty otherwise.
    pub metadata: Vec<u8>,
    pub state: ConsensusState,
}

impl ConfigValueType for ConsensusType {
    const KEY: &'static str = "ConsensusType";
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum ConsensusState {
    #[serde(rename = "STATE_NORMAL")]
    Normal,
    #[serde(rename = "STATE_MAINTENANCE")]
    Maintenance,
}

/// Raft cluster membership and tuning parameters.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EtcdRaftMetadata {
    pub consenters: Vec<Consenter>,
    pub options: EtcdRaftOptions,
}

/// A member of the Raft cluster, identified by its address and TLS certificates (PEM).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Consenter {
    pub host: String,
    pub port: u16,
    #[serde(with = "base64_bytes")]
    pub client_tls_cert: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub server_tls_cert: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EtcdRaftOptions {
    pub tick_interval: String,
    pub election_tick: u32,
    pub heartbeat_tick: u32,
    pub max_inflight_blocks: u32,
    pub snapshot_interval_size: u32,
}

impl Default for EtcdRaftOptions {
    fn default() -> Self {
        Self {
            tick_interval: "500ms".to_string(),
            election_tick: 10,
            heartbeat_tick: 1,
            max_inflight_blocks: 5,
            snapshot_interval_size: 16 * 1024 * 1024,
        }
    }
}

/// Limits on the number of messages and bytes that the ordering service puts into one block.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BatchSize {
    pub max_message_count: u32,
    pub absolute_max_bytes: u32,
    pub preferred_max_bytes: u32,
}

impl ConfigValueType for BatchSize {
    const KEY: &'static str = "BatchSize";
}

impl Default for BatchSize {
    fn default() -> Self {
        Self {
            max_message_count: 100,
            absolute_max_bytes: 10 * 1024 * 1024,
            preferred_max_bytes: 2 * 1024 * 1024,
        }
    }
}

/// How long the ordering service waits before cutting a block that is not yet full, e.g. `"3s"`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BatchTimeout {
    pub timeout: String,
}

impl ConfigValueType for BatchTimeout {
    const KEY: &'static str = "BatchTimeout";
}
