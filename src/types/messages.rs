/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the messages that make up blocks and transaction envelopes.
//!
//! The messages nest as follows. Fields marked "bytes" hold the Borsh serialization of the message named
//! after the arrow:
//!
//! ```text
//! Block
//! └── data: [bytes → Envelope]
//!     ├── payload: bytes → Payload
//!     │   ├── header
//!     │   │   ├── channel_header: bytes → ChannelHeader
//!     │   │   └── signature_header: bytes → SignatureHeader
//!     │   └── data: bytes → ConfigEnvelope          (header_type = Config)
//!     │                  | ConfigUpdateEnvelope     (header_type = ConfigUpdate)
//!     └── signature
//! ```
//!
//! Signatures are always computed over bytes that the signer has just serialized, and verified over the
//! bytes exactly as received. Keeping nested messages as byte strings rather than structs means that a
//! message never has to be re-serialized in order to check a signature over it.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::config_tree::{ConfigGroup, ConfigPath, ConfigTree};

use super::data_types::{BlockNumber, ChannelID, Timestamp, Version};

/* ↓↓↓ Blocks ↓↓↓ */

/// Number of metadata slots in every block header. The slots are (in order) signatures, last config
/// (deprecated), transaction filter, and orderer-specific metadata.
pub const BLOCK_METADATA_SLOTS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub data: BlockData,
    pub metadata: BlockMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockHeader {
    pub number: BlockNumber,
    pub previous_hash: Vec<u8>,

    /// SHA256 hash over the concatenation of the entries of the block's data.
    pub data_hash: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockData {
    /// Serialized [`Envelope`]s.
    pub data: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockMetadata {
    pub metadata: Vec<Vec<u8>>,
}

impl BlockMetadata {
    /// Metadata with [`BLOCK_METADATA_SLOTS`] empty slots.
    pub fn empty() -> Self {
        Self {
            metadata: vec![Vec::new(); BLOCK_METADATA_SLOTS],
        }
    }
}

/* ↓↓↓ Envelopes ↓↓↓ */

/// A signed payload. `signature` is over `payload` and is empty for unsigned envelopes.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Envelope {
    /// Serialized [`Payload`].
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Payload {
    pub header: Header,

    /// Serialized message whose type is given by the channel header's `header_type`.
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Header {
    /// Serialized [`ChannelHeader`].
    pub channel_header: Vec<u8>,

    /// Serialized [`SignatureHeader`].
    pub signature_header: Vec<u8>,
}

/// The kind of message carried in a payload's `data`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderType {
    Message,
    Config,
    ConfigUpdate,
    EndorserTransaction,
    OrdererTransaction,
    DeliverSeekInfo,
    ChaincodePackage,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ChannelHeader {
    pub header_type: HeaderType,
    pub version: i32,

    /// When the payload was created. Left unset to make the serialization of the payload a pure
    /// function of its content.
    pub timestamp: Option<Timestamp>,
    pub channel_id: ChannelID,

    /// Transaction ID. Empty for unsigned payloads.
    pub tx_id: String,
    pub epoch: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignatureHeader {
    /// Serialized [`SerializedIdentity`] of the signer. Empty for unsigned payloads.
    pub creator: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// The identity of a signer: the ID of its membership service provider, and its certificate or public
/// key.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SerializedIdentity {
    pub mspid: String,
    pub id_bytes: Vec<u8>,
}

/* ↓↓↓ Configuration transactions ↓↓↓ */

/// The payload data of a `Config` transaction: the full configuration of a channel, and the update
/// that produced it (absent in the genesis block).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigEnvelope {
    pub config: ConfigTree,
    pub last_update: Option<Envelope>,
}

/// The payload data of a `ConfigUpdate` transaction: a configuration update and the signatures that
/// authorize it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigUpdateEnvelope {
    /// Serialized [`ConfigUpdate`].
    pub config_update: Vec<u8>,
    pub signatures: Vec<ConfigSignature>,
}

/// A signature over the concatenation of `signature_header` and the serialized config update.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigSignature {
    /// Serialized [`SignatureHeader`].
    pub signature_header: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A configuration delta, expressed as the versions that must be current (`read_set`) and the new
/// content and versions to install (`write_set`).
///
/// Both sets are sparse trees rooted at the channel group. See [`update`](crate::update) for how they
/// are computed.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigUpdate {
    pub channel_id: ChannelID,
    pub read_set: ConfigGroup,
    pub write_set: ConfigGroup,
    pub isolated_data: BTreeMap<String, Vec<u8>>,
}

impl ConfigUpdate {
    /// Get every element of the read set together with its version, sorted by path.
    pub fn read_paths(&self) -> Vec<(ConfigPath, Version)> {
        self.read_set.versions()
    }

    /// Get every element of the write set together with its version, sorted by path.
    pub fn write_paths(&self) -> Vec<(ConfigPath, Version)> {
        self.write_set.versions()
    }
}
