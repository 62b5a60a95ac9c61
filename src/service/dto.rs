/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Request and response bodies of the channel service.
//!
//! Field names follow the camelCase convention of the service's JSON documents. Blocks, envelopes and
//! other binary blobs travel as standard Base64 strings.

use serde::{Deserialize, Serialize};

use crate::{
    block_codec::decoded::DecodedBlock,
    genesis::profile::ChannelProfile,
    types::{encoding::Base64Bytes, values::AnchorPeerAddress},
};

/// Request body of [`create_genesis`](super::ChannelService::create_genesis).
pub type CreateChannelRequest = ChannelProfile;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChannelResponse {
    pub message: String,

    /// The serialized genesis block.
    pub channel: Base64Bytes,
}

/// Request body of [`update_channel`](super::ChannelService::update_channel).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateChannelRequest {
    /// The latest configuration block of the channel.
    #[serde(rename = "blockB64")]
    pub block: Base64Bytes,

    /// A configuration block (e.g., produced by [`encode`](crate::block_codec::encode)) carrying the
    /// desired configuration.
    #[serde(rename = "desiredBlockB64")]
    pub desired_block: Base64Bytes,

    #[serde(rename = "channelName")]
    pub channel_name: String,
}

/// Request body of [`set_anchor_peers`](super::ChannelService::set_anchor_peers).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAnchorPeersRequest {
    /// The latest configuration block of the channel.
    #[serde(rename = "blockB64")]
    pub block: Base64Bytes,
    #[serde(rename = "anchorPeers")]
    pub anchor_peers: Vec<AnchorPeerAddress>,
    #[serde(rename = "mspID")]
    pub msp_id: String,
    #[serde(rename = "channelName")]
    pub channel_name: String,
}

/// Response body of the operations that compute configuration updates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdateResponse {
    /// Whether the desired configuration equals the committed one. If so, `envelope` is empty and there
    /// is nothing to submit.
    #[serde(rename = "noChanges")]
    pub no_changes: bool,

    /// The serialized `ConfigUpdate` envelope.
    #[serde(rename = "blockB64")]
    pub envelope: Base64Bytes,
}

impl ConfigUpdateResponse {
    pub(crate) fn no_changes() -> Self {
        ConfigUpdateResponse {
            no_changes: true,
            envelope: Base64Bytes::default(),
        }
    }
}

/// Request body of [`decode_block`](super::ChannelService::decode_block).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeBlockRequest {
    #[serde(rename = "dataB64")]
    pub data: Base64Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodeBlockResponse {
    pub data: DecodedBlock,
}
