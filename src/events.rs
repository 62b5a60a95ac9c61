/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by the [channel service](crate::service::ChannelService) for event
//! handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Handlers for each kind of
//! event can be registered on the [service builder](crate::service::ChannelService::builder), and are
//! called synchronously, on the thread that performed the action.

use std::time::SystemTime;

use crate::types::data_types::{BlockNumber, ChannelID};

pub enum Event {
    AssembleGenesis(AssembleGenesisEvent),
    ComputeUpdate(ComputeUpdateEvent),
    NoDifferences(NoDifferencesEvent),
    BuildEnvelope(BuildEnvelopeEvent),
    DecodeBlock(DecodeBlockEvent),
    SubmitEnvelope(SubmitEnvelopeEvent),
}

/// A genesis block was assembled.
pub struct AssembleGenesisEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
    pub peer_orgs: usize,
    pub orderer_orgs: usize,
    pub data_hash: Vec<u8>,
}

/// A configuration update was computed. The sizes count the elements (groups, values and policies) in
/// each set.
pub struct ComputeUpdateEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
    pub read_set_size: usize,
    pub write_set_size: usize,
}

/// A desired configuration turned out to be identical to the committed one.
pub struct NoDifferencesEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
}

pub struct BuildEnvelopeEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
    pub tx_id: String,
    pub signed: bool,
    pub payload_hash: Vec<u8>,
}

pub struct DecodeBlockEvent {
    pub timestamp: SystemTime,
    pub block_number: BlockNumber,
    pub envelopes: usize,
}

/// An envelope was handed to the ordering service, which either accepted or rejected it.
pub struct SubmitEnvelopeEvent {
    pub timestamp: SystemTime,
    pub payload_hash: Vec<u8>,
    pub accepted: bool,
}
