/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the service's
//! [configuration](crate::service::ServiceConfiguration).
//!
//! This library logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [BuildEnvelope](crate::events::BuildEnvelopeEvent) is printed:
//!
//! ```text
//! BuildEnvelope, 1701329264, mychannel, 3f9a1c0e52b7d4a8, true, fNGCJyk
//! ```
//!
//! In the snippet:
//! - The third value is the channel.
//! - The fourth value is the transaction ID of the envelope (empty for unsigned envelopes).
//! - The fifth value is whether the envelope was signed.
//! - The sixth value is the first seven characters of the Base64 encoding of the SHA256 hash of the
//!   envelope's payload.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const ASSEMBLE_GENESIS: &str = "AssembleGenesis";
pub const COMPUTE_UPDATE: &str = "ComputeUpdate";
pub const NO_DIFFERENCES: &str = "NoDifferences";
pub const BUILD_ENVELOPE: &str = "BuildEnvelope";
pub const DECODE_BLOCK: &str = "DecodeBlock";
pub const SUBMIT_ENVELOPE: &str = "SubmitEnvelope";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync>;
}

impl Logger for AssembleGenesisEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |assemble_genesis_event: &AssembleGenesisEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                ASSEMBLE_GENESIS,
                secs_since_unix_epoch(assemble_genesis_event.timestamp),
                assemble_genesis_event.channel_id,
                assemble_genesis_event.peer_orgs,
                assemble_genesis_event.orderer_orgs,
                first_seven_base64_chars(&assemble_genesis_event.data_hash)
            )
        };
        Box::new(logger)
    }
}

impl Logger for ComputeUpdateEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |compute_update_event: &ComputeUpdateEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                COMPUTE_UPDATE,
                secs_since_unix_epoch(compute_update_event.timestamp),
                compute_update_event.channel_id,
                compute_update_event.read_set_size,
                compute_update_event.write_set_size
            )
        };
        Box::new(logger)
    }
}

impl Logger for NoDifferencesEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |no_differences_event: &NoDifferencesEvent| {
            log::info!(
                "{}, {}, {}",
                NO_DIFFERENCES,
                secs_since_unix_epoch(no_differences_event.timestamp),
                no_differences_event.channel_id
            )
        };
        Box::new(logger)
    }
}

impl Logger for BuildEnvelopeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |build_envelope_event: &BuildEnvelopeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                BUILD_ENVELOPE,
                secs_since_unix_epoch(build_envelope_event.timestamp),
                build_envelope_event.channel_id,
                build_envelope_event.tx_id,
                build_envelope_event.signed,
                first_seven_base64_chars(&build_envelope_event.payload_hash)
            )
        };
        Box::new(logger)
    }
}

impl Logger for DecodeBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |decode_block_event: &DecodeBlockEvent| {
            log::info!(
                "{}, {}, {}, {}",
                DECODE_BLOCK,
                secs_since_unix_epoch(decode_block_event.timestamp),
                decode_block_event.block_number,
                decode_block_event.envelopes
            )
        };
        Box::new(logger)
    }
}

impl Logger for SubmitEnvelopeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send + Sync> {
        let logger = |submit_envelope_event: &SubmitEnvelopeEvent| {
            log::info!(
                "{}, {}, {}, {}",
                SUBMIT_ENVELOPE,
                secs_since_unix_epoch(submit_envelope_event.timestamp),
                first_seven_base64_chars(&submit_envelope_event.payload_hash),
                submit_envelope_event.accepted
            )
        };
        Box::new(logger)
    }
}

fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
