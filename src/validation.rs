/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Validation of caller-supplied names and inputs.

use crate::types::{data_types::ChannelID, policies::PolicyParseError, values::AnchorPeerAddress};

/// Channel names must be strictly shorter than this many characters.
pub const MAX_CHANNEL_ID_LENGTH: usize = 250;

/// Check that `channel_id` is a legal channel name: it must start with a lowercase ASCII letter, contain
/// only lowercase ASCII letters, digits, `.` and `-`, and be shorter than [`MAX_CHANNEL_ID_LENGTH`].
pub fn validate_channel_id(channel_id: &ChannelID) -> Result<(), ValidationError> {
    let name = channel_id.as_str();
    let invalid = |reason: &str| ValidationError::InvalidChannelId {
        channel_id: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("channel name is empty")),
        Some(first) if !first.is_ascii_lowercase() => {
            return Err(invalid("channel name must start with a lowercase letter"))
        }
        Some(_) => {}
    }
    if name.len() >= MAX_CHANNEL_ID_LENGTH {
        return Err(invalid("channel name is too long"));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-') {
        return Err(invalid(
            "channel name may only contain lowercase letters, digits, '.' and '-'",
        ));
    }
    Ok(())
}

/// Check that `msp_id` can be used as the name of an organization group and inside policy rules.
pub fn validate_msp_id(msp_id: &str) -> Result<(), ValidationError> {
    if msp_id.is_empty() {
        return Err(ValidationError::EmptyMspId);
    }
    if msp_id
        .chars()
        .any(|c| c.is_whitespace() || c == '\'' || c == '"' || c == '/')
    {
        return Err(ValidationError::InvalidMspId(msp_id.to_string()));
    }
    Ok(())
}

/// Check that `anchor_peer` has a host and a non-zero port.
pub fn validate_anchor_peer(anchor_peer: &AnchorPeerAddress) -> Result<(), ValidationError> {
    if anchor_peer.host.trim().is_empty() || anchor_peer.port == 0 {
        return Err(ValidationError::InvalidAnchorPeer(format!(
            "{}:{}",
            anchor_peer.host, anchor_peer.port
        )));
    }
    Ok(())
}

/// Error when caller-supplied input violates a structural rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a channel requires at least one peer organization")]
    NoPeerOrganizations,

    #[error("a channel requires at least one orderer organization")]
    NoOrdererOrganizations,

    #[error("etcdraft consensus requires at least one consenter")]
    NoConsenters,

    #[error("organization MSP ID is empty")]
    EmptyMspId,

    #[error("'{0}' is not a valid MSP ID")]
    InvalidMspId(String),

    #[error("MSP ID '{0}' is used by more than one organization")]
    DuplicateMspId(String),

    #[error("'{channel_id}' is not a valid channel name: {reason}")]
    InvalidChannelId { channel_id: String, reason: String },

    #[error("organization '{msp_id}' must have at least one anchor peer")]
    EmptyAnchorPeerSet { msp_id: String },

    #[error("'{0}' is not a valid anchor peer address")]
    InvalidAnchorPeer(String),

    #[error("'{0}' is not a valid endpoint, expected 'host:port'")]
    InvalidEndpoint(String),

    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyParseError),
}
