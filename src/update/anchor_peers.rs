/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Replacement of an application organization's anchor peers.
//!
//! The desired anchor peers replace the organization's current ones wholesale, and the resulting tree
//! is diffed against the committed one. Re-submitting the anchor peers an organization already has (in
//! any order) therefore yields [`ComputedUpdate::NoDifferences`] rather than an update, which makes
//! reconciliation safe to repeat.

use std::collections::BTreeSet;

use crate::{
    config_tree::{organizations::OrganizationError, ConfigTree},
    types::{
        data_types::{ChannelID, VersionExhausted},
        values::AnchorPeerAddress,
    },
    validation::{validate_anchor_peer, validate_msp_id, ValidationError},
};

use super::{compute_update, ComputedUpdate};

/// Compute the update that sets the anchor peers of the application organization `msp_id` in the
/// committed configuration `current` to exactly `desired`.
pub fn reconcile_anchor_peers(
    current: ConfigTree,
    msp_id: &str,
    desired: &BTreeSet<AnchorPeerAddress>,
    channel_id: &ChannelID,
) -> Result<ComputedUpdate, ReconcileError> {
    validate_msp_id(msp_id)?;
    if desired.is_empty() {
        return Err(ValidationError::EmptyAnchorPeerSet {
            msp_id: msp_id.to_string(),
        }
        .into());
    }
    for anchor_peer in desired {
        validate_anchor_peer(anchor_peer)?;
    }

    let mut desired_tree = current.clone();
    desired_tree.set_anchor_peers(msp_id, desired)?;

    Ok(compute_update(current, desired_tree, channel_id)?)
}

/// Error when reconciling anchor peers.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The organization does not exist, or its current anchor peers could not be decoded.
    #[error(transparent)]
    Organization(#[from] OrganizationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    VersionExhausted(#[from] VersionExhausted),
}
