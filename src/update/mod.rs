/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Computation of the minimal update between a committed configuration and a desired one.
//!
//! # Read sets and write sets
//!
//! A [`ConfigUpdate`] describes a change as two sparse trees rooted at the channel group:
//! 1. The **read set** lists the elements the update depends on, each at the version it has in the
//!    committed configuration. An ordering service rejects the update if any of these versions is no
//!    longer current, which makes updates computed against a stale configuration fail instead of
//!    silently overwriting concurrent changes.
//! 2. The **write set** lists the elements to install, each at the version it will have once the update
//!    is committed.
//!
//! [`compute_update`] walks the committed and desired trees in lock-step. For every element:
//!
//! | Element is...                        | Read set            | Write set                         |
//! |--------------------------------------|---------------------|-----------------------------------|
//! | Structurally equal in both trees     | omitted             | omitted                           |
//! | Present in both, content differs     | current version     | current version + 1, new content  |
//! | Only in the desired tree (created)   | omitted             | version 0, new content            |
//! | Only in the committed tree (removed) | current version     | omitted                           |
//!
//! Groups on the way to a changed element appear in both sets at their current version. A group whose
//! membership (or mod policy) changed instead appears in the write set at its current version + 1 with
//! every member it keeps, unchanged members as version-only references. An element's absence from
//! such a group is what tells the ordering service to delete it.
//!
//! If no element differs, there is no update to submit: [`compute_update`] returns
//! [`ComputedUpdate::NoDifferences`]. This outcome is not an error.
//!
//! Both sets are built from ordered maps, so the serialization of an update is a pure function of the
//! two input trees.

pub mod anchor_peers;

mod diff;

use std::collections::BTreeMap;

use crate::{
    config_tree::ConfigTree,
    types::{
        data_types::{ChannelID, VersionExhausted},
        messages::ConfigUpdate,
    },
};

/// The result of comparing two configurations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComputedUpdate {
    /// The update that turns the committed configuration into the desired one.
    Update(ConfigUpdate),

    /// The two configurations are structurally equal. There is nothing to submit.
    NoDifferences,
}

impl ComputedUpdate {
    pub fn is_no_differences(&self) -> bool {
        matches!(self, ComputedUpdate::NoDifferences)
    }

    /// Get the update, or `None` if there were no differences.
    pub fn into_update(self) -> Option<ConfigUpdate> {
        match self {
            ComputedUpdate::Update(update) => Some(update),
            ComputedUpdate::NoDifferences => None,
        }
    }
}

/// Compute the update that turns `current` (the committed configuration) into `desired` on the channel
/// `channel_id`.
///
/// Versions in `desired` are ignored: the versions in the update are derived from `current` alone. An
/// element of `current` that changes while already at version `u64::MAX` cannot be written, and fails
/// the computation with [`VersionExhausted`].
pub fn compute_update(
    current: ConfigTree,
    desired: ConfigTree,
    channel_id: &ChannelID,
) -> Result<ComputedUpdate, VersionExhausted> {
    let delta = diff::group_delta(current.channel_group, desired.channel_group)?;
    if !delta.updated {
        return Ok(ComputedUpdate::NoDifferences);
    }

    Ok(ComputedUpdate::Update(ConfigUpdate {
        channel_id: channel_id.clone(),
        read_set: delta.read_set,
        write_set: delta.write_set,
        isolated_data: BTreeMap::new(),
    }))
}
