/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Accessors for the organization groups of a configuration tree.
//!
//! Every organization is a group named after its MSP ID, placed under either the
//! [`Application`](super::APPLICATION_GROUP) group (peer organizations) or the
//! [`Orderer`](super::ORDERER_GROUP) group (orderer organizations).

use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
};

use crate::types::{
    data_types::VersionExhausted,
    values::{AnchorPeerAddress, AnchorPeers, ConfigValueType},
};

use super::{
    ConfigContent, ConfigGroup, ConfigPath, ConfigTree, ConfigTreeError, ADMINS_POLICY,
    APPLICATION_GROUP, ORDERER_GROUP,
};

/// The two sections of a channel that hold organizations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Application,
    Orderer,
}

impl Section {
    pub fn group_name(&self) -> &'static str {
        match self {
            Section::Application => APPLICATION_GROUP,
            Section::Orderer => ORDERER_GROUP,
        }
    }

    /// The path of the organization group `msp_id` in this section.
    pub fn organization_path(&self, msp_id: &str) -> ConfigPath {
        ConfigPath::group([self.group_name(), msp_id])
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

impl ConfigTree {
    /// Get the group of the organization `msp_id` in `section`.
    pub fn organization_group(
        &self,
        section: Section,
        msp_id: &str,
    ) -> Result<&ConfigGroup, OrganizationError> {
        self.channel_group
            .groups
            .get(section.group_name())
            .and_then(|section_group| section_group.groups.get(msp_id))
            .ok_or_else(|| OrganizationError::UnknownOrganization {
                section,
                msp_id: msp_id.to_string(),
            })
    }

    /// Get the MSP IDs of the application organizations, in order.
    pub fn application_organizations(&self) -> Vec<&str> {
        self.channel_group
            .groups
            .get(APPLICATION_GROUP)
            .map(|application| application.groups.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Get the anchor peers of the application organization `msp_id`. An organization without an
    /// `AnchorPeers` value has no anchor peers.
    pub fn anchor_peers(
        &self,
        msp_id: &str,
    ) -> Result<BTreeSet<AnchorPeerAddress>, OrganizationError> {
        let organization = self.organization_group(Section::Application, msp_id)?;
        match organization.typed_value::<AnchorPeers>() {
            None => Ok(BTreeSet::new()),
            Some(Ok(anchor_peers)) => Ok(anchor_peers.to_set()),
            Some(Err(source)) => Err(OrganizationError::MalformedValue {
                path: Section::Application
                    .organization_path(msp_id)
                    .value(AnchorPeers::KEY),
                source,
            }),
        }
    }

    /// Replace the anchor peers of the application organization `msp_id` with `anchor_peers`.
    ///
    /// If the organization's current anchor peers are already `anchor_peers` (in any order), the tree
    /// is left untouched. An empty set removes the organization's `AnchorPeers` value.
    pub fn set_anchor_peers(
        &mut self,
        msp_id: &str,
        anchor_peers: &BTreeSet<AnchorPeerAddress>,
    ) -> Result<(), OrganizationError> {
        if &self.anchor_peers(msp_id)? == anchor_peers {
            return Ok(());
        }

        let organization_path = Section::Application.organization_path(msp_id);
        let value_path = organization_path.value(AnchorPeers::KEY);
        // The organization exists (checked above), so neither operation can fail on a missing group.
        let result = if anchor_peers.is_empty() {
            self.remove(&value_path)
        } else {
            self.set(
                &value_path,
                ConfigContent::typed_value(&AnchorPeers::from_set(anchor_peers), ADMINS_POLICY),
            )
        };
        result.map_err(|error| match error {
            ConfigTreeError::VersionExhausted(error) => OrganizationError::VersionExhausted(error),
            _ => OrganizationError::UnknownOrganization {
                section: Section::Application,
                msp_id: msp_id.to_string(),
            },
        })
    }
}

/// Error when accessing an organization in a [`ConfigTree`].
#[derive(Debug, thiserror::Error)]
pub enum OrganizationError {
    #[error("no organization '{msp_id}' in the {section} section")]
    UnknownOrganization { section: Section, msp_id: String },

    #[error("value at {path} is malformed")]
    MalformedValue {
        path: ConfigPath,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    VersionExhausted(#[from] VersionExhausted),
}
