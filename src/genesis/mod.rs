/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Assembly of the initial configuration of a new channel.
//!
//! The [`GenesisAssembler`] turns a [`ChannelProfile`] (organization and consenter descriptors) into a
//! [`ConfigTree`] at sequence 0, with every element at version 0 and every mod policy set to `Admins`.
//! The resulting tree has the following shape:
//!
//! ```text
//! /Channel                 values: HashingAlgorithm, BlockDataHashingStructure, Capabilities
//! │                        policies: Readers, Writers, Admins
//! ├── Application          values: Capabilities, ACLs
//! │   │                    policies: Readers, Writers, Admins, Endorsement, LifecycleEndorsement
//! │   └── <peer org>       values: MSP, AnchorPeers (if any)
//! │                        policies: Admins, Readers, Writers, Endorsement
//! └── Orderer              values: ConsensusType, BatchSize, BatchTimeout, Capabilities
//!     │                    policies: Readers, Writers, Admins, BlockValidation
//!     └── <orderer org>    values: MSP, Endpoints (if any)
//!                          policies: Admins, Readers, Writers, Endorsement
//! ```
//!
//! Assembly is all-or-nothing: the first invalid descriptor or unparseable certificate aborts it.

pub mod configuration;

pub mod defaults;

pub mod profile;

use std::collections::BTreeSet;

use crate::{
    certificates::{CertificateAuthority, CertificateParseError},
    config_tree::{
        ConfigGroup, ConfigPolicy, ConfigTree, ADMINS_POLICY, APPLICATION_GROUP, CHANNEL_GROUP,
        ORDERER_GROUP,
    },
    types::{
        data_types::ChannelID,
        encoding::serialize,
        policies::{Policy, PolicyType},
        values::{
            Acls, AnchorPeers, BatchTimeout, BlockDataHashingStructure, Capabilities, Consenter,
            ConsensusState, ConsensusType, EtcdRaftMetadata, FabricCryptoConfig, FabricMspConfig,
            FabricNodeOus, FabricOuIdentifier, HashingAlgorithm, MspConfig, OrdererAddresses,
        },
    },
    validation::{validate_anchor_peer, validate_channel_id, validate_msp_id, ValidationError},
};

use self::{
    configuration::{format_duration, ConsensusFamily, GenesisConfiguration},
    defaults::{
        organization_rule, ACLS, APPLICATION_POLICIES, CHANNEL_POLICIES, NODE_OUS,
        ORDERER_POLICIES, ORGANIZATION_POLICIES,
    },
    profile::{ChannelProfile, ConsenterDescriptor, OrganizationDescriptor},
};

/// Builds genesis configurations, parsing certificates with a pluggable [`CertificateAuthority`].
pub struct GenesisAssembler<'a> {
    authority: &'a dyn CertificateAuthority,
    configuration: &'a GenesisConfiguration,
}

/// Whether an organization is being placed in the application or the orderer group.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Peer,
    Orderer,
}

impl<'a> GenesisAssembler<'a> {
    pub fn new(
        authority: &'a dyn CertificateAuthority,
        configuration: &'a GenesisConfiguration,
    ) -> GenesisAssembler<'a> {
        GenesisAssembler {
            authority,
            configuration,
        }
    }

    /// Assemble the genesis configuration of the channel described by `profile`.
    pub fn assemble(&self, profile: &ChannelProfile) -> Result<ConfigTree, GenesisError> {
        self.validate(profile)?;

        let mut application = ConfigGroup::new(ADMINS_POLICY);
        for org in &profile.peer_orgs {
            application
                .groups
                .insert(org.name.clone(), self.organization_group(org, Role::Peer)?);
        }
        application.insert_typed_value(
            &Capabilities::from_iter(&self.configuration.application_capabilities),
            ADMINS_POLICY,
        );
        application.insert_typed_value(
            &Acls {
                acls: ACLS
                    .iter()
                    .map(|(resource, policy)| (resource.to_string(), policy.to_string()))
                    .collect(),
            },
            ADMINS_POLICY,
        );
        insert_implicit_meta_policies(&mut application, &APPLICATION_POLICIES)?;

        let mut orderer = ConfigGroup::new(ADMINS_POLICY);
        for org in &profile.orderer_orgs {
            orderer
                .groups
                .insert(org.name.clone(), self.organization_group(org, Role::Orderer)?);
        }
        orderer.insert_typed_value(&self.consensus_type(&profile.consenters)?, ADMINS_POLICY);
        orderer.insert_typed_value(&self.configuration.batch_size, ADMINS_POLICY);
        orderer.insert_typed_value(
            &BatchTimeout {
                timeout: format_duration(self.configuration.batch_timeout),
            },
            ADMINS_POLICY,
        );
        orderer.insert_typed_value(
            &Capabilities::from_iter(&self.configuration.orderer_capabilities),
            ADMINS_POLICY,
        );
        insert_implicit_meta_policies(&mut orderer, &ORDERER_POLICIES)?;

        let mut channel = ConfigGroup::new(ADMINS_POLICY);
        channel
            .groups
            .insert(APPLICATION_GROUP.to_string(), application);
        channel.groups.insert(ORDERER_GROUP.to_string(), orderer);
        channel.insert_typed_value(&HashingAlgorithm::default(), ADMINS_POLICY);
        channel.insert_typed_value(&BlockDataHashingStructure::default(), ADMINS_POLICY);
        channel.insert_typed_value(
            &Capabilities::from_iter(&self.configuration.channel_capabilities),
            ADMINS_POLICY,
        );
        insert_implicit_meta_policies(&mut channel, &CHANNEL_POLICIES)?;

        log::debug!(
            "assembled genesis configuration of channel {} under /{}",
            profile.name,
            CHANNEL_GROUP
        );
        Ok(ConfigTree::new(channel))
    }

    fn validate(&self, profile: &ChannelProfile) -> Result<(), ValidationError> {
        validate_channel_id(&ChannelID::new(profile.name.as_str()))?;
        if profile.peer_orgs.is_empty() {
            return Err(ValidationError::NoPeerOrganizations);
        }
        if profile.orderer_orgs.is_empty() {
            return Err(ValidationError::NoOrdererOrganizations);
        }
        if self.configuration.consensus == ConsensusFamily::EtcdRaft
            && profile.consenters.is_empty()
        {
            return Err(ValidationError::NoConsenters);
        }

        // An organization may appear in both sections, but only once in each.
        for orgs in [&profile.peer_orgs, &profile.orderer_orgs] {
            let mut msp_ids = BTreeSet::new();
            for org in orgs {
                validate_msp_id(&org.name)?;
                if !msp_ids.insert(org.name.as_str()) {
                    return Err(ValidationError::DuplicateMspId(org.name.clone()));
                }
                for anchor_peer in &org.anchor_peers {
                    validate_anchor_peer(anchor_peer)?;
                }
                for endpoint in &org.orderer_endpoints {
                    validate_endpoint(endpoint)?;
                }
            }
        }
        for consenter in &profile.consenters {
            validate_anchor_peer(&consenter.address)?;
        }
        Ok(())
    }

    fn organization_group(
        &self,
        org: &OrganizationDescriptor,
        role: Role,
    ) -> Result<ConfigGroup, GenesisError> {
        let parse = |pem: &str| {
            self.authority
                .parse_pem(pem.as_bytes())
                .map(|certificate| certificate.pem)
                .map_err(|source| GenesisError::CertificateParse {
                    owner: org.name.clone(),
                    source,
                })
        };
        let sign_ca_cert = parse(&org.sign_ca_cert)?;
        let tls_ca_cert = parse(&org.tls_ca_cert)?;
        let intermediate_certs = org
            .intermediate_certs
            .iter()
            .map(|pem| parse(pem))
            .collect::<Result<Vec<_>, _>>()?;
        let tls_intermediate_certs = org
            .tls_intermediate_certs
            .iter()
            .map(|pem| parse(pem))
            .collect::<Result<Vec<_>, _>>()?;

        let ou_identifier = |ou: &str| FabricOuIdentifier {
            certificate: sign_ca_cert.clone(),
            organizational_unit_identifier: ou.to_string(),
        };
        let fabric_node_ous = self.configuration.enable_node_ous.then(|| {
            let [client, peer, admin, orderer] = NODE_OUS;
            FabricNodeOus {
                enable: true,
                client_ou_identifier: Some(ou_identifier(client)),
                peer_ou_identifier: Some(ou_identifier(peer)),
                admin_ou_identifier: Some(ou_identifier(admin)),
                orderer_ou_identifier: Some(ou_identifier(orderer)),
            }
        });
        let msp = FabricMspConfig {
            name: org.name.clone(),
            root_certs: vec![sign_ca_cert.clone()],
            intermediate_certs,
            admins: Vec::new(),
            revocation_list: Vec::new(),
            organizational_unit_identifiers: Vec::new(),
            crypto_config: FabricCryptoConfig::default(),
            tls_root_certs: vec![tls_ca_cert],
            tls_intermediate_certs,
            fabric_node_ous,
        };

        let mut group = ConfigGroup::new(ADMINS_POLICY);
        group.insert_typed_value(&MspConfig::fabric(&msp), ADMINS_POLICY);
        match role {
            Role::Peer if !org.anchor_peers.is_empty() => {
                let anchor_peers = org.anchor_peers.iter().cloned().collect();
                group.insert_typed_value(&AnchorPeers::from_set(&anchor_peers), ADMINS_POLICY);
            }
            Role::Orderer if !org.orderer_endpoints.is_empty() => {
                group.insert_typed_value(
                    &OrdererAddresses {
                        addresses: org.orderer_endpoints.clone(),
                    },
                    ADMINS_POLICY,
                );
            }
            _ => {}
        }
        for (name, principal_role) in ORGANIZATION_POLICIES {
            let rule = organization_rule(&org.name, principal_role);
            let policy =
                Policy::from_rule(PolicyType::Signature, &rule).map_err(ValidationError::from)?;
            group
                .policies
                .insert(name.to_string(), ConfigPolicy::new(policy, ADMINS_POLICY));
        }
        Ok(group)
    }

    fn consensus_type(
        &self,
        consenters: &[ConsenterDescriptor],
    ) -> Result<ConsensusType, GenesisError> {
        let metadata = match self.configuration.consensus {
            ConsensusFamily::EtcdRaft => {
                let consenters = consenters
                    .iter()
                    .map(|consenter| self.consenter(consenter))
                    .collect::<Result<Vec<_>, _>>()?;
                serialize(&EtcdRaftMetadata {
                    consenters,
                    options: self.configuration.etcd_raft_options.clone(),
                })
            }
            ConsensusFamily::Solo => Vec::new(),
        };
        Ok(ConsensusType {
            consensus_type: self.configuration.consensus.name().to_string(),
            metadata,
            state: ConsensusState::Normal,
        })
    }

    fn consenter(&self, consenter: &ConsenterDescriptor) -> Result<Consenter, GenesisError> {
        let owner = format!("{}:{}", consenter.address.host, consenter.address.port);
        let parse = |pem: &str| {
            self.authority
                .parse_pem(pem.as_bytes())
                .map(|certificate| certificate.pem)
                .map_err(|source| GenesisError::CertificateParse {
                    owner: owner.clone(),
                    source,
                })
        };
        Ok(Consenter {
            host: consenter.address.host.clone(),
            port: consenter.address.port,
            client_tls_cert: parse(&consenter.client_tls_cert)?,
            server_tls_cert: parse(&consenter.server_tls_cert)?,
        })
    }
}

fn insert_implicit_meta_policies(
    group: &mut ConfigGroup,
    policies: &[(&str, &str)],
) -> Result<(), ValidationError> {
    for (name, rule) in policies {
        let policy = Policy::from_rule(PolicyType::ImplicitMeta, rule)?;
        group
            .policies
            .insert(name.to_string(), ConfigPolicy::new(policy, ADMINS_POLICY));
    }
    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidEndpoint(endpoint.to_string());
    let (host, port) = endpoint.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.parse::<u16>().map_or(true, |port| port == 0) {
        return Err(invalid());
    }
    Ok(())
}

/// Error when assembling a genesis configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisError {
    #[error("certificate of {owner} could not be parsed: {source}")]
    CertificateParse {
        owner: String,
        #[source]
        source: CertificateParseError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
