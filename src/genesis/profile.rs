/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Descriptors of the participants of a new channel, as supplied by callers.
//!
//! These types deserialize from the JSON request bodies of the channel creation endpoint, so their
//! field names follow that document's camelCase convention. Certificates are PEM text.

use serde::{Deserialize, Serialize};

use crate::types::values::AnchorPeerAddress;

/// Everything needed to assemble the genesis configuration of a channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    /// The channel name.
    pub name: String,
    pub peer_orgs: Vec<OrganizationDescriptor>,
    pub orderer_orgs: Vec<OrganizationDescriptor>,
    #[serde(default)]
    pub consenters: Vec<ConsenterDescriptor>,
}

/// An organization that participates in a channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDescriptor {
    /// The organization's MSP ID.
    pub name: String,
    #[serde(default)]
    pub anchor_peers: Vec<AnchorPeerAddress>,

    /// `host:port` endpoints of the organization's ordering nodes. Only used for orderer
    /// organizations.
    #[serde(default)]
    pub orderer_endpoints: Vec<String>,

    /// Root certificate of the organization's signing identities.
    #[serde(rename = "signCACert")]
    pub sign_ca_cert: String,

    /// Root certificate of the organization's TLS identities.
    #[serde(rename = "tlsCACert")]
    pub tls_ca_cert: String,

    #[serde(default)]
    pub intermediate_certs: Vec<String>,
    #[serde(default, rename = "tlsIntermediateCerts")]
    pub tls_intermediate_certs: Vec<String>,
}

/// A member of the Raft cluster of a new channel's ordering service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsenterDescriptor {
    pub address: AnchorPeerAddress,
    #[serde(rename = "clientTLSCert")]
    pub client_tls_cert: String,
    #[serde(rename = "serverTLSCert")]
    pub server_tls_cert: String,
}
