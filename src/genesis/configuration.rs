/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Channel-wide parameters of new channels that organization descriptors do not carry.

use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::types::values::{BatchSize, EtcdRaftOptions};

/// The consensus protocols a new channel's ordering service can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsensusFamily {
    /// Raft, which requires at least one consenter.
    EtcdRaft,
    /// A single ordering node, without consenters.
    Solo,
}

impl ConsensusFamily {
    /// The name of the consensus family as stored in the `ConsensusType` value.
    pub fn name(&self) -> &'static str {
        match self {
            ConsensusFamily::EtcdRaft => "etcdraft",
            ConsensusFamily::Solo => "solo",
        }
    }
}

/// Channel-wide parameters applied to every new channel by the
/// [`GenesisAssembler`](super::GenesisAssembler).
///
/// Every parameter has a default, so `GenesisConfiguration::default()` is equivalent to
/// `GenesisConfiguration::builder().build()`.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [GenesisConfiguration]. On the builder call the following methods to
    override the defaults, then `.build()`.

    Optional:
    - `.consensus(...)`
    - `.batch_timeout(...)`
    - `.batch_size(...)`
    - `.etcd_raft_options(...)`
    - `.channel_capabilities(...)`
    - `.orderer_capabilities(...)`
    - `.application_capabilities(...)`
    - `.enable_node_ous(...)`
"))]
pub struct GenesisConfiguration {
    #[builder(
        default = ConsensusFamily::EtcdRaft,
        setter(doc = "Set the consensus protocol of the ordering service. Defaults to etcdraft.")
    )]
    pub consensus: ConsensusFamily,

    #[builder(
        default = Duration::from_secs(3),
        setter(doc = "Set how long the ordering service waits before cutting a non-full block. Defaults to 3s.")
    )]
    pub batch_timeout: Duration,

    #[builder(
        default,
        setter(doc = "Set the block size limits. Defaults to 100 messages, 10 MiB absolute, 2 MiB preferred.")
    )]
    pub batch_size: BatchSize,

    #[builder(default, setter(doc = "Set the Raft tuning parameters."))]
    pub etcd_raft_options: EtcdRaftOptions,

    #[builder(
        default = vec!["V2_0".to_string()],
        setter(doc = "Set the capabilities of the channel group. Defaults to V2_0.")
    )]
    pub channel_capabilities: Vec<String>,

    #[builder(
        default = vec!["V2_0".to_string()],
        setter(doc = "Set the capabilities of the orderer group. Defaults to V2_0.")
    )]
    pub orderer_capabilities: Vec<String>,

    #[builder(
        default = vec!["V2_0".to_string(), "V2_5".to_string()],
        setter(doc = "Set the capabilities of the application group. Defaults to V2_0 and V2_5.")
    )]
    pub application_capabilities: Vec<String>,

    #[builder(
        default = true,
        setter(doc = "Classify identities into clients, peers, admins and orderers by organizational unit. Defaults to true.")
    )]
    pub enable_node_ous: bool,
}

impl Default for GenesisConfiguration {
    fn default() -> Self {
        GenesisConfiguration::builder().build()
    }
}

/// Format `duration` the way batch timeouts are stored, e.g. `"3s"` or `"250ms"`.
pub(crate) fn format_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
