/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Policy and ACL tables applied to every new channel.

use crate::config_tree::{
    ADMINS_POLICY, BLOCK_VALIDATION_POLICY, ENDORSEMENT_POLICY, LIFECYCLE_ENDORSEMENT_POLICY,
    READERS_POLICY, WRITERS_POLICY,
};

/// Implicit meta policies of the channel group.
pub const CHANNEL_POLICIES: [(&str, &str); 3] = [
    (READERS_POLICY, "ANY Readers"),
    (WRITERS_POLICY, "ANY Writers"),
    (ADMINS_POLICY, "MAJORITY Admins"),
];

/// Implicit meta policies of the application group.
pub const APPLICATION_POLICIES: [(&str, &str); 5] = [
    (READERS_POLICY, "ANY Readers"),
    (WRITERS_POLICY, "ANY Writers"),
    (ADMINS_POLICY, "MAJORITY Admins"),
    (ENDORSEMENT_POLICY, "MAJORITY Endorsement"),
    (LIFECYCLE_ENDORSEMENT_POLICY, "MAJORITY Endorsement"),
];

/// Implicit meta policies of the orderer group.
pub const ORDERER_POLICIES: [(&str, &str); 4] = [
    (READERS_POLICY, "ANY Readers"),
    (WRITERS_POLICY, "ANY Writers"),
    (ADMINS_POLICY, "MAJORITY Admins"),
    (BLOCK_VALIDATION_POLICY, "ANY Writers"),
];

/// Signature policies of every organization group, as (policy name, principal role). Each policy is
/// `OR('<MSP ID>.<role>')`.
pub const ORGANIZATION_POLICIES: [(&str, &str); 4] = [
    (ADMINS_POLICY, "admin"),
    (READERS_POLICY, "member"),
    (WRITERS_POLICY, "member"),
    (ENDORSEMENT_POLICY, "member"),
];

/// The signature policy rule that requires one signature by a `role` of the organization `msp_id`.
pub fn organization_rule(msp_id: &str, role: &str) -> String {
    format!("OR('{}.{}')", msp_id, role)
}

/// Organizational units of client, peer, admin and orderer identities, in that order.
pub const NODE_OUS: [&str; 4] = ["client", "peer", "admin", "orderer"];

const APPLICATION_READERS: &str = "/Channel/Application/Readers";
const APPLICATION_WRITERS: &str = "/Channel/Application/Writers";

/// Mapping from system resources to the application policies that guard them.
pub const ACLS: [(&str, &str); 19] = [
    ("_lifecycle/CheckCommitReadiness", APPLICATION_WRITERS),
    ("_lifecycle/CommitChaincodeDefinition", APPLICATION_WRITERS),
    ("_lifecycle/QueryChaincodeDefinition", APPLICATION_WRITERS),
    ("_lifecycle/QueryChaincodeDefinitions", APPLICATION_WRITERS),
    ("lscc/ChaincodeExists", APPLICATION_READERS),
    ("lscc/GetDeploymentSpec", APPLICATION_READERS),
    ("lscc/GetChaincodeData", APPLICATION_READERS),
    ("lscc/GetInstantiatedChaincodes", APPLICATION_READERS),
    ("qscc/GetChainInfo", APPLICATION_READERS),
    ("qscc/GetBlockByNumber", APPLICATION_READERS),
    ("qscc/GetBlockByHash", APPLICATION_READERS),
    ("qscc/GetTransactionByID", APPLICATION_READERS),
    ("qscc/GetBlockByTxID", APPLICATION_READERS),
    ("cscc/GetConfigBlock", APPLICATION_READERS),
    ("cscc/GetChannelConfig", APPLICATION_READERS),
    ("peer/Propose", APPLICATION_WRITERS),
    ("peer/ChaincodeToChaincode", APPLICATION_WRITERS),
    ("event/Block", APPLICATION_READERS),
    ("event/FilteredBlock", APPLICATION_READERS),
];
