use std::collections::BTreeSet;

use fabric_channel_config::{
    config_tree::{
        organizations::OrganizationError, ConfigContent, ConfigPath, ADMINS_POLICY,
        APPLICATION_GROUP, ORDERER_GROUP,
    },
    types::{
        data_types::ChannelID,
        values::{AnchorPeerAddress, AnchorPeers},
    },
    update::{
        anchor_peers::{reconcile_anchor_peers, ReconcileError},
        ComputedUpdate,
    },
    validation::ValidationError,
};
use log::LevelFilter;

mod common;

use common::{
    fixtures::{channel_profile, genesis_tree, CHANNEL_NAME},
    logging::setup_logger,
};

fn anchor_peers(addresses: &[(&str, u16)]) -> BTreeSet<AnchorPeerAddress> {
    addresses
        .iter()
        .map(|(host, port)| AnchorPeerAddress::new(*host, *port))
        .collect()
}

/// Tests that adding an anchor peer to an organization that already has one replaces its AnchorPeers
/// value in place.
#[test]
fn replace_anchor_peers_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Org1MSP starts with peer0 as its only anchor peer.
    let current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let desired = anchor_peers(&[("peer0.org1.example.com", 7051), ("peer1.org1.example.com", 8051)]);

    // 2. Reconcile to peer0 and peer1.
    let update = reconcile_anchor_peers(current, "Org1MSP", &desired, &ChannelID::new(CHANNEL_NAME))
        .unwrap()
        .into_update()
        .unwrap();

    // 3. The value is read at version 0 and written at version 1 with both peers.
    let read_org1 = &update.read_set.groups[APPLICATION_GROUP].groups["Org1MSP"];
    let write_org1 = &update.write_set.groups[APPLICATION_GROUP].groups["Org1MSP"];
    assert_eq!(read_org1.values["AnchorPeers"].version.int(), 0);
    let written = &write_org1.values["AnchorPeers"];
    assert_eq!(written.version.int(), 1);
    assert_eq!(written.mod_policy, ADMINS_POLICY);
    assert_eq!(written.decode::<AnchorPeers>().unwrap().to_set(), desired);

    // 4. The organization's membership is unchanged, so nothing else of it is carried.
    assert_eq!(write_org1.version.int(), 0);
    assert_eq!(write_org1.values.len(), 1);
    assert!(write_org1.policies.is_empty());

    // 5. Other organizations and sections appear in neither set.
    for set in [&update.read_set, &update.write_set] {
        assert!(!set.groups[APPLICATION_GROUP].groups.contains_key("Org2MSP"));
        assert_eq!(set.groups[APPLICATION_GROUP].groups.len(), 1);
        assert!(!set.groups.contains_key(ORDERER_GROUP));
        assert_eq!(set.groups.len(), 1);
    }
}

/// Tests that setting anchor peers on an organization without any creates the AnchorPeers value.
#[test]
fn first_anchor_peer_test() {
    setup_logger(LevelFilter::Trace);

    let current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let desired = anchor_peers(&[("peer0.org2.example.com", 9051)]);

    let update = reconcile_anchor_peers(current, "Org2MSP", &desired, &ChannelID::new(CHANNEL_NAME))
        .unwrap()
        .into_update()
        .unwrap();

    let read_org2 = &update.read_set.groups[APPLICATION_GROUP].groups["Org2MSP"];
    let write_org2 = &update.write_set.groups[APPLICATION_GROUP].groups["Org2MSP"];

    // The new value is written at version 0 and never read; the organization group is bumped.
    assert!(!read_org2.values.contains_key("AnchorPeers"));
    assert_eq!(write_org2.values["AnchorPeers"].version.int(), 0);
    assert_eq!(read_org2.version.int(), 0);
    assert_eq!(write_org2.version.int(), 1);
    assert!(write_org2.values["MSP"].value.is_empty());
}

/// Tests that reconciling to the anchor peers an organization already has, in any order, yields no
/// update.
#[test]
fn unchanged_anchor_peers_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Give Org1MSP two anchor peers, stored in reverse order.
    let mut current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let reversed = AnchorPeers {
        anchor_peers: vec![
            AnchorPeerAddress::new("peer1.org1.example.com", 8051),
            AnchorPeerAddress::new("peer0.org1.example.com", 7051),
        ],
    };
    current
        .set(
            &ConfigPath::group([APPLICATION_GROUP, "Org1MSP"]).value("AnchorPeers"),
            ConfigContent::typed_value(&reversed, ADMINS_POLICY),
        )
        .unwrap();

    // 2. Reconcile to the same set.
    let desired = anchor_peers(&[("peer0.org1.example.com", 7051), ("peer1.org1.example.com", 8051)]);
    let computed =
        reconcile_anchor_peers(current, "Org1MSP", &desired, &ChannelID::new(CHANNEL_NAME)).unwrap();
    assert_eq!(computed, ComputedUpdate::NoDifferences);
}

#[test]
fn reconcile_errors_test() {
    setup_logger(LevelFilter::Trace);

    let current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let channel_id = ChannelID::new(CHANNEL_NAME);
    let valid = anchor_peers(&[("peer0.org1.example.com", 7051)]);

    // 1. The desired set may not be empty.
    assert!(matches!(
        reconcile_anchor_peers(current.clone(), "Org1MSP", &BTreeSet::new(), &channel_id),
        Err(ReconcileError::Validation(ValidationError::EmptyAnchorPeerSet { .. }))
    ));

    // 2. Every anchor peer needs a host and a port.
    assert!(matches!(
        reconcile_anchor_peers(
            current.clone(),
            "Org1MSP",
            &anchor_peers(&[("", 7051)]),
            &channel_id
        ),
        Err(ReconcileError::Validation(ValidationError::InvalidAnchorPeer(_)))
    ));

    // 3. The MSP ID must be well formed.
    assert!(matches!(
        reconcile_anchor_peers(current.clone(), "", &valid, &channel_id),
        Err(ReconcileError::Validation(ValidationError::EmptyMspId))
    ));

    // 4. The organization must be an application organization of the channel.
    assert!(matches!(
        reconcile_anchor_peers(current.clone(), "Org9MSP", &valid, &channel_id),
        Err(ReconcileError::Organization(OrganizationError::UnknownOrganization { .. }))
    ));
    assert!(matches!(
        reconcile_anchor_peers(current, "OrdererMSP", &valid, &channel_id),
        Err(ReconcileError::Organization(OrganizationError::UnknownOrganization { .. }))
    ));
}

/// Tests that a malformed AnchorPeers value in the committed configuration is reported rather than
/// overwritten.
#[test]
fn malformed_anchor_peers_test() {
    setup_logger(LevelFilter::Trace);

    let mut current = genesis_tree(&channel_profile(CHANNEL_NAME));
    current
        .set(
            &ConfigPath::group([APPLICATION_GROUP, "Org1MSP"]).value("AnchorPeers"),
            ConfigContent::Value {
                value: vec![0xff; 3],
                mod_policy: ADMINS_POLICY.to_string(),
            },
        )
        .unwrap();

    let result = reconcile_anchor_peers(
        current,
        "Org1MSP",
        &anchor_peers(&[("peer0.org1.example.com", 7051)]),
        &ChannelID::new(CHANNEL_NAME),
    );
    assert!(matches!(
        result,
        Err(ReconcileError::Organization(OrganizationError::MalformedValue { .. }))
    ));
}
