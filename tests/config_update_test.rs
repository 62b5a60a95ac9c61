use fabric_channel_config::{
    config_tree::{
        ConfigContent, ConfigGroup, ConfigPath, ConfigTree, ADMINS_POLICY, APPLICATION_GROUP,
        ORDERER_GROUP, READERS_POLICY,
    },
    types::{
        data_types::{ChannelID, Version, VersionExhausted},
        messages::ConfigUpdate,
        values::{BatchSize, Capabilities},
    },
    update::{compute_update, ComputedUpdate},
};
use log::LevelFilter;

mod common;

use common::{
    fixtures::{channel_profile, genesis_tree, peer_organization, CHANNEL_NAME},
    logging::setup_logger,
};

fn channel_id() -> ChannelID {
    ChannelID::new(CHANNEL_NAME)
}

fn update_between(current: &ConfigTree, desired: &ConfigTree) -> ConfigUpdate {
    compute_update(current.clone(), desired.clone(), &channel_id())
        .unwrap()
        .into_update()
        .expect("expected an update")
}

fn paths(versions: Vec<(ConfigPath, Version)>) -> Vec<(String, u64)> {
    versions
        .into_iter()
        .map(|(path, version)| (path.to_string(), version.int()))
        .collect()
}

/// Tests that comparing a configuration with itself, or with a copy that only differs in versions,
/// yields no update.
#[test]
fn no_differences_test() {
    setup_logger(LevelFilter::Trace);

    let tree = genesis_tree(&channel_profile(CHANNEL_NAME));
    assert_eq!(
        compute_update(tree.clone(), tree.clone(), &channel_id()),
        Ok(ComputedUpdate::NoDifferences)
    );

    let mut renumbered = tree.clone();
    renumbered.channel_group.version = Version::new(4);
    renumbered.sequence = 9;
    assert!(compute_update(tree, renumbered, &channel_id())
        .unwrap()
        .is_no_differences());
}

/// Tests the update for a single changed value deep in the tree: the value is read at its current
/// version and written at the next, and the groups on its way appear unchanged in both sets.
#[test]
fn changed_value_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Change the batch size of the orderer group.
    let current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let mut desired = current.clone();
    let batch_size = ConfigPath::group([ORDERER_GROUP]).value("BatchSize");
    desired
        .set(
            &batch_size,
            ConfigContent::typed_value(
                &BatchSize {
                    max_message_count: 500,
                    ..BatchSize::default()
                },
                ADMINS_POLICY,
            ),
        )
        .unwrap();

    // 2. Compute the update.
    let update = update_between(&current, &desired);
    assert_eq!(update.channel_id, channel_id());
    assert!(update.isolated_data.is_empty());

    // 3. The read set names the path to the value at version 0.
    assert_eq!(
        paths(update.read_paths()),
        vec![
            ("[Group]  /Channel".to_string(), 0),
            ("[Group]  /Channel/Orderer".to_string(), 0),
            ("[Value]  /Channel/Orderer/BatchSize".to_string(), 0),
        ]
    );

    // 4. The write set has the same shape, with the value at version 1 carrying the new content.
    assert_eq!(
        paths(update.write_paths()),
        vec![
            ("[Group]  /Channel".to_string(), 0),
            ("[Group]  /Channel/Orderer".to_string(), 0),
            ("[Value]  /Channel/Orderer/BatchSize".to_string(), 1),
        ]
    );
    let written = &update.write_set.groups[ORDERER_GROUP].values["BatchSize"];
    assert_eq!(written.decode::<BatchSize>().unwrap().max_message_count, 500);
    assert_eq!(written.mod_policy, ADMINS_POLICY);

    // 5. Groups whose membership did not change carry no mod policy and are references only.
    assert!(update.write_set.mod_policy.is_empty());
    assert!(update.write_set.groups[ORDERER_GROUP].mod_policy.is_empty());
    assert!(update.read_set.values.is_empty());
}

/// Tests the update that adds an organization: the new group is written at version 0 with all its
/// content, and its parent is written at the next version with every other member as a reference.
#[test]
fn added_organization_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Build a desired tree with a third peer organization, taken from a second genesis assembly.
    let mut profile = channel_profile(CHANNEL_NAME);
    let current = genesis_tree(&profile);
    profile
        .peer_orgs
        .push(peer_organization("Org3MSP", &[("peer0.org3.example.com", 7051)]));
    let desired = genesis_tree(&profile);

    // 2. The peer organizations in both trees carry different certificates, so keep the current ones.
    let mut desired_with_current_orgs = current.clone();
    let org3 = desired.channel_group.groups[APPLICATION_GROUP].groups["Org3MSP"].clone();
    desired_with_current_orgs
        .set(
            &ConfigPath::group([APPLICATION_GROUP, "Org3MSP"]),
            ConfigContent::Group(org3.clone()),
        )
        .unwrap();

    // 3. Compute the update.
    let update = update_between(&current, &desired_with_current_orgs);
    let read_application = &update.read_set.groups[APPLICATION_GROUP];
    let write_application = &update.write_set.groups[APPLICATION_GROUP];

    // 4. The application group is read at version 0 and written at version 1 with its mod policy.
    assert_eq!(read_application.version.int(), 0);
    assert_eq!(write_application.version.int(), 1);
    assert_eq!(write_application.mod_policy, ADMINS_POLICY);

    // 5. The existing organizations and leaves are carried as version-only references in both sets.
    for set in [read_application, write_application] {
        assert_eq!(set.groups["Org1MSP"], ConfigGroup::reference(Version::init()));
        assert_eq!(set.groups["Org2MSP"], ConfigGroup::reference(Version::init()));
        assert!(set.values["ACLs"].value.is_empty());
        assert!(set.policies[READERS_POLICY].policy.is_none());
    }

    // 6. The new organization appears in the write set only, in full.
    assert!(!read_application.groups.contains_key("Org3MSP"));
    assert!(write_application.groups["Org3MSP"].content_eq(&org3));
    assert_eq!(write_application.groups["Org3MSP"].version.int(), 0);

    // 7. Sibling sections are untouched and omitted.
    assert!(!update.write_set.groups.contains_key(ORDERER_GROUP));
    assert!(!update.read_set.groups.contains_key(ORDERER_GROUP));
}

/// Tests the update that removes an element: the element is read, and its absence from the parent's
/// write set (at the next version) deletes it.
#[test]
fn removed_value_test() {
    setup_logger(LevelFilter::Trace);

    let current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let mut desired = current.clone();
    let org1 = ConfigPath::group([APPLICATION_GROUP, "Org1MSP"]);
    desired.remove(&org1.value("AnchorPeers")).unwrap();

    let update = update_between(&current, &desired);
    let read_org1 = &update.read_set.groups[APPLICATION_GROUP].groups["Org1MSP"];
    let write_org1 = &update.write_set.groups[APPLICATION_GROUP].groups["Org1MSP"];

    assert!(read_org1.values.contains_key("AnchorPeers"));
    assert!(!write_org1.values.contains_key("AnchorPeers"));
    assert!(write_org1.values.contains_key("MSP"));
    assert_eq!(write_org1.version.int(), 1);
    assert_eq!(read_org1.version.int(), 0);

    // The application group's own membership did not change.
    assert_eq!(update.write_set.groups[APPLICATION_GROUP].version.int(), 0);
}

/// Tests that versions in the update are derived from the committed tree, not the desired one.
#[test]
fn versions_come_from_current_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Commit two changes to the channel capabilities so that the value is at version 2.
    let mut current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let capabilities = ConfigPath::root().value("Capabilities");
    for capability in ["V1_4_3", "V3_0"] {
        current
            .set(
                &capabilities,
                ConfigContent::typed_value(&Capabilities::from_iter([capability]), ADMINS_POLICY),
            )
            .unwrap();
    }

    // 2. Desire the genesis capabilities again, from a tree whose versions are all 0.
    let desired = genesis_tree(&channel_profile(CHANNEL_NAME));
    let mut desired_tree = current.clone();
    desired_tree
        .set(
            &capabilities,
            ConfigContent::Value {
                value: desired.channel_group.values["Capabilities"].value.clone(),
                mod_policy: ADMINS_POLICY.to_string(),
            },
        )
        .unwrap();

    let update = update_between(&current, &desired_tree);
    assert_eq!(update.read_set.values["Capabilities"].version.int(), 2);
    assert_eq!(update.write_set.values["Capabilities"].version.int(), 3);
}

/// Tests that a change to an element already at the highest version cannot be expressed as an update.
#[test]
fn exhausted_version_test() {
    setup_logger(LevelFilter::Trace);

    let mut current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let mut desired = current.clone();
    current
        .channel_group
        .values
        .get_mut("Capabilities")
        .unwrap()
        .version = Version::new(u64::MAX);
    desired
        .set(
            &ConfigPath::root().value("Capabilities"),
            ConfigContent::typed_value(&Capabilities::from_iter(["V3_0"]), ADMINS_POLICY),
        )
        .unwrap();

    assert_eq!(
        compute_update(current, desired, &channel_id()),
        Err(VersionExhausted)
    );
}

/// Tests that the update is a pure function of its inputs.
#[test]
fn update_is_deterministic_test() {
    setup_logger(LevelFilter::Trace);

    let current = genesis_tree(&channel_profile(CHANNEL_NAME));
    let mut desired = current.clone();
    desired
        .remove(&ConfigPath::group([APPLICATION_GROUP, "Org2MSP"]))
        .unwrap();

    assert_eq!(
        update_between(&current, &desired),
        update_between(&current, &desired)
    );
}
