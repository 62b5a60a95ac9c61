/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Lock-step comparison of a current and a desired group.

use std::collections::BTreeMap;

use crate::{
    config_tree::{ConfigGroup, ConfigPolicy, ConfigValue},
    types::data_types::{Version, VersionExhausted},
};

/// The read set and write set entries that describe the change from one group to another.
pub(super) struct GroupDelta {
    pub(super) read_set: ConfigGroup,
    pub(super) write_set: ConfigGroup,
    pub(super) updated: bool,
}

/// A value or a policy.
trait Leaf: Sized {
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn content_eq(&self, other: &Self) -> bool;

    fn reference(version: Version) -> Self;
}

impl Leaf for ConfigValue {
    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version
    }

    fn content_eq(&self, other: &Self) -> bool {
        ConfigValue::content_eq(self, other)
    }

    fn reference(version: Version) -> Self {
        ConfigValue::reference(version)
    }
}

impl Leaf for ConfigPolicy {
    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version
    }

    fn content_eq(&self, other: &Self) -> bool {
        ConfigPolicy::content_eq(self, other)
    }

    fn reference(version: Version) -> Self {
        ConfigPolicy::reference(version)
    }
}

/// The entries of one of a group's three maps.
///
/// `same` holds version-only references to the members that did not change. They are only carried into
/// the read and write sets if the enclosing group's membership changed.
struct MapDelta<T> {
    read: BTreeMap<String, T>,
    write: BTreeMap<String, T>,
    same: BTreeMap<String, T>,
    members_changed: bool,
}

impl<T> Default for MapDelta<T> {
    fn default() -> Self {
        Self {
            read: BTreeMap::new(),
            write: BTreeMap::new(),
            same: BTreeMap::new(),
            members_changed: false,
        }
    }
}

fn leaves_delta<T: Leaf>(
    current: BTreeMap<String, T>,
    mut desired: BTreeMap<String, T>,
) -> Result<MapDelta<T>, VersionExhausted> {
    let mut delta = MapDelta::default();

    for (name, current_leaf) in current {
        let version = current_leaf.version();
        match desired.remove(&name) {
            None => {
                delta.members_changed = true;
                delta.read.insert(name, T::reference(version));
            }
            Some(desired_leaf) if current_leaf.content_eq(&desired_leaf) => {
                delta.same.insert(name, T::reference(version));
            }
            Some(mut desired_leaf) => {
                desired_leaf.set_version(version.next()?);
                delta.read.insert(name.clone(), T::reference(version));
                delta.write.insert(name, desired_leaf);
            }
        }
    }

    for (name, mut new_leaf) in desired {
        delta.members_changed = true;
        new_leaf.set_version(Version::init());
        delta.write.insert(name, new_leaf);
    }

    Ok(delta)
}

fn groups_delta(
    current: BTreeMap<String, ConfigGroup>,
    mut desired: BTreeMap<String, ConfigGroup>,
) -> Result<MapDelta<ConfigGroup>, VersionExhausted> {
    let mut delta = MapDelta::default();

    for (name, current_group) in current {
        let version = current_group.version;
        match desired.remove(&name) {
            None => {
                delta.members_changed = true;
                delta.read.insert(name, ConfigGroup::reference(version));
            }
            Some(desired_group) => {
                let group_delta = group_delta(current_group, desired_group)?;
                if group_delta.updated {
                    delta.read.insert(name.clone(), group_delta.read_set);
                    delta.write.insert(name, group_delta.write_set);
                } else {
                    delta.same.insert(name, group_delta.read_set);
                }
            }
        }
    }

    for (name, mut new_group) in desired {
        delta.members_changed = true;
        new_group.reset_versions();
        delta.write.insert(name, new_group);
    }

    Ok(delta)
}

/// Compare `current` with `desired`.
///
/// If nothing differs, both sets are a version-only reference to `current` and `updated` is false. If
/// the group's membership and mod policy are unchanged, both sets are at the current version and hold
/// only the entries of the members that changed. Otherwise the write set is at the next version, carries
/// the desired mod policy, and holds every remaining member, with unchanged members as version-only
/// references. Omission from such a write set signals that a member was removed.
///
/// Fails if an element that must be written at its next version is already at `u64::MAX`.
pub(super) fn group_delta(
    current: ConfigGroup,
    desired: ConfigGroup,
) -> Result<GroupDelta, VersionExhausted> {
    let version = current.version;
    let mod_policy_changed = current.mod_policy != desired.mod_policy;

    let values = leaves_delta(current.values, desired.values)?;
    let policies = leaves_delta(current.policies, desired.policies)?;
    let groups = groups_delta(current.groups, desired.groups)?;

    let members_changed =
        values.members_changed || policies.members_changed || groups.members_changed;

    if !members_changed && !mod_policy_changed {
        let nothing_changed = values.read.is_empty()
            && values.write.is_empty()
            && policies.read.is_empty()
            && policies.write.is_empty()
            && groups.read.is_empty()
            && groups.write.is_empty();
        if nothing_changed {
            return Ok(GroupDelta {
                read_set: ConfigGroup::reference(version),
                write_set: ConfigGroup::reference(version),
                updated: false,
            });
        }

        return Ok(GroupDelta {
            read_set: ConfigGroup {
                version,
                groups: groups.read,
                values: values.read,
                policies: policies.read,
                mod_policy: String::new(),
            },
            write_set: ConfigGroup {
                version,
                groups: groups.write,
                values: values.write,
                policies: policies.write,
                mod_policy: String::new(),
            },
            updated: true,
        });
    }

    let (read_values, write_values) = with_same(values);
    let (read_policies, write_policies) = with_same(policies);
    let (read_groups, write_groups) = with_same(groups);

    Ok(GroupDelta {
        read_set: ConfigGroup {
            version,
            groups: read_groups,
            values: read_values,
            policies: read_policies,
            mod_policy: String::new(),
        },
        write_set: ConfigGroup {
            version: version.next()?,
            groups: write_groups,
            values: write_values,
            policies: write_policies,
            mod_policy: desired.mod_policy,
        },
        updated: true,
    })
}

/// Add the unchanged members of `delta` to both its read and write entries.
fn with_same<T: Clone>(delta: MapDelta<T>) -> (BTreeMap<String, T>, BTreeMap<String, T>) {
    let MapDelta {
        mut read,
        mut write,
        same,
        ..
    } = delta;
    for (name, reference) in same {
        read.insert(name.clone(), reference.clone());
        write.insert(name, reference);
    }
    (read, write)
}
