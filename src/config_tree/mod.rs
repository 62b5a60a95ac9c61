/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The versioned, hierarchical configuration document of a channel.
//!
//! # Structure
//!
//! A [`ConfigTree`] is a tree of named [`ConfigGroup`]s rooted at a group called
//! [`Channel`](CHANNEL_GROUP). Every group holds three ordered maps: sub-groups, [`ConfigValue`]s, and
//! [`ConfigPolicy`]s. Values and policies are the leaves of the tree. Every element (group, value, or
//! policy) carries a [`Version`] and the name of the policy that governs modifications to it (its
//! "mod policy"). Elements are addressed by [`ConfigPath`]s.
//!
//! A typical tree created by the [genesis assembler](crate::genesis) looks like this:
//!
//! ```text
//! /Channel
//! ├── Application
//! │   ├── Org1MSP          (values: MSP, AnchorPeers; policies: Admins, Readers, Writers, Endorsement)
//! │   └── Org2MSP
//! └── Orderer              (values: ConsensusType, BatchSize, BatchTimeout, Capabilities; ...)
//!     └── OrdererMSP       (values: MSP, Endpoints; ...)
//! ```
//!
//! # Versions and equality
//!
//! Versions are metadata: two trees are *structurally equal* ([`content_eq`](ConfigGroup::content_eq))
//! if they have the same shape, the same mod policies, and the same value and policy contents,
//! whatever their versions. The versioning rules implemented by [`ConfigTree::set`] and
//! [`ConfigTree::remove`] are the ones an ordering service applies when it commits an update:
//! 1. A new element starts at version 0.
//! 2. A value or policy's version increases by 1 when its content or mod policy changes.
//! 3. A group's version increases by 1 when its membership (the set of names in any of its three maps)
//!    or its mod policy changes. Changes deeper in the tree do not affect it.

pub mod organizations;

pub mod paths;

pub use paths::*;

use std::{
    collections::BTreeMap,
    io::{self, Read, Write},
};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    data_types::{Version, VersionExhausted},
    policies::Policy,
    values::ConfigValueType,
};

/// A channel's full configuration: the root group, and the number of configuration updates that have
/// been committed on top of the genesis configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigTree {
    pub sequence: u64,
    pub channel_group: ConfigGroup,
}

/// Deepest level below the root group at which a decoded tree may still hold groups. Deserializing a
/// tree nested deeper than this fails with [`io::ErrorKind::InvalidData`].
pub const MAX_GROUP_DEPTH: usize = 64;

/// A node of a configuration tree.
///
/// `ConfigGroup` is recursive, so its Borsh encoding is implemented by hand. The layout is the one the
/// derive macros would produce: `version`, `groups`, `values`, `policies`, then `mod_policy`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigGroup {
    pub version: Version,
    pub groups: BTreeMap<String, ConfigGroup>,
    pub values: BTreeMap<String, ConfigValue>,
    pub policies: BTreeMap<String, ConfigPolicy>,
    pub mod_policy: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigValue {
    pub version: Version,

    /// Serialized typed message. See [`values`](crate::types::values) for which type a value's name
    /// implies.
    pub value: Vec<u8>,
    pub mod_policy: String,
}

/// A policy slot in a [`ConfigGroup`].
///
/// `policy` is `None` only in version-only references inside the read set and write set of a
/// [`ConfigUpdate`](crate::types::messages::ConfigUpdate).
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigPolicy {
    pub version: Version,
    pub policy: Option<Policy>,
    pub mod_policy: String,
}

impl BorshSerialize for ConfigGroup {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.version.serialize(writer)?;
        u32::try_from(self.groups.len())
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?
            .serialize(writer)?;
        for (name, group) in &self.groups {
            name.serialize(writer)?;
            group.serialize(writer)?;
        }
        self.values.serialize(writer)?;
        self.policies.serialize(writer)?;
        self.mod_policy.serialize(writer)
    }
}

impl BorshDeserialize for ConfigGroup {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        ConfigGroup::deserialize_at_depth(reader, 0)
    }
}

impl ConfigGroup {
    fn deserialize_at_depth<R: Read>(reader: &mut R, depth: usize) -> io::Result<Self> {
        let version = Version::deserialize_reader(reader)?;

        let len = u32::deserialize_reader(reader)?;
        if len > 0 && depth >= MAX_GROUP_DEPTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("configuration groups are nested deeper than {MAX_GROUP_DEPTH} levels"),
            ));
        }
        let mut groups = BTreeMap::new();
        for _ in 0..len {
            let name = String::deserialize_reader(reader)?;
            let group = ConfigGroup::deserialize_at_depth(reader, depth + 1)?;
            groups.insert(name, group);
        }

        Ok(ConfigGroup {
            version,
            groups,
            values: BTreeMap::deserialize_reader(reader)?,
            policies: BTreeMap::deserialize_reader(reader)?,
            mod_policy: String::deserialize_reader(reader)?,
        })
    }
}

/// A borrowed element of a configuration tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigElement<'a> {
    Group(&'a ConfigGroup),
    Value(&'a ConfigValue),
    Policy(&'a ConfigPolicy),
}

impl ConfigElement<'_> {
    pub fn version(&self) -> Version {
        match self {
            ConfigElement::Group(group) => group.version,
            ConfigElement::Value(value) => value.version,
            ConfigElement::Policy(policy) => policy.version,
        }
    }
}

/// New content for the element at a path, as passed to [`ConfigTree::set`]. Versions in the content
/// are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigContent {
    Group(ConfigGroup),
    Value { value: Vec<u8>, mod_policy: String },
    Policy { policy: Policy, mod_policy: String },
}

impl ConfigContent {
    /// Value content holding the serialization of `value`.
    pub fn typed_value<T: ConfigValueType>(value: &T, mod_policy: impl Into<String>) -> Self {
        ConfigContent::Value {
            value: value.to_value_bytes(),
            mod_policy: mod_policy.into(),
        }
    }
}

impl ConfigTree {
    /// Create a tree at sequence 0 with `channel_group` as its root.
    pub fn new(channel_group: ConfigGroup) -> ConfigTree {
        ConfigTree {
            sequence: 0,
            channel_group,
        }
    }

    /// Get the element at `path`.
    pub fn get(&self, path: &ConfigPath) -> Result<ConfigElement<'_>, ConfigTreeError> {
        let not_found = || ConfigTreeError::NotFound { path: path.clone() };
        let group = self.group_at(path.groups()).ok_or_else(not_found)?;
        match path.element() {
            None => Ok(ConfigElement::Group(group)),
            Some(ElementKey::Value(name)) => group
                .values
                .get(name)
                .map(ConfigElement::Value)
                .ok_or_else(not_found),
            Some(ElementKey::Policy(name)) => group
                .policies
                .get(name)
                .map(ConfigElement::Policy)
                .ok_or_else(not_found),
        }
    }

    /// Replace the content of the element at `path` with `content`, creating the element if it does
    /// not exist. The group containing the element must exist.
    ///
    /// Versions are updated following the [versioning rules](self#versions-and-equality). Setting an
    /// element to structurally equal content leaves the tree unchanged. So does a change that would
    /// take a version past `u64::MAX`, which fails with [`ConfigTreeError::VersionExhausted`].
    pub fn set(&mut self, path: &ConfigPath, content: ConfigContent) -> Result<(), ConfigTreeError> {
        match (path.element(), content) {
            (None, ConfigContent::Group(new_group)) => {
                if path.is_root() {
                    return replace_group(&mut self.channel_group, new_group);
                }
                let name = last_group_name(path);
                let parent = self.parent_group_mut(path)?;
                match parent.groups.get_mut(name) {
                    Some(existing) => replace_group(existing, new_group)?,
                    None => {
                        let mut new_group = new_group;
                        new_group.reset_versions();
                        parent.version = parent.version.next()?;
                        parent.groups.insert(name.to_string(), new_group);
                    }
                }
                Ok(())
            }
            (Some(ElementKey::Value(name)), ConfigContent::Value { value, mod_policy }) => {
                let parent = self.parent_group_mut(path)?;
                let new_value = ConfigValue::new(value, mod_policy);
                match parent.values.get_mut(name) {
                    Some(existing) => {
                        if !existing.content_eq(&new_value) {
                            *existing = ConfigValue {
                                version: existing.version.next()?,
                                ..new_value
                            };
                        }
                    }
                    None => {
                        parent.version = parent.version.next()?;
                        parent.values.insert(name.clone(), new_value);
                    }
                }
                Ok(())
            }
            (Some(ElementKey::Policy(name)), ConfigContent::Policy { policy, mod_policy }) => {
                let parent = self.parent_group_mut(path)?;
                let new_policy = ConfigPolicy::new(policy, mod_policy);
                match parent.policies.get_mut(name) {
                    Some(existing) => {
                        if !existing.content_eq(&new_policy) {
                            *existing = ConfigPolicy {
                                version: existing.version.next()?,
                                ..new_policy
                            };
                        }
                    }
                    None => {
                        parent.version = parent.version.next()?;
                        parent.policies.insert(name.clone(), new_policy);
                    }
                }
                Ok(())
            }
            _ => Err(ConfigTreeError::ContentMismatch { path: path.clone() }),
        }
    }

    /// Remove the element at `path`. Removing an element changes the membership of its parent group,
    /// whose version is increased by 1.
    pub fn remove(&mut self, path: &ConfigPath) -> Result<(), ConfigTreeError> {
        if path.is_root() {
            return Err(ConfigTreeError::CannotRemoveRoot);
        }
        let parent = self.parent_group_mut(path)?;
        let present = match path.element() {
            None => parent.groups.contains_key(last_group_name(path)),
            Some(ElementKey::Value(name)) => parent.values.contains_key(name),
            Some(ElementKey::Policy(name)) => parent.policies.contains_key(name),
        };
        if !present {
            return Err(ConfigTreeError::NotFound { path: path.clone() });
        }
        parent.version = parent.version.next()?;
        match path.element() {
            None => {
                parent.groups.remove(last_group_name(path));
            }
            Some(ElementKey::Value(name)) => {
                parent.values.remove(name);
            }
            Some(ElementKey::Policy(name)) => {
                parent.policies.remove(name);
            }
        }
        Ok(())
    }

    /// Check whether `self` and `other` are structurally equal, ignoring versions and sequence numbers.
    pub fn content_eq(&self, other: &ConfigTree) -> bool {
        self.channel_group.content_eq(&other.channel_group)
    }

    /// Get every element of the tree together with its version, sorted by path.
    pub fn versions(&self) -> Vec<(ConfigPath, Version)> {
        self.channel_group.versions()
    }

    fn group_at(&self, groups: &[String]) -> Option<&ConfigGroup> {
        let (root, rest) = groups.split_first()?;
        if root != CHANNEL_GROUP {
            return None;
        }
        rest.iter()
            .try_fold(&self.channel_group, |group, name| group.groups.get(name))
    }

    fn group_at_mut(&mut self, groups: &[String]) -> Option<&mut ConfigGroup> {
        let (root, rest) = groups.split_first()?;
        if root != CHANNEL_GROUP {
            return None;
        }
        rest.iter()
            .try_fold(&mut self.channel_group, |group, name| group.groups.get_mut(name))
    }

    fn parent_group_mut(&mut self, path: &ConfigPath) -> Result<&mut ConfigGroup, ConfigTreeError> {
        let parent = path.parent().ok_or_else(|| ConfigTreeError::NotFound {
            path: path.clone(),
        })?;
        self.group_at_mut(parent.groups())
            .ok_or(ConfigTreeError::NotFound { path: parent })
    }
}

impl ConfigGroup {
    /// Create an empty group at version 0.
    pub fn new(mod_policy: impl Into<String>) -> ConfigGroup {
        ConfigGroup {
            mod_policy: mod_policy.into(),
            ..Default::default()
        }
    }

    /// Create a version-only reference to a group: no members and no mod policy.
    pub fn reference(version: Version) -> ConfigGroup {
        ConfigGroup {
            version,
            ..Default::default()
        }
    }

    /// Check whether `self` and `other` are structurally equal, ignoring versions.
    pub fn content_eq(&self, other: &ConfigGroup) -> bool {
        self.mod_policy == other.mod_policy
            && map_content_eq(&self.values, &other.values, ConfigValue::content_eq)
            && map_content_eq(&self.policies, &other.policies, ConfigPolicy::content_eq)
            && map_content_eq(&self.groups, &other.groups, ConfigGroup::content_eq)
    }

    /// Check whether `self` and `other` have the same names in each of their three maps.
    pub fn membership_eq(&self, other: &ConfigGroup) -> bool {
        self.groups.keys().eq(other.groups.keys())
            && self.values.keys().eq(other.values.keys())
            && self.policies.keys().eq(other.policies.keys())
    }

    /// Set the version of this group and of every element inside it to 0.
    pub fn reset_versions(&mut self) {
        self.version = Version::init();
        for value in self.values.values_mut() {
            value.version = Version::init();
        }
        for policy in self.policies.values_mut() {
            policy.version = Version::init();
        }
        for group in self.groups.values_mut() {
            group.reset_versions();
        }
    }

    /// Insert the serialization of `value` under its well-known name.
    pub fn insert_typed_value<T: ConfigValueType>(
        &mut self,
        value: &T,
        mod_policy: impl Into<String>,
    ) {
        self.values.insert(
            T::KEY.to_string(),
            ConfigValue::new(value.to_value_bytes(), mod_policy),
        );
    }

    /// Get the value stored under `T`'s well-known name, decoded. Returns `None` if the group has no
    /// such value, and `Some(Err(_))` if the value's bytes are not a `T`.
    pub fn typed_value<T: ConfigValueType>(&self) -> Option<std::io::Result<T>> {
        self.values.get(T::KEY).map(|value| value.decode::<T>())
    }

    /// Get every element of the tree rooted at this group together with its version, sorted by path.
    /// This group is taken to be the root group.
    pub fn versions(&self) -> Vec<(ConfigPath, Version)> {
        let mut versions = Vec::new();
        self.collect_versions(&ConfigPath::root(), &mut versions);
        versions.sort();
        versions
    }

    fn collect_versions(&self, path: &ConfigPath, versions: &mut Vec<(ConfigPath, Version)>) {
        versions.push((path.clone(), self.version));
        for (name, value) in &self.values {
            versions.push((path.value(name), value.version));
        }
        for (name, policy) in &self.policies {
            versions.push((path.policy(name), policy.version));
        }
        for (name, group) in &self.groups {
            group.collect_versions(&path.child(name), versions);
        }
    }
}

impl ConfigValue {
    /// Create a value at version 0.
    pub fn new(value: Vec<u8>, mod_policy: impl Into<String>) -> ConfigValue {
        ConfigValue {
            version: Version::init(),
            value,
            mod_policy: mod_policy.into(),
        }
    }

    /// Create a version-only reference to a value: no content and no mod policy.
    pub fn reference(version: Version) -> ConfigValue {
        ConfigValue {
            version,
            ..Default::default()
        }
    }

    pub fn content_eq(&self, other: &ConfigValue) -> bool {
        self.value == other.value && self.mod_policy == other.mod_policy
    }

    /// Decode the content of this value as a `T`.
    pub fn decode<T: ConfigValueType>(&self) -> std::io::Result<T> {
        T::from_value_bytes(&self.value)
    }
}

impl ConfigPolicy {
    /// Create a policy at version 0.
    pub fn new(policy: Policy, mod_policy: impl Into<String>) -> ConfigPolicy {
        ConfigPolicy {
            version: Version::init(),
            policy: Some(policy),
            mod_policy: mod_policy.into(),
        }
    }

    /// Create a version-only reference to a policy: no content and no mod policy.
    pub fn reference(version: Version) -> ConfigPolicy {
        ConfigPolicy {
            version,
            ..Default::default()
        }
    }

    pub fn content_eq(&self, other: &ConfigPolicy) -> bool {
        self.policy == other.policy && self.mod_policy == other.mod_policy
    }
}

/// Replace `existing` with `new` following the versioning rules. `existing` is left untouched if a
/// version would overflow.
fn replace_group(existing: &mut ConfigGroup, new: ConfigGroup) -> Result<(), ConfigTreeError> {
    let mut replaced = existing.clone();
    assign_group(&mut replaced, new)?;
    *existing = replaced;
    Ok(())
}

/// Overwrite `existing` with `new` following the versioning rules, keeping the versions of elements
/// whose content does not change. Returns whether anything changed.
fn assign_group(existing: &mut ConfigGroup, new: ConfigGroup) -> Result<bool, VersionExhausted> {
    let membership_changed =
        !existing.membership_eq(&new) || existing.mod_policy != new.mod_policy;
    let mut changed = membership_changed;

    existing.values.retain(|name, _| new.values.contains_key(name));
    for (name, value) in new.values {
        match existing.values.get_mut(&name) {
            Some(current) if current.content_eq(&value) => {}
            Some(current) => {
                *current = ConfigValue {
                    version: current.version.next()?,
                    ..value
                };
                changed = true;
            }
            None => {
                existing.values.insert(
                    name,
                    ConfigValue {
                        version: Version::init(),
                        ..value
                    },
                );
            }
        }
    }

    existing.policies.retain(|name, _| new.policies.contains_key(name));
    for (name, policy) in new.policies {
        match existing.policies.get_mut(&name) {
            Some(current) if current.content_eq(&policy) => {}
            Some(current) => {
                *current = ConfigPolicy {
                    version: current.version.next()?,
                    ..policy
                };
                changed = true;
            }
            None => {
                existing.policies.insert(
                    name,
                    ConfigPolicy {
                        version: Version::init(),
                        ..policy
                    },
                );
            }
        }
    }

    existing.groups.retain(|name, _| new.groups.contains_key(name));
    for (name, mut group) in new.groups {
        match existing.groups.get_mut(&name) {
            Some(current) => changed |= assign_group(current, group)?,
            None => {
                group.reset_versions();
                existing.groups.insert(name, group);
            }
        }
    }

    if membership_changed {
        existing.version = existing.version.next()?;
        existing.mod_policy = new.mod_policy;
    }
    Ok(changed)
}

fn map_content_eq<T>(
    left: &BTreeMap<String, T>,
    right: &BTreeMap<String, T>,
    eq: fn(&T, &T) -> bool,
) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|((left_name, left), (right_name, right))| left_name == right_name && eq(left, right))
}

fn last_group_name(path: &ConfigPath) -> &str {
    // Group paths always contain at least the root group.
    path.groups().last().map(String::as_str).unwrap_or(CHANNEL_GROUP)
}

/// Error when reading or modifying a [`ConfigTree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigTreeError {
    #[error("no element at {path}")]
    NotFound { path: ConfigPath },

    #[error("content does not match the kind of element at {path}")]
    ContentMismatch { path: ConfigPath },

    #[error("the root group cannot be removed")]
    CannotRemoveRoot,

    #[error(transparent)]
    VersionExhausted(#[from] VersionExhausted),
}
