/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Addresses of elements in a configuration tree, and the well-known names used in them.

use std::fmt::{self, Display, Formatter};

/* ↓↓↓ Well-known names ↓↓↓ */

/// Name of the root group of every configuration tree.
pub const CHANNEL_GROUP: &str = "Channel";
/// Name of the group under the root that holds the application (peer) organizations.
pub const APPLICATION_GROUP: &str = "Application";
/// Name of the group under the root that holds the ordering service settings and organizations.
pub const ORDERER_GROUP: &str = "Orderer";

pub const ADMINS_POLICY: &str = "Admins";
pub const READERS_POLICY: &str = "Readers";
pub const WRITERS_POLICY: &str = "Writers";
pub const ENDORSEMENT_POLICY: &str = "Endorsement";
pub const LIFECYCLE_ENDORSEMENT_POLICY: &str = "LifecycleEndorsement";
pub const BLOCK_VALIDATION_POLICY: &str = "BlockValidation";

/// Identifies which kind of leaf a [`ConfigPath`] addresses, and its name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKey {
    Value(String),
    Policy(String),
}

/// Address of a group, value, or policy in a configuration tree.
///
/// `groups` lists the names of the groups from the root (always [`CHANNEL_GROUP`]) downwards. If
/// `element` is `None` the path addresses the last group in `groups`, otherwise it addresses the named
/// value or policy inside that group.
///
/// Paths are totally ordered, first by `groups` (lexicographically), and then by `element` (groups
/// before values, values before policies).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigPath {
    groups: Vec<String>,
    element: Option<ElementKey>,
}

impl ConfigPath {
    /// The path of the root group.
    pub fn root() -> ConfigPath {
        ConfigPath {
            groups: vec![CHANNEL_GROUP.to_string()],
            element: None,
        }
    }

    /// The path of the group reached by descending from the root through `groups`. `groups` does not
    /// include the root group's name.
    pub fn group<I, S>(groups: I) -> ConfigPath
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = ConfigPath::root();
        path.groups.extend(groups.into_iter().map(Into::into));
        path
    }

    /// The path of the value `name` inside the group at `self`.
    ///
    /// If `self` addresses a value or policy, the element is replaced.
    pub fn value(&self, name: impl Into<String>) -> ConfigPath {
        ConfigPath {
            groups: self.groups.clone(),
            element: Some(ElementKey::Value(name.into())),
        }
    }

    /// The path of the policy `name` inside the group at `self`.
    ///
    /// If `self` addresses a value or policy, the element is replaced.
    pub fn policy(&self, name: impl Into<String>) -> ConfigPath {
        ConfigPath {
            groups: self.groups.clone(),
            element: Some(ElementKey::Policy(name.into())),
        }
    }

    /// The path of the sub-group `name` of the group at `self`.
    pub fn child(&self, name: impl Into<String>) -> ConfigPath {
        let mut groups = self.groups.clone();
        groups.push(name.into());
        ConfigPath {
            groups,
            element: None,
        }
    }

    /// Get the path of the group that contains the element at `self`, or `None` if `self` is the root.
    pub fn parent(&self) -> Option<ConfigPath> {
        if self.element.is_some() {
            Some(ConfigPath {
                groups: self.groups.clone(),
                element: None,
            })
        } else if self.groups.len() > 1 {
            Some(ConfigPath {
                groups: self.groups[..self.groups.len() - 1].to_vec(),
                element: None,
            })
        } else {
            None
        }
    }

    pub fn is_root(&self) -> bool {
        self.groups.len() == 1 && self.element.is_none()
    }

    /// Names of the groups from the root downwards, including the root.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn element(&self) -> Option<&ElementKey> {
        self.element.as_ref()
    }

    /// Check whether `self` is a strict ancestor of `other`, i.e., whether `self` addresses a group that
    /// contains `other`.
    pub fn is_ancestor_of(&self, other: &ConfigPath) -> bool {
        if self.element.is_some() || self == other {
            return false;
        }
        other.groups.len() >= self.groups.len() && other.groups[..self.groups.len()] == self.groups[..]
    }
}

impl Display for ConfigPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tag = match self.element {
            None => "[Group]  ",
            Some(ElementKey::Value(_)) => "[Value]  ",
            Some(ElementKey::Policy(_)) => "[Policy] ",
        };
        f.write_str(tag)?;
        for group in &self.groups {
            write!(f, "/{}", group)?;
        }
        match &self.element {
            Some(ElementKey::Value(name)) | Some(ElementKey::Policy(name)) => write!(f, "/{}", name),
            None => Ok(()),
        }
    }
}
