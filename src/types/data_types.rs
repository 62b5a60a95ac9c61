/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store numbers and strings, and do not have any major "active" behavior.

use std::{
    fmt::{self, Display, Formatter},
    time::SystemTime,
};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Version counter of a configuration element (a group, a value, or a policy).
///
/// Versions start at 0 when an element is created and increase by exactly 1 every time the element's
/// content changes. Versions are metadata produced by the [diff engine](crate::update); they never take
/// part in deciding whether two elements are equal.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Create a new `Version` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// The version of a freshly created element.
    pub const fn init() -> Self {
        Self(0)
    }

    /// Get the inner `u64` value of this `Version`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the version that follows this one, or an error if this is the highest representable
    /// version.
    pub fn next(&self) -> Result<Self, VersionExhausted> {
        self.0.checked_add(1).map(Self).ok_or(VersionExhausted)
    }
}

/// Error when an element that is already at version `u64::MAX` changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("version {} cannot be incremented", u64::MAX)]
pub struct VersionExhausted;

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Name that uniquely identifies a channel.
///
/// A `ChannelID` is not validated on construction. Use
/// [`validate_channel_id`](crate::validation::validate_channel_id) before using one to create a new
/// channel.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ChannelID(String);

impl ChannelID {
    /// Create a new `ChannelID` wrapping `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the channel name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChannelID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of a block in a channel's ledger. The genesis block has number 0.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct BlockNumber(u64);

impl BlockNumber {
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for BlockNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Point in time, as seconds and nanoseconds since the Unix Epoch.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Get the current time. Times before the Unix Epoch are clamped to the Epoch.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: since_epoch.as_secs() as i64,
            nanos: since_epoch.subsec_nanos() as i32,
        }
    }
}
