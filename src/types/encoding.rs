/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Helpers for the two encodings used throughout the library.
//!
//! 1. **Borsh**: the binary encoding of every message that is persisted or transmitted (blocks, envelopes,
//!    configuration trees and updates, and the typed values nested inside configuration trees). Borsh is
//!    deterministic, and every map in these messages is a `BTreeMap`, so the same message always
//!    serializes into the same bytes.
//! 2. **Base64**: the textual encoding of byte strings inside JSON documents (request/response DTOs and
//!    the [decoded block](crate::block_codec::decoded) view).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use borsh::BorshSerialize;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Borsh-serialize `value` into a new byte vector.
pub(crate) fn serialize<T: BorshSerialize>(value: &T) -> Vec<u8> {
    // Writing into a Vec<u8> never fails.
    value
        .try_to_vec()
        .expect("Borsh serialization into an in-memory buffer failed.")
}

/// Serde adapter that represents a byte string as a standard, padded Base64 string.
///
/// Use as `#[serde(with = "base64_bytes")]`.
pub mod base64_bytes {
    use super::*;

    pub fn serialize<T: AsRef<[u8]>, S: Serializer>(
        bytes: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter that represents a list of byte strings as a list of Base64 strings.
///
/// Use as `#[serde(with = "base64_bytes_list")]`.
pub mod base64_bytes_list {
    use super::*;

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(items.iter().map(|item| STANDARD.encode(item)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// A byte string that serializes into JSON as a Base64 string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Base64Bytes(#[serde(with = "base64_bytes")] pub Vec<u8>);

impl Base64Bytes {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Base64Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}
