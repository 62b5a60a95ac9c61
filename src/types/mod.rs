/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types and traits that are used across multiple components of the library.
//!
//! Types specific to single components (e.g., the [decoded block](crate::block_codec::decoded) view) live
//! with their components.

pub mod crypto_primitives;

pub mod data_types;

pub mod encoding;

pub mod messages;

pub mod policies;

pub mod values;
