/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A library for managing the configuration of a permissioned ledger "channel".
//!
//! A channel's configuration is a versioned, hierarchical document (a [`ConfigTree`](config_tree::ConfigTree))
//! describing the participating organizations, their membership credentials, the ordering service's
//! topology, and the access policies that govern who may change what. This crate covers the three
//! lifecycle operations on that document:
//! 1. **Genesis**: assembling an initial configuration from organization descriptors
//!    ([`genesis`]) and serializing it into a genesis block ([`block_codec::encode`]).
//! 2. **Update**: computing the minimal read-set/write-set delta between a committed configuration and a
//!    desired one ([`update`]), and wrapping it into a submission [envelope](envelope).
//! 3. **Inspection**: decoding a committed configuration block into a fully expanded structural form
//!    ([`block_codec::decode`]).
//!
//! The [`service`] module exposes one call per operation, taking a request DTO and returning either a
//! success payload or a structured error, for a transport layer (e.g., HTTP) to sit on top of.
//!
//! Every operation is synchronous. Configuration trees are moved between stages by value and never shared
//! mutably, so a [`ChannelService`](service::ChannelService) can be shared freely between request-handling
//! threads.

pub mod block_codec;

pub mod certificates;

pub mod config_tree;

pub mod envelope;

pub(crate) mod event_bus;

pub mod events;

pub mod genesis;

pub(crate) mod logging;

pub mod service;

pub mod types;

pub mod update;

pub mod validation;
