/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The interface to the ordering service that envelopes are submitted to.

use crate::types::messages::Envelope;

/// Hands envelopes to an ordering service.
///
/// Implementations wrap the transport (e.g., a gRPC broadcast stream) and translate its outcomes into
/// [`SubmissionError`]s.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, envelope: &Envelope) -> Result<(), SubmissionError>;
}

/// Error reported by a [`Broadcaster`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// The update's read set is no longer current: another update was committed in the meantime. The
    /// caller should fetch the latest configuration block and compute the update again.
    #[error("update conflicts with the current configuration: {0}")]
    Conflict(String),

    /// The ordering service rejected the envelope for another reason, e.g., insufficient signatures.
    #[error("envelope rejected: {0}")]
    Rejected(String),

    #[error("ordering service unavailable: {0}")]
    Unavailable(String),
}
