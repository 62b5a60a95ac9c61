/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Wrapping of configuration updates into envelopes that can be submitted to an ordering service.
//!
//! An update is wrapped as follows:
//!
//! ```text
//! Envelope { payload, signature }
//! └── Payload
//!     ├── Header
//!     │   ├── ChannelHeader { header_type: ConfigUpdate, channel_id, tx_id, ... }
//!     │   └── SignatureHeader { creator, nonce }
//!     └── ConfigUpdateEnvelope { config_update, signatures }
//! ```
//!
//! If the [`EnvelopeBuilder`] has a [`Signer`], the signature header carries the signer's identity and a
//! fresh random nonce, the transaction ID is derived from both, and the payload is signed. Otherwise the
//! signature header, the transaction ID, and the envelope's signature are all empty, and the envelope
//! is a pure function of the update. An unsigned envelope is meant to be signed by an external
//! collaborator before submission.
//!
//! Updates that must be approved by several organizations carry one [`ConfigSignature`] per approving
//! admin inside the config update envelope. Collect them with [`sign_config_update`] and pass them to
//! [`EnvelopeBuilder::build_with_signatures`].

use rand_core::{OsRng, RngCore};
use typed_builder::TypedBuilder;

use crate::types::{
    crypto_primitives::{serialize_identity, sha256, Signer, SigningError},
    data_types::{ChannelID, Timestamp},
    encoding::serialize,
    messages::{
        ChannelHeader, ConfigSignature, ConfigUpdate, ConfigUpdateEnvelope, Envelope, Header,
        HeaderType, Payload, SignatureHeader,
    },
};

/// Length in bytes of the random nonces in signature headers.
pub const NONCE_LENGTH: usize = 24;

/// Builds `ConfigUpdate` envelopes.
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building an [EnvelopeBuilder]. On the builder call the following methods, then
    `.build()`.

    Optional:
    - `.signer(...)`
    - `.timestamp(...)`
    - `.epoch(...)`
    - `.message_version(...)`
"))]
pub struct EnvelopeBuilder<'a> {
    #[builder(
        default,
        setter(doc = "Set the identity that signs envelopes. Envelopes are unsigned if `None` or not set.")
    )]
    signer: Option<&'a dyn Signer>,

    #[builder(
        default,
        setter(doc = "Set the timestamp of channel headers. Channel headers carry no timestamp if `None` or not set.")
    )]
    timestamp: Option<Timestamp>,

    #[builder(default, setter(doc = "Set the epoch of channel headers. Defaults to 0."))]
    epoch: u64,

    #[builder(default, setter(doc = "Set the message protocol version of channel headers. Defaults to 0."))]
    message_version: i32,
}

impl EnvelopeBuilder<'_> {
    /// Wrap `update` into an envelope for the channel `channel_id`. The update's channel ID is
    /// overwritten with `channel_id`.
    pub fn build(
        &self,
        channel_id: &ChannelID,
        update: ConfigUpdate,
    ) -> Result<Envelope, SigningError> {
        self.build_with_signatures(channel_id, update, Vec::new())
    }

    /// Like [`build`](Self::build), but also attaches `signatures` (produced by
    /// [`sign_config_update`]) to the config update envelope.
    pub fn build_with_signatures(
        &self,
        channel_id: &ChannelID,
        update: ConfigUpdate,
        signatures: Vec<ConfigSignature>,
    ) -> Result<Envelope, SigningError> {
        let config_update_envelope = ConfigUpdateEnvelope {
            config_update: config_update_bytes(channel_id, update),
            signatures,
        };

        let (signature_header, tx_id) = match self.signer {
            Some(signer) => {
                let signature_header = new_signature_header(signer);
                let tx_id = transaction_id(&signature_header);
                (signature_header, tx_id)
            }
            None => (SignatureHeader::default(), String::new()),
        };
        let channel_header = ChannelHeader {
            header_type: HeaderType::ConfigUpdate,
            version: self.message_version,
            timestamp: self.timestamp,
            channel_id: channel_id.clone(),
            tx_id,
            epoch: self.epoch,
        };

        let payload = serialize(&Payload {
            header: Header {
                channel_header: serialize(&channel_header),
                signature_header: serialize(&signature_header),
            },
            data: serialize(&config_update_envelope),
        });
        let signature = match self.signer {
            Some(signer) => signer.sign(&payload)?,
            None => Vec::new(),
        };

        Ok(Envelope { payload, signature })
    }
}

/// Produce `signer`'s approval of `update` on the channel `channel_id`: a signature over a fresh
/// signature header followed by the serialized update.
pub fn sign_config_update(
    channel_id: &ChannelID,
    update: &ConfigUpdate,
    signer: &dyn Signer,
) -> Result<ConfigSignature, SigningError> {
    let config_update = config_update_bytes(channel_id, update.clone());
    let mut approval = ConfigSignature {
        signature_header: serialize(&new_signature_header(signer)),
        signature: Vec::new(),
    };
    approval.signature = signer.sign(&config_signature_message(&approval, &config_update))?;
    Ok(approval)
}

/// The message that a [`ConfigSignature`] signs.
pub fn config_signature_message(signature: &ConfigSignature, config_update: &[u8]) -> Vec<u8> {
    let mut message = signature.signature_header.clone();
    message.extend_from_slice(config_update);
    message
}

/// Transaction ID of a signed payload: the hex-encoded SHA256 hash of the nonce followed by the creator.
pub fn transaction_id(signature_header: &SignatureHeader) -> String {
    let mut preimage = signature_header.nonce.clone();
    preimage.extend_from_slice(&signature_header.creator);
    hex::encode(sha256(&preimage))
}

fn config_update_bytes(channel_id: &ChannelID, mut update: ConfigUpdate) -> Vec<u8> {
    update.channel_id = channel_id.clone();
    serialize(&update)
}

fn new_signature_header(signer: &dyn Signer) -> SignatureHeader {
    let mut nonce = vec![0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);
    SignatureHeader {
        creator: serialize_identity(&signer.serialized_identity()),
        nonce,
    }
}
