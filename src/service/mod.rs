/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The request/response boundary of the library.
//!
//! A [`ChannelService`] exposes one call per channel configuration operation. Each call takes a
//! [request DTO](dto) and returns either a response DTO or a [`ServiceError`] whose
//! [kind](ServiceError::kind) a transport layer can map onto its own status codes:
//!
//! | Call                                            | Request                   | Response                 |
//! |-------------------------------------------------|---------------------------|--------------------------|
//! | [`create_genesis`](ChannelService::create_genesis)     | [`CreateChannelRequest`]  | [`CreateChannelResponse`] |
//! | [`update_channel`](ChannelService::update_channel)     | [`UpdateChannelRequest`]  | [`ConfigUpdateResponse`]  |
//! | [`set_anchor_peers`](ChannelService::set_anchor_peers) | [`SetAnchorPeersRequest`] | [`ConfigUpdateResponse`]  |
//! | [`decode_block`](ChannelService::decode_block)         | [`DecodeBlockRequest`]    | [`DecodeBlockResponse`]   |
//! | [`submit`](ChannelService::submit)                     | serialized envelope       | `()`                      |
//!
//! ## Building a service
//!
//! ```no_run
//! use fabric_channel_config::service::{ChannelServiceSpec, ServiceConfiguration};
//!
//! let service = ChannelServiceSpec::builder()
//!     .configuration(ServiceConfiguration::builder().log_events(true).build())
//!     .on_no_differences(|event| println!("nothing to do on {}", event.channel_id))
//!     .build()
//!     .start();
//! ```
//!
//! A service holds no mutable state, so a single instance can serve concurrent requests.

pub mod dto;

pub mod submission;

use std::{collections::BTreeSet, time::SystemTime};

use borsh::BorshDeserialize;
use typed_builder::TypedBuilder;

use crate::{
    block_codec::{self, DecodeError},
    certificates::{CertificateAuthority, X509CertificateAuthority},
    config_tree::organizations::OrganizationError,
    envelope::EnvelopeBuilder,
    event_bus::{EventHandlers, HandlerPtr},
    events::*,
    genesis::{configuration::GenesisConfiguration, GenesisAssembler, GenesisError},
    types::{
        crypto_primitives::{sha256, Signer, SigningError},
        data_types::{ChannelID, Timestamp, VersionExhausted},
        encoding::serialize,
        messages::{ChannelHeader, Envelope, Payload},
    },
    update::{
        anchor_peers::{reconcile_anchor_peers, ReconcileError},
        compute_update, ComputedUpdate,
    },
    validation::{validate_channel_id, ValidationError},
};

pub use self::{dto::*, submission::*};

/// Message of successful [`create_genesis`](ChannelService::create_genesis) responses.
pub const GENESIS_CREATED_MESSAGE: &str = "Channel genesis created successfully";

/// Parameters of a [`ChannelService`].
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ServiceConfiguration]. On the builder call the following methods to
    construct a valid [ServiceConfiguration].

    Required:
    - `.log_events(...)`

    Optional:
    - `.timestamp_envelopes(...)`
    - `.genesis(...)`
"))]
pub struct ServiceConfiguration {
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,

    #[builder(
        default = false,
        setter(doc = "Stamp channel headers with the current time? Unstamped blocks and envelopes are a pure function of their content. Defaults to false.")
    )]
    pub timestamp_envelopes: bool,

    #[builder(
        default,
        setter(doc = "Set the channel-wide parameters of new channels. Defaults to `GenesisConfiguration::default()`.")
    )]
    pub genesis: GenesisConfiguration,
}

/// Stores the parameters and trait implementations required to run a [`ChannelService`].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ChannelServiceSpec]. On the builder call the following methods to
    construct a valid [ChannelServiceSpec].

    Required:
    - `.configuration(...)`

    Optional:
    - `.certificate_authority(...)`
    - `.signer(...)`
    - `.on_assemble_genesis(...)`
    - `.on_compute_update(...)`
    - `.on_no_differences(...)`
    - `.on_build_envelope(...)`
    - `.on_decode_block(...)`
    - `.on_submit_envelope(...)`
"))]
pub struct ChannelServiceSpec {
    #[builder(setter(doc = "Set the [configuration](ServiceConfiguration) of the service. Required."))]
    configuration: ServiceConfiguration,

    #[builder(
        default = Box::new(X509CertificateAuthority),
        setter(
            transform = |authority: impl CertificateAuthority + 'static| Box::new(authority) as Box<dyn CertificateAuthority>,
            doc = "Set the implementation used to parse certificates. Defaults to [X509CertificateAuthority]."
        )
    )]
    certificate_authority: Box<dyn CertificateAuthority>,

    #[builder(
        default,
        setter(
            transform = |signer: impl Signer + 'static| Some(Box::new(signer) as Box<dyn Signer>),
            doc = "Set the identity that signs update envelopes. Envelopes are unsigned if not set."
        )
    )]
    signer: Option<Box<dyn Signer>>,

    #[builder(default, setter(transform = |handler: impl Fn(&AssembleGenesisEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<AssembleGenesisEvent>),
    doc = "Register a user-defined handler function to be called when a genesis block is assembled. Optional."))]
    on_assemble_genesis: Option<HandlerPtr<AssembleGenesisEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ComputeUpdateEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<ComputeUpdateEvent>),
    doc = "Register a user-defined handler function to be called when a configuration update is computed. Optional."))]
    on_compute_update: Option<HandlerPtr<ComputeUpdateEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&NoDifferencesEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<NoDifferencesEvent>),
    doc = "Register a user-defined handler function to be called when a desired configuration equals the committed one. Optional."))]
    on_no_differences: Option<HandlerPtr<NoDifferencesEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&BuildEnvelopeEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<BuildEnvelopeEvent>),
    doc = "Register a user-defined handler function to be called when an update envelope is built. Optional."))]
    on_build_envelope: Option<HandlerPtr<BuildEnvelopeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DecodeBlockEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<DecodeBlockEvent>),
    doc = "Register a user-defined handler function to be called when a block is decoded. Optional."))]
    on_decode_block: Option<HandlerPtr<DecodeBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SubmitEnvelopeEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<SubmitEnvelopeEvent>),
    doc = "Register a user-defined handler function to be called when an envelope is submitted. Optional."))]
    on_submit_envelope: Option<HandlerPtr<SubmitEnvelopeEvent>>,
}

impl ChannelServiceSpec {
    /// Create the [`ChannelService`] described by this spec.
    pub fn start(self) -> ChannelService {
        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_assemble_genesis,
            self.on_compute_update,
            self.on_no_differences,
            self.on_build_envelope,
            self.on_decode_block,
            self.on_submit_envelope,
        );

        ChannelService {
            configuration: self.configuration,
            certificate_authority: self.certificate_authority,
            signer: self.signer,
            event_handlers,
        }
    }
}

/// Performs channel configuration operations on behalf of a transport layer.
pub struct ChannelService {
    configuration: ServiceConfiguration,
    certificate_authority: Box<dyn CertificateAuthority>,
    signer: Option<Box<dyn Signer>>,
    event_handlers: EventHandlers,
}

impl ChannelService {
    /// Assemble the genesis configuration of a new channel and serialize it into a genesis block.
    pub fn create_genesis(
        &self,
        request: &CreateChannelRequest,
    ) -> Result<CreateChannelResponse, ServiceError> {
        let assembler =
            GenesisAssembler::new(self.certificate_authority.as_ref(), &self.configuration.genesis);
        let tree = assembler.assemble(request)?;

        let channel_id = ChannelID::new(request.name.as_str());
        let block = block_codec::genesis_block(tree, &channel_id, self.timestamp());
        self.event_handlers
            .fire_handlers(Event::AssembleGenesis(AssembleGenesisEvent {
                timestamp: SystemTime::now(),
                channel_id,
                peer_orgs: request.peer_orgs.len(),
                orderer_orgs: request.orderer_orgs.len(),
                data_hash: block.header.data_hash.clone(),
            }));

        Ok(CreateChannelResponse {
            message: GENESIS_CREATED_MESSAGE.to_string(),
            channel: serialize(&block).into(),
        })
    }

    /// Compute the update that turns the configuration in `request.block` into the one in
    /// `request.desired_block`, and wrap it into an envelope.
    pub fn update_channel(
        &self,
        request: &UpdateChannelRequest,
    ) -> Result<ConfigUpdateResponse, ServiceError> {
        let channel_id = ChannelID::new(request.channel_name.as_str());
        validate_channel_id(&channel_id)?;
        let current = block_codec::extract_config(request.block.bytes())?;
        let desired = block_codec::extract_config(request.desired_block.bytes())?;

        let computed = compute_update(current, desired, &channel_id)?;
        self.respond_with_envelope(&channel_id, computed)
    }

    /// Compute the update that sets the anchor peers of the application organization `request.msp_id`
    /// to exactly `request.anchor_peers`, and wrap it into an envelope.
    pub fn set_anchor_peers(
        &self,
        request: &SetAnchorPeersRequest,
    ) -> Result<ConfigUpdateResponse, ServiceError> {
        let channel_id = ChannelID::new(request.channel_name.as_str());
        validate_channel_id(&channel_id)?;
        let current = block_codec::extract_config(request.block.bytes())?;
        let desired: BTreeSet<_> = request.anchor_peers.iter().cloned().collect();

        let computed = reconcile_anchor_peers(current, &request.msp_id, &desired, &channel_id)?;
        self.respond_with_envelope(&channel_id, computed)
    }

    /// Decode a block into its fully expanded form.
    pub fn decode_block(
        &self,
        request: &DecodeBlockRequest,
    ) -> Result<DecodeBlockResponse, ServiceError> {
        let data = block_codec::decode(request.data.bytes())?;
        self.event_handlers
            .fire_handlers(Event::DecodeBlock(DecodeBlockEvent {
                timestamp: SystemTime::now(),
                block_number: data.header.number,
                envelopes: data.data.data.len(),
            }));

        Ok(DecodeBlockResponse { data })
    }

    /// Hand the serialized envelope `envelope` to the ordering service behind `broadcaster`.
    ///
    /// A [`SubmissionError::Conflict`] is returned to the caller unmodified, since only the caller can
    /// resolve it (by computing the update again against the latest configuration).
    pub fn submit(&self, envelope: &[u8], broadcaster: &dyn Broadcaster) -> Result<(), ServiceError> {
        let envelope = Envelope::try_from_slice(envelope).map_err(DecodeError::Envelope)?;
        let result = broadcaster.broadcast(&envelope);
        self.event_handlers
            .fire_handlers(Event::SubmitEnvelope(SubmitEnvelopeEvent {
                timestamp: SystemTime::now(),
                payload_hash: sha256(&envelope.payload),
                accepted: result.is_ok(),
            }));

        Ok(result?)
    }

    fn respond_with_envelope(
        &self,
        channel_id: &ChannelID,
        computed: ComputedUpdate,
    ) -> Result<ConfigUpdateResponse, ServiceError> {
        let update = match computed {
            ComputedUpdate::NoDifferences => {
                self.event_handlers
                    .fire_handlers(Event::NoDifferences(NoDifferencesEvent {
                        timestamp: SystemTime::now(),
                        channel_id: channel_id.clone(),
                    }));
                return Ok(ConfigUpdateResponse::no_changes());
            }
            ComputedUpdate::Update(update) => update,
        };
        self.event_handlers
            .fire_handlers(Event::ComputeUpdate(ComputeUpdateEvent {
                timestamp: SystemTime::now(),
                channel_id: channel_id.clone(),
                read_set_size: update.read_paths().len(),
                write_set_size: update.write_paths().len(),
            }));

        let envelope = EnvelopeBuilder::builder()
            .signer(self.signer.as_deref())
            .timestamp(self.timestamp())
            .build()
            .build(channel_id, update)?;
        self.event_handlers
            .fire_handlers(Event::BuildEnvelope(BuildEnvelopeEvent {
                timestamp: SystemTime::now(),
                channel_id: channel_id.clone(),
                tx_id: transaction_id_of(&envelope),
                signed: !envelope.signature.is_empty(),
                payload_hash: sha256(&envelope.payload),
            }));

        Ok(ConfigUpdateResponse {
            no_changes: false,
            envelope: serialize(&envelope).into(),
        })
    }

    fn timestamp(&self) -> Option<Timestamp> {
        self.configuration
            .timestamp_envelopes
            .then(Timestamp::now)
    }
}

fn transaction_id_of(envelope: &Envelope) -> String {
    Payload::try_from_slice(&envelope.payload)
        .and_then(|payload| ChannelHeader::try_from_slice(&payload.header.channel_header))
        .map(|channel_header| channel_header.tx_id)
        .unwrap_or_default()
}

/// The category of a [`ServiceError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A certificate in the request could not be parsed.
    CertificateParse,
    /// The request violates a structural rule.
    Validation,
    /// A block or envelope in the request could not be decoded.
    Decode,
    Signing,
    /// The ordering service reported that the update is stale.
    SubmissionConflict,
    Submission,
}

/// Error returned by a [`ChannelService`] call.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Genesis(#[from] GenesisError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Organization(#[from] OrganizationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    VersionExhausted(#[from] VersionExhausted),
}

impl From<ReconcileError> for ServiceError {
    fn from(error: ReconcileError) -> Self {
        match error {
            ReconcileError::Organization(error) => ServiceError::Organization(error),
            ReconcileError::Validation(error) => ServiceError::Validation(error),
            ReconcileError::VersionExhausted(error) => ServiceError::VersionExhausted(error),
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Genesis(GenesisError::CertificateParse { .. }) => {
                ErrorKind::CertificateParse
            }
            ServiceError::Genesis(GenesisError::Validation(_)) | ServiceError::Validation(_) => {
                ErrorKind::Validation
            }
            ServiceError::Organization(OrganizationError::UnknownOrganization { .. })
            | ServiceError::Organization(OrganizationError::VersionExhausted(_))
            | ServiceError::VersionExhausted(_) => ErrorKind::Validation,
            ServiceError::Organization(OrganizationError::MalformedValue { .. })
            | ServiceError::Decode(_) => ErrorKind::Decode,
            ServiceError::Signing(_) => ErrorKind::Signing,
            ServiceError::Submission(SubmissionError::Conflict(_)) => {
                ErrorKind::SubmissionConflict
            }
            ServiceError::Submission(_) => ErrorKind::Submission,
        }
    }
}
