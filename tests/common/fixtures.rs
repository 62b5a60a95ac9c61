use std::sync::Mutex;

use fabric_channel_config::{
    certificates::X509CertificateAuthority,
    config_tree::ConfigTree,
    genesis::{
        configuration::GenesisConfiguration,
        profile::{ChannelProfile, ConsenterDescriptor, OrganizationDescriptor},
        GenesisAssembler,
    },
    service::{Broadcaster, SubmissionError},
    types::{
        crypto_primitives::{Ed25519Signer, SigningKey},
        messages::Envelope,
        values::AnchorPeerAddress,
    },
};
use rand_core::OsRng;

use super::certs::self_signed_pem;

pub(crate) const CHANNEL_NAME: &str = "mychannel";

// A peer organization with its own freshly generated CA certificates.
pub(crate) fn peer_organization(name: &str, anchor_peers: &[(&str, u16)]) -> OrganizationDescriptor {
    OrganizationDescriptor {
        name: name.to_string(),
        anchor_peers: anchor_peers
            .iter()
            .map(|(host, port)| AnchorPeerAddress::new(*host, *port))
            .collect(),
        orderer_endpoints: Vec::new(),
        sign_ca_cert: self_signed_pem(&format!("ca.{}", domain(name))),
        tls_ca_cert: self_signed_pem(&format!("tlsca.{}", domain(name))),
        intermediate_certs: Vec::new(),
        tls_intermediate_certs: Vec::new(),
    }
}

pub(crate) fn orderer_organization(name: &str, endpoint: &str) -> OrganizationDescriptor {
    OrganizationDescriptor {
        name: name.to_string(),
        anchor_peers: Vec::new(),
        orderer_endpoints: vec![endpoint.to_string()],
        sign_ca_cert: self_signed_pem(&format!("ca.{}", domain(name))),
        tls_ca_cert: self_signed_pem(&format!("tlsca.{}", domain(name))),
        intermediate_certs: Vec::new(),
        tls_intermediate_certs: Vec::new(),
    }
}

// The DNS name certificates of the organization `name` are issued for.
fn domain(name: &str) -> String {
    format!("{}.example.com", name.to_lowercase().replace(' ', "-"))
}

pub(crate) fn consenter(host: &str, port: u16) -> ConsenterDescriptor {
    ConsenterDescriptor {
        address: AnchorPeerAddress::new(host, port),
        client_tls_cert: self_signed_pem("client.consenter.example.com"),
        server_tls_cert: self_signed_pem("server.consenter.example.com"),
    }
}

// Two peer organizations (only the first with an anchor peer), one orderer organization, one consenter.
pub(crate) fn channel_profile(name: &str) -> ChannelProfile {
    ChannelProfile {
        name: name.to_string(),
        peer_orgs: vec![
            peer_organization("Org1MSP", &[("peer0.org1.example.com", 7051)]),
            peer_organization("Org2MSP", &[]),
        ],
        orderer_orgs: vec![orderer_organization(
            "OrdererMSP",
            "orderer.example.com:7050",
        )],
        consenters: vec![consenter("orderer.example.com", 7050)],
    }
}

pub(crate) fn genesis_tree(profile: &ChannelProfile) -> ConfigTree {
    let configuration = GenesisConfiguration::default();
    GenesisAssembler::new(&X509CertificateAuthority, &configuration)
        .assemble(profile)
        .unwrap()
}

pub(crate) fn signer(msp_id: &str) -> Ed25519Signer {
    let mut csprg = OsRng {};
    Ed25519Signer::new(msp_id, SigningKey::generate(&mut csprg))
}

// A broadcaster that records every envelope it receives and answers with a fixed outcome.
pub(crate) struct RecordingBroadcaster {
    outcome: Result<(), SubmissionError>,
    pub(crate) received: Mutex<Vec<Envelope>>,
}

impl RecordingBroadcaster {
    pub(crate) fn accepting() -> RecordingBroadcaster {
        RecordingBroadcaster {
            outcome: Ok(()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: SubmissionError) -> RecordingBroadcaster {
        RecordingBroadcaster {
            outcome: Err(error),
            received: Mutex::new(Vec::new()),
        }
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, envelope: &Envelope) -> Result<(), SubmissionError> {
        self.received.lock().unwrap().push(envelope.clone());
        self.outcome.clone()
    }
}
