/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Parsing of the PEM-encoded X.509 certificates that organizations and consenters are described with.
//!
//! Certificate handling is pluggable through the [`CertificateAuthority`] trait. The default
//! implementation, [`X509CertificateAuthority`], checks that its input is a single well-formed PEM
//! `CERTIFICATE` block holding a DER certificate that parses as X.509. Only whitespace may follow the
//! block.

use x509_parser::pem::parse_x509_pem;

/// A parsed certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    /// The PEM text the certificate was parsed from. This is what configuration trees store.
    pub pem: Vec<u8>,
    pub der: Vec<u8>,
    pub subject: String,
}

/// Parses certificates on behalf of the [genesis assembler](crate::genesis).
pub trait CertificateAuthority: Send + Sync {
    fn parse_pem(&self, pem: &[u8]) -> Result<Certificate, CertificateParseError>;
}

/// [`CertificateAuthority`] backed by the [`x509_parser`] crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct X509CertificateAuthority;

impl CertificateAuthority for X509CertificateAuthority {
    fn parse_pem(&self, pem: &[u8]) -> Result<Certificate, CertificateParseError> {
        let (remainder, block) = parse_x509_pem(pem)
            .map_err(|err| CertificateParseError::MalformedPem(format!("{:?}", err)))?;
        if !remainder.iter().all(u8::is_ascii_whitespace) {
            return Err(CertificateParseError::TrailingData {
                length: remainder.len(),
            });
        }
        if block.label != "CERTIFICATE" {
            return Err(CertificateParseError::NotACertificate { label: block.label });
        }
        let certificate = block
            .parse_x509()
            .map_err(|err| CertificateParseError::InvalidCertificate(format!("{:?}", err)))?;
        let subject = certificate.subject().to_string();

        Ok(Certificate {
            pem: pem.to_vec(),
            der: block.contents.clone(),
            subject,
        })
    }
}

/// Error when a certificate cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateParseError {
    #[error("malformed PEM: {0}")]
    MalformedPem(String),

    #[error("PEM block is labelled '{label}', expected 'CERTIFICATE'")]
    NotACertificate { label: String },

    #[error("{length} bytes follow the certificate's PEM block")]
    TrailingData { length: usize },

    #[error("invalid X.509 certificate: {0}")]
    InvalidCertificate(String),
}
