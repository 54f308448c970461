// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{Debug, Display, Formatter};

use thiserror::Error;
use x509_parser::prelude::{FromDer, SubjectPublicKeyInfo, X509Certificate};

use crate::error::DecodeError;
use crate::name::DistinguishedName;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum SignatureVerificationError {
    #[error("certificate could not be parsed for verification")]
    MalformedCertificate,
    #[error("issuer public key could not be parsed")]
    MalformedKey,
    #[error("{0}")]
    Invalid(String),
}

/// DER encoded SubjectPublicKeyInfo.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self(der.into())
    }

    pub fn as_der(&self) -> &[u8] {
        &self.0
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

/// An X.509 certificate loaded from a credential store.
///
/// The DER encoding is retained so the certificate can be re-encoded byte for
/// byte, and the subject, issuer and public key are parsed once up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    public_key: PublicKey,
}

impl Certificate {
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, DecodeError> {
        let der = der.into();
        let (subject, issuer, public_key) = {
            let (rest, cert) =
                X509Certificate::from_der(&der).map_err(|e| DecodeError::X509(e.to_string()))?;
            if !rest.is_empty() {
                return Err(DecodeError::TrailingData);
            }
            (
                DistinguishedName::from(cert.subject()),
                DistinguishedName::from(cert.issuer()),
                PublicKey(cert.public_key().raw.to_vec()),
            )
        };
        Ok(Self {
            der,
            subject,
            issuer,
            public_key,
        })
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Checks this certificate's signature against `issuer_key`.
    pub fn verify(&self, issuer_key: &PublicKey) -> Result<(), SignatureVerificationError> {
        let (_, cert) = X509Certificate::from_der(&self.der)
            .map_err(|_| SignatureVerificationError::MalformedCertificate)?;
        let (_, spki) = SubjectPublicKeyInfo::from_der(issuer_key.as_der())
            .map_err(|_| SignatureVerificationError::MalformedKey)?;
        cert.verify_signature(Some(&spki))
            .map_err(|e| SignatureVerificationError::Invalid(e.to_string()))
    }
}
