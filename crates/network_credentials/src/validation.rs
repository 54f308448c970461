// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural and cryptographic checks over an ordered certificate chain.
//!
//! Verification problems are reported as values, never as panics or
//! propagated library errors: a store holding corrupted or hostile chains
//! simply yields chains that fail validation.

use thiserror::Error;

use crate::certificate::{Certificate, SignatureVerificationError};

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ChainValidationError {
    #[error("the chain is empty")]
    Empty,
    #[error("issuer of certificate {position} does not match the subject of certificate {}", .position + 1)]
    IssuerMismatch { position: usize },
    #[error("signature of certificate {position} does not verify against the key of certificate {}: {reason}", .position + 1)]
    BadSignature {
        position: usize,
        reason: SignatureVerificationError,
    },
    #[error("the last certificate in the chain is not self-signed")]
    RootNotSelfSigned,
}

/// True if the certificate names itself as issuer and its signature verifies
/// against its own public key. Any verification error counts as "no".
pub fn is_self_signed(cert: &Certificate) -> bool {
    cert.subject() == cert.issuer() && cert.verify(cert.public_key()).is_ok()
}

pub fn is_valid_chain(chain: &[Certificate]) -> bool {
    validate_chain(chain).is_ok()
}

/// Walks the chain from the leaf towards the root and reports the first
/// problem found: each certificate must be issued and signed by the next one,
/// and the last one must be self-signed.
pub fn validate_chain(chain: &[Certificate]) -> Result<(), ChainValidationError> {
    let root = chain.last().ok_or(ChainValidationError::Empty)?;

    for (position, (cert, issuer)) in chain.iter().zip(chain.iter().skip(1)).enumerate() {
        if cert.issuer() != issuer.subject() {
            return Err(ChainValidationError::IssuerMismatch { position });
        }
        cert.verify(issuer.public_key())
            .map_err(|reason| ChainValidationError::BadSignature { position, reason })?;
    }

    if !is_self_signed(root) {
        return Err(ChainValidationError::RootNotSelfSigned);
    }
    Ok(())
}
