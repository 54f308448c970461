// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

mod aggregate;
mod batch;
mod bundle;
mod certificate;
mod chain;
mod error;
mod extract;
mod name;
mod pem;
mod record;
mod scratch;
mod store;
mod validation;

pub use crate::pem::{
    decode_transport_form, encode_to_transport_form, MultiItemPemBuilder, PemDecodable,
    PemEncodable, CERTIFICATE_TAG,
};
pub use aggregate::{
    NodeAggregator, NodeStores, StoreLayout, TransportPolicy, TransportPolicyParseError,
    DEFAULT_IDENTITY_STORE, DEFAULT_TLS_STORE,
};
pub use batch::{build_bundle, BatchError, BatchOptions, BatchOutcome, SkippedNode};
pub use bundle::CredentialBundle;
pub use certificate::{Certificate, PublicKey, SignatureVerificationError};
pub use chain::{CertificateChain, ChainRole};
pub use error::{DecodeError, EncodeError};
pub use extract::{
    extract_chain, AliasSelector, ChainExtractor, ExtractedChain, ExtractionError, RoleLabels,
    CANONICAL_CHAIN_LENGTH,
};
pub use name::{
    extract_organization, DistinguishedName, NameAttribute, NameError, Organization,
    OID_ORGANIZATION,
};
pub use record::{NodeCredentialRecord, TransportCredentials};
pub use scratch::{ScratchError, ScratchScope};
pub use store::{
    CertificateStore, CredentialStore, LoadError, PemDirectoryLoader, StoreEntry, StoreLoader,
    STORE_ENTRY_EXTENSIONS,
};
pub use validation::{is_self_signed, is_valid_chain, validate_chain, ChainValidationError};

pub mod file;
pub mod test_helpers;
