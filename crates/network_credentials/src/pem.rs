// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pem::{encode_config, parse, EncodeConfig, LineEnding, Pem};

use crate::certificate::Certificate;
use crate::error::DecodeError;

pub const CERTIFICATE_TAG: &str = "CERTIFICATE";

pub trait PemTaggable {
    fn tag() -> String;
}

pub trait DerEncodable {
    fn der_bytes(&self) -> Vec<u8>;
}

pub trait DerDecodable: Sized {
    fn from_der_bytes(der: &[u8]) -> Result<Self, DecodeError>;
}

pub trait PemEncodable: DerEncodable + PemTaggable {
    /// Converts to PEM string.
    fn to_pem(&self) -> String;
}

pub trait PemDecodable: DerDecodable + PemTaggable {
    fn from_pem<T: AsRef<[u8]>>(data: T) -> Result<Self, DecodeError>;
}

impl<T: DerEncodable + PemTaggable> PemEncodable for T {
    fn to_pem(&self) -> String {
        let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
        encode_config(&to_pem_inner(self), config)
    }
}

impl<T: DerDecodable + PemTaggable> PemDecodable for T {
    fn from_pem<K: AsRef<[u8]>>(data: K) -> Result<Self, DecodeError> {
        let pem = parse(data)?;
        from_pem_inner::<T>(&pem)
    }
}

fn to_pem_inner<T: DerEncodable + PemTaggable>(item: &T) -> Pem {
    Pem::new(T::tag(), item.der_bytes())
}

fn from_pem_inner<T: DerDecodable + PemTaggable>(pem: &Pem) -> Result<T, DecodeError> {
    if pem.tag() != T::tag() {
        return Err(DecodeError::UnexpectedPEMTag(
            T::tag(),
            pem.tag().to_owned(),
        ));
    }
    T::from_der_bytes(pem.contents())
}

impl PemTaggable for Certificate {
    fn tag() -> String {
        CERTIFICATE_TAG.to_owned()
    }
}

impl DerEncodable for Certificate {
    fn der_bytes(&self) -> Vec<u8> {
        self.as_der().to_vec()
    }
}

impl DerDecodable for Certificate {
    fn from_der_bytes(der: &[u8]) -> Result<Self, DecodeError> {
        Certificate::from_der(der)
    }
}

/// Several PEM blocks held together, e.g. the contents of a chain file.
pub struct MultiItemPemBuilder(Vec<Pem>);

impl MultiItemPemBuilder {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add_item<T: PemEncodable>(&mut self, item: &T) {
        self.0.push(to_pem_inner(item));
    }

    pub fn finish(self) -> String {
        let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
        pem::encode_many_config(&self.0, config)
    }

    pub fn parse<B: AsRef<[u8]>>(data: B) -> Result<Self, DecodeError> {
        let items = pem::parse_many(data)?;
        Ok(Self(items))
    }

    /// Finds all PEM encoded items of type `T`, in the order they appear. If none found it will return an empty `Vec`.
    /// If any items with the matching tag fail decoding then an error will be returned.
    pub fn find_all<T: PemDecodable>(&self) -> Result<Vec<T>, DecodeError> {
        self.0
            .iter()
            .filter(|x| x.tag() == T::tag())
            .map(|p| from_pem_inner::<T>(p))
            .collect::<Result<Vec<_>, _>>()
    }
}

impl Default for MultiItemPemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport form used in the credential bundle: the certificate's PEM
/// encoding, itself base64 encoded so it can sit in a JSON string.
pub fn encode_to_transport_form(cert: &Certificate) -> String {
    STANDARD.encode(cert.to_pem())
}

pub fn decode_transport_form(encoded: &str) -> Result<Certificate, DecodeError> {
    let pem = STANDARD
        .decode(encoded)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    Certificate::from_pem(pem)
}
