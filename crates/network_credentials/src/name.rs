// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Distinguished names and the organization identity carried by a leaf certificate.
//!
//! Names are compared structurally: attribute types by OID, values after
//! whitespace and case normalization, and without regard to attribute order.
//! Two renderings of the same name therefore compare equal even when an
//! encoder emitted the attributes in a different sequence.

use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use x509_parser::x509::X509Name;

pub const OID_ORGANIZATION: &str = "2.5.4.10";

const SHORT_NAMES: &[(&str, &str)] = &[
    ("CN", "2.5.4.3"),
    ("SERIALNUMBER", "2.5.4.5"),
    ("C", "2.5.4.6"),
    ("L", "2.5.4.7"),
    ("ST", "2.5.4.8"),
    ("STREET", "2.5.4.9"),
    ("O", OID_ORGANIZATION),
    ("OU", "2.5.4.11"),
    ("DC", "0.9.2342.19200300.100.1.25"),
    ("UID", "0.9.2342.19200300.100.1.1"),
    ("EMAILADDRESS", "1.2.840.113549.1.9.1"),
];

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum NameError {
    #[error("distinguished name has no {0} attribute")]
    MissingAttribute(String),
    #[error("could not parse distinguished name {0:?}: {1}")]
    MalformedName(String, String),
}

/// A single attribute-type/value pair of a distinguished name.
#[derive(Clone, Debug)]
pub struct NameAttribute {
    oid: String,
    value: String,
}

impl NameAttribute {
    pub fn new(oid: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            value: value.into(),
        }
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn short_name(&self) -> Option<&'static str> {
        SHORT_NAMES
            .iter()
            .find(|(_, oid)| *oid == self.oid)
            .map(|(name, _)| *name)
    }

    fn normalized(&self) -> (String, String) {
        let value = self
            .value
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        (self.oid.clone(), value)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DistinguishedName {
    attributes: Vec<NameAttribute>,
}

impl DistinguishedName {
    pub fn new(attributes: Vec<NameAttribute>) -> Self {
        Self { attributes }
    }

    pub fn attributes(&self) -> &[NameAttribute] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// First value bound to the given attribute OID, in encoding order.
    pub fn value_of(&self, oid: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.oid == oid)
            .map(|attr| attr.value.as_str())
    }

    fn normalized(&self) -> Vec<(String, String)> {
        let mut normalized: Vec<_> = self.attributes.iter().map(|a| a.normalized()).collect();
        normalized.sort();
        normalized
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for DistinguishedName {}

impl Hash for DistinguishedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state)
    }
}

impl From<&X509Name<'_>> for DistinguishedName {
    fn from(name: &X509Name<'_>) -> Self {
        let attributes = name
            .iter()
            .flat_map(|rdn| rdn.iter())
            .map(|attr| {
                let oid = attr.attr_type().to_id_string();
                let value = match attr.as_str() {
                    Ok(value) => value.to_owned(),
                    // RFC 4514 hex form for values without a string representation
                    Err(_) => format!("#{}", hex::encode(attr.attr_value().as_bytes())),
                };
                NameAttribute { oid, value }
            })
            .collect();
        Self { attributes }
    }
}

impl Display for DistinguishedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for attr in &self.attributes {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match attr.short_name() {
                Some(name) => write!(f, "{name}=")?,
                None => write!(f, "{}=", attr.oid)?,
            }
            write!(f, "{}", escape_value(&attr.value))?;
        }
        Ok(())
    }
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        if (i == 0 && c == '#') || matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl FromStr for DistinguishedName {
    type Err = NameError;

    /// Parses an RFC 4514 style rendering such as `O=Alice Corp, L=London, C=GB`.
    /// Both `,` and `;` separate RDNs and `+` joins multi-valued RDNs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| NameError::MalformedName(s.to_owned(), reason.to_owned());

        let mut attributes = Vec::new();
        for component in split_unescaped(s, &[',', ';', '+']).map_err(malformed)? {
            let component = component.trim();
            if component.is_empty() {
                return Err(malformed("empty attribute"));
            }
            let parts = split_unescaped(component, &['=']).map_err(malformed)?;
            let [attr_type, value] = parts.as_slice() else {
                return Err(malformed("expected exactly one '=' per attribute"));
            };
            let oid = resolve_attribute_type(attr_type.trim())
                .ok_or_else(|| malformed("unknown attribute type"))?;
            let value = unescape_value(value.trim()).map_err(malformed)?;
            attributes.push(NameAttribute { oid, value });
        }
        if attributes.is_empty() {
            return Err(malformed("no attributes"));
        }
        Ok(Self { attributes })
    }
}

fn resolve_attribute_type(attr_type: &str) -> Option<String> {
    if let Some((_, oid)) = SHORT_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(attr_type))
    {
        return Some((*oid).to_owned());
    }
    let attr_type = attr_type
        .strip_prefix("OID.")
        .or_else(|| attr_type.strip_prefix("oid."))
        .unwrap_or(attr_type);
    let is_dotted_oid = attr_type.split('.').count() > 1
        && attr_type
            .split('.')
            .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()));
    is_dotted_oid.then(|| attr_type.to_owned())
}

/// Splits on any of `separators` that is not preceded by a backslash escape.
/// Escapes are kept in the output so that a later pass can unescape values.
fn split_unescaped<'a>(s: &'a str, separators: &[char]) -> Result<Vec<&'a str>, &'static str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            if chars.next().is_none() {
                return Err("dangling escape");
            }
        } else if separators.contains(&c) {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    Ok(parts)
}

/// Undoes RFC 4514 escaping. Runs of `\XX` hex escapes are UTF-8 bytes and
/// are decoded together.
fn unescape_value(value: &str) -> Result<String, &'static str> {
    let mut unescaped = String::with_capacity(value.len());
    let mut bytes = Vec::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_hex_bytes(&mut bytes, &mut unescaped)?;
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some(hi) if hi.is_ascii_hexdigit() && chars.peek().is_some_and(|c| c.is_ascii_hexdigit()) => {
                let lo = chars.next().ok_or("dangling escape")?;
                let byte = u8::from_str_radix(&format!("{hi}{lo}"), 16)
                    .map_err(|_| "invalid hex escape")?;
                bytes.push(byte);
            }
            Some(escaped) => {
                flush_hex_bytes(&mut bytes, &mut unescaped)?;
                unescaped.push(escaped);
            }
            None => return Err("dangling escape"),
        }
    }
    flush_hex_bytes(&mut bytes, &mut unescaped)?;
    Ok(unescaped)
}

fn flush_hex_bytes(bytes: &mut Vec<u8>, out: &mut String) -> Result<(), &'static str> {
    if bytes.is_empty() {
        return Ok(());
    }
    let decoded = std::str::from_utf8(bytes).map_err(|_| "hex escapes are not valid UTF-8")?;
    out.push_str(decoded);
    bytes.clear();
    Ok(())
}

/// The participant a certificate chain belongs to, taken from the Organization
/// attribute of the leaf certificate's subject. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Organization(String);

impl Organization {
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(NameError::MissingAttribute("Organization".to_owned()));
        }
        Ok(Self(name))
    }

    pub fn from_subject_str(subject: &str) -> Result<Self, NameError> {
        let name = DistinguishedName::from_str(subject)?;
        extract_organization(&name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Organization {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Organization {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Organization> for String {
    fn from(value: Organization) -> Self {
        value.0
    }
}

/// Returns the value of the first Organization (O) attribute of `subject`.
pub fn extract_organization(subject: &DistinguishedName) -> Result<Organization, NameError> {
    subject
        .value_of(OID_ORGANIZATION)
        .ok_or_else(|| NameError::MissingAttribute("Organization".to_owned()))
        .and_then(Organization::new)
}
