//! RFC 5321 mailbox parsing and the address types used by the domain model.
//!
//! A mailbox is `Local-part "@" Domain` with the usual constraints: the
//! local part is a dot-string of atext atoms (max 64 octets), the domain is
//! a sequence of LDH labels or a bracketed IP address literal (max 255
//! octets). Display-name forms are not accepted; the canonical textual form
//! is `local@domain`, optionally wrapped in angle brackets on input.

use std::{
    fmt::{self, Display},
    net::{Ipv4Addr, Ipv6Addr},
    ops::Deref,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of the local part, in octets (RFC 5321 section 4.5.3.1.1).
const MAX_LOCAL_PART: usize = 64;

/// Maximum length of the domain, in octets (RFC 5321 section 4.5.3.1.2).
const MAX_DOMAIN: usize = 255;

/// Errors that can occur while parsing a mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Empty input.
    #[error("empty address")]
    Empty,

    /// An opening angle bracket without its closing counterpart, or vice
    /// versa.
    #[error("unbalanced angle brackets")]
    UnbalancedBrackets,

    /// Missing the `@` separator between local part and domain.
    #[error("missing '@' separator")]
    MissingAtSign,

    /// The local part exceeds 64 octets.
    #[error("local part exceeds {MAX_LOCAL_PART} octets")]
    LocalPartTooLong,

    /// The domain exceeds 255 octets.
    #[error("domain exceeds {MAX_DOMAIN} octets")]
    DomainTooLong,

    /// The local part is empty or contains a character outside the atext
    /// set, or has a leading, trailing, or doubled dot.
    #[error("invalid local part: {0:?}")]
    InvalidLocalPart(String),

    /// The domain is empty or contains a label that is not letters, digits,
    /// and interior hyphens.
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),

    /// A bracketed address literal that is not a valid IPv4 or IPv6 address.
    #[error("invalid address literal: {0:?}")]
    InvalidAddressLiteral(String),
}

/// A validated SMTP mailbox (`local-part@domain`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    local_part: String,
    domain: String,
}

impl Mailbox {
    /// Parses a mailbox from its textual form.
    ///
    /// Accepts `local@domain` and `<local@domain>`; leading and trailing
    /// whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] describing the first constraint the input
    /// violates.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        let inner = match (trimmed.strip_prefix('<'), trimmed.ends_with('>')) {
            (Some(rest), true) => rest.strip_suffix('>').unwrap_or(rest),
            (None, false) => trimmed,
            _ => return Err(AddressError::UnbalancedBrackets),
        };

        let (local_part, domain) = inner
            .rsplit_once('@')
            .ok_or(AddressError::MissingAtSign)?;

        validate_local_part(local_part)?;
        validate_domain(domain)?;

        Ok(Self {
            local_part: local_part.to_owned(),
            domain: domain.to_owned(),
        })
    }

    /// The part before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    /// The part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// An ordered list of mailboxes, as carried by the to/cc/bcc fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressList(Vec<Mailbox>);

impl AddressList {
    /// Parses every entry, failing on the first invalid one together with
    /// the offending input.
    ///
    /// # Errors
    ///
    /// Returns the first entry that fails [`Mailbox::parse`], paired with
    /// its error.
    pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<Self, (String, AddressError)> {
        inputs
            .iter()
            .map(|input| {
                Mailbox::parse(input.as_ref())
                    .map_err(|e| (input.as_ref().to_owned(), e))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// The addresses as their canonical textual forms.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mailbox) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            Display::fmt(mailbox, f)?;
        }
        Ok(())
    }
}

impl From<Vec<Mailbox>> for AddressList {
    fn from(value: Vec<Mailbox>) -> Self {
        Self(value)
    }
}

impl Deref for AddressList {
    type Target = Vec<Mailbox>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// atext per RFC 5321: alphanumerics plus the printable specials allowed in
/// an atom.
const fn is_atext(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'/'
                | b'='
                | b'?'
                | b'^'
                | b'_'
                | b'`'
                | b'{'
                | b'|'
                | b'}'
                | b'~'
        )
}

fn validate_local_part(local_part: &str) -> Result<(), AddressError> {
    if local_part.is_empty() {
        return Err(AddressError::InvalidLocalPart(local_part.to_owned()));
    }
    if local_part.len() > MAX_LOCAL_PART {
        return Err(AddressError::LocalPartTooLong);
    }

    // Dot-string: atoms of atext separated by single dots.
    for atom in local_part.split('.') {
        if atom.is_empty() || !atom.bytes().all(is_atext) {
            return Err(AddressError::InvalidLocalPart(local_part.to_owned()));
        }
    }

    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), AddressError> {
    if domain.is_empty() {
        return Err(AddressError::InvalidDomain(domain.to_owned()));
    }
    if domain.len() > MAX_DOMAIN {
        return Err(AddressError::DomainTooLong);
    }

    if domain.starts_with('[') {
        return validate_address_literal(domain);
    }

    for label in domain.split('.') {
        let bytes = label.as_bytes();
        let valid = match (bytes.first(), bytes.last()) {
            (Some(first), Some(last)) => {
                first.is_ascii_alphanumeric()
                    && last.is_ascii_alphanumeric()
                    && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
            }
            _ => false,
        };
        if !valid || bytes.len() > 63 {
            return Err(AddressError::InvalidDomain(domain.to_owned()));
        }
    }

    Ok(())
}

fn validate_address_literal(domain: &str) -> Result<(), AddressError> {
    let inner = domain
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| AddressError::InvalidAddressLiteral(domain.to_owned()))?;

    let valid = if let Some(v6) = inner.strip_prefix("IPv6:") {
        v6.parse::<Ipv6Addr>().is_ok()
    } else {
        inner.parse::<Ipv4Addr>().is_ok()
    };

    if valid {
        Ok(())
    } else {
        Err(AddressError::InvalidAddressLiteral(domain.to_owned()))
    }
}
