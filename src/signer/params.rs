// dkim-signer – DKIM signing of email messages
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

use crate::{
    header::FieldName,
    signature::{Canonicalization, DKIM_SIGNATURE_NAME},
    tag_list,
};

/// The headers signed when no header list is given.
pub const DEFAULT_SIGNED_HEADERS: [&str; 5] = ["date", "from", "reply-to", "sender", "subject"];

/// An error that occurs when creating signing parameters.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("domain cannot be empty")]
    EmptyDomain,
    #[error("invalid domain {0:?}")]
    InvalidDomain(String),
    #[error("selector cannot be empty")]
    EmptySelector,
    #[error("invalid selector {0:?}")]
    InvalidSelector(String),
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}

/// Validated, immutable parameters of a DKIM signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningParams {
    domain: Box<str>,
    selector: Box<str>,
    headers_to_sign: Vec<FieldName>,
    identifier: Option<Box<str>>,
}

impl SigningParams {
    /// Creates signing parameters for the given domain (*d=*), selector
    /// (*s=*) and names of headers to sign (*h=*).
    ///
    /// Header names are lowercased, and only the first of several equal
    /// names is kept. *From* is appended if missing, the caller’s order is
    /// preserved otherwise.
    pub fn new<I, S>(domain: &str, selector: &str, headers: I) -> Result<Self, ParamsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_domain(domain)?;
        validate_selector(selector)?;

        let mut headers_to_sign: Vec<FieldName> = vec![];

        for name in headers {
            let name = name.as_ref();

            // ';' cannot appear in the h= tag value
            let field_name = FieldName::new(name.to_ascii_lowercase())
                .ok()
                .filter(|n| !n.as_ref().contains(';') && *n != DKIM_SIGNATURE_NAME)
                .ok_or_else(|| ParamsError::InvalidHeaderName(name.into()))?;

            if !headers_to_sign.contains(&field_name) {
                headers_to_sign.push(field_name);
            }
        }

        if !headers_to_sign.iter().any(|name| *name == "from") {
            let from = FieldName::new("from")
                .map_err(|_| ParamsError::InvalidHeaderName("from".into()))?;
            headers_to_sign.push(from);
        }

        Ok(Self {
            domain: domain.into(),
            selector: selector.into(),
            headers_to_sign,
            identifier: None,
        })
    }

    /// Creates signing parameters that sign the headers *Date*, *From*,
    /// *Reply-To*, *Sender* and *Subject*.
    pub fn with_default_headers(domain: &str, selector: &str) -> Result<Self, ParamsError> {
        Self::new(domain, selector, DEFAULT_SIGNED_HEADERS)
    }

    /// Returns these parameters with the given agent or user identifier
    /// (*i=*).
    ///
    /// The identifier has the form `[local-part]@domain`, where the domain
    /// must be the signing domain or one of its subdomains.
    pub fn with_identifier(mut self, identifier: &str) -> Result<Self, ParamsError> {
        let invalid = || ParamsError::InvalidIdentifier(identifier.into());

        let (_, domain) = identifier.rsplit_once('@').ok_or_else(invalid)?;

        if identifier.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid());
        }

        if !is_same_or_subdomain(domain, &self.domain) {
            return Err(invalid());
        }

        self.identifier = Some(identifier.into());
        Ok(self)
    }

    pub fn version(&self) -> u8 {
        1
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The lowercase names of the headers to sign.
    pub fn headers_to_sign(&self) -> &[FieldName] {
        &self.headers_to_sign
    }

    /// The value of the *h=* tag: the header names joined with colons.
    pub fn headers_to_sign_value(&self) -> String {
        self.headers_to_sign
            .iter()
            .map(|name| name.as_ref())
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn canonicalization(&self) -> Canonicalization {
        Canonicalization::default()
    }
}

fn validate_domain(domain: &str) -> Result<(), ParamsError> {
    if domain.is_empty() {
        return Err(ParamsError::EmptyDomain);
    }
    if !is_plain_tag_value(domain) {
        return Err(ParamsError::InvalidDomain(domain.into()));
    }
    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ParamsError> {
    if selector.is_empty() {
        return Err(ParamsError::EmptySelector);
    }
    if !is_plain_tag_value(selector) {
        return Err(ParamsError::InvalidSelector(selector.into()));
    }
    Ok(())
}

// a tag value without whitespace, so that it is reproduced exactly
fn is_plain_tag_value(s: &str) -> bool {
    tag_list::is_tag_value(s) && !s.contains(char::is_whitespace)
}

fn is_same_or_subdomain(domain: &str, parent: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    let parent = parent.to_ascii_lowercase();
    let domain = domain.trim_end_matches('.');
    let parent = parent.trim_end_matches('.');

    domain == parent
        || domain
            .strip_suffix(parent)
            .and_then(|s| s.strip_suffix('.'))
            .map_or(false, |labels| !labels.is_empty() && !labels.ends_with('.'))
}
