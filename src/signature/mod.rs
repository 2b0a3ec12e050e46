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

//! The DKIM-Signature header value and related types.

mod format;

use crate::{
    crypto::HashAlgorithm,
    header::{FieldName, HeaderFieldError},
    quoted_printable,
    signer::SigningParams,
    tag_list::{self, TagList, TagListParseError},
    util::{self, Base64Error, CanonicalStr},
};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

pub const DKIM_SIGNATURE_NAME: &str = "DKIM-Signature";

/// A signature algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignatureAlgorithm {
    /// The *rsa-sha256* signature algorithm.
    RsaSha256,
    /// The *ed25519-sha256* signature algorithm.
    Ed25519Sha256,
}

impl SignatureAlgorithm {
    /// Returns this signature algorithm’s hash algorithm.
    pub fn to_hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha256 | Self::Ed25519Sha256 => HashAlgorithm::Sha256,
        }
    }
}

impl CanonicalStr for SignatureAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::RsaSha256 => "rsa-sha256",
            Self::Ed25519Sha256 => "ed25519-sha256",
        }
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rsa-sha256") {
            Ok(Self::RsaSha256)
        } else if s.eq_ignore_ascii_case("ed25519-sha256") {
            Ok(Self::Ed25519Sha256)
        } else {
            Err("unknown signature algorithm")
        }
    }
}

/// A canonicalization algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CanonicalizationAlgorithm {
    /// The *simple* canonicalization algorithm.
    Simple,
    /// The *relaxed* canonicalization algorithm.
    Relaxed,
}

impl CanonicalStr for CanonicalizationAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Relaxed => "relaxed",
        }
    }
}

impl Display for CanonicalizationAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for CanonicalizationAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("simple") {
            Ok(Self::Simple)
        } else if s.eq_ignore_ascii_case("relaxed") {
            Ok(Self::Relaxed)
        } else {
            Err("unknown canonicalization algorithm")
        }
    }
}

/// A pair of header/body canonicalization algorithms.
///
/// Signatures produced by this crate always use *relaxed/simple*, the
/// default.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Canonicalization {
    /// The header canonicalization.
    pub header: CanonicalizationAlgorithm,
    /// The body canonicalization.
    pub body: CanonicalizationAlgorithm,
}

impl Default for Canonicalization {
    fn default() -> Self {
        Self {
            header: CanonicalizationAlgorithm::Relaxed,
            body: CanonicalizationAlgorithm::Simple,
        }
    }
}

impl CanonicalStr for Canonicalization {
    fn canonical_str(&self) -> &'static str {
        use CanonicalizationAlgorithm::*;

        match (self.header, self.body) {
            (Simple, Simple) => "simple/simple",
            (Simple, Relaxed) => "simple/relaxed",
            (Relaxed, Simple) => "relaxed/simple",
            (Relaxed, Relaxed) => "relaxed/relaxed",
        }
    }
}

impl Display for Canonicalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl fmt::Debug for Canonicalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", &self.header, &self.body)
    }
}

impl FromStr for Canonicalization {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if let Some((header, body)) = s.split_once('/') {
            Self {
                header: CanonicalizationAlgorithm::from_str(header)?,
                body: CanonicalizationAlgorithm::from_str(body)?,
            }
        } else {
            Self {
                header: CanonicalizationAlgorithm::from_str(s)?,
                body: CanonicalizationAlgorithm::Simple,
            }
        })
    }
}

/// An error that occurs when parsing a DKIM-Signature header value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DkimHeaderValueError {
    #[error("invalid tag list")]
    InvalidTagList(#[from] TagListParseError),
    #[error("missing required tag {0}=")]
    MissingTag(&'static str),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("unsupported signature algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid tag value")]
    ValueSyntax,
}

/// The value of a *DKIM-Signature* header field: an ordered list of tags.
///
/// A value is built twice while signing a message: first with an empty *b=*
/// tag, which is the form that is canonicalized and signed, then again with
/// the signature filled in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DkimHeaderValue {
    tags: Vec<(Box<str>, String)>,
}

const REQUIRED_TAGS: [&str; 7] = ["v", "a", "bh", "d", "h", "s", "b"];

impl DkimHeaderValue {
    /// Builds the header value with an empty *b=* tag. The tags appear in the
    /// order `v, a, bh, c, d, [i], h, s, b`.
    pub fn unsigned(
        params: &SigningParams,
        algorithm: SignatureAlgorithm,
        body_hash: &str,
    ) -> Self {
        let mut tags: Vec<(Box<str>, String)> = Vec::with_capacity(9);

        tags.push(("v".into(), params.version().to_string()));
        tags.push(("a".into(), algorithm.canonical_str().into()));
        tags.push(("bh".into(), body_hash.into()));
        tags.push(("c".into(), params.canonicalization().canonical_str().into()));
        tags.push(("d".into(), params.domain().into()));
        if let Some(id) = params.identifier() {
            tags.push(("i".into(), quoted_printable::encode(id)));
        }
        tags.push(("h".into(), params.headers_to_sign_value()));
        tags.push(("s".into(), params.selector().into()));
        tags.push(("b".into(), String::new()));

        Self { tags }
    }

    /// Returns this value with the *b=* tag set to the given formatted
    /// signature.
    pub fn with_signature(mut self, signature: &str) -> Self {
        match self.tags.iter_mut().find(|(name, _)| name.as_ref() == "b") {
            Some((_, value)) => *value = signature.into(),
            None => self.tags.push(("b".into(), signature.into())),
        }
        self
    }

    /// Returns this value with an empty *b=* tag.
    pub fn without_signature(self) -> Self {
        self.with_signature("")
    }

    /// Returns the value of the given tag.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns all tags in order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(name, value)| (name.as_ref(), value.as_str()))
    }

    pub fn algorithm(&self) -> Option<SignatureAlgorithm> {
        self.get("a")?.parse().ok()
    }

    pub fn domain(&self) -> Option<&str> {
        self.get("d")
    }

    pub fn selector(&self) -> Option<&str> {
        self.get("s")
    }

    /// Returns the header names of the *h=* tag.
    pub fn signed_headers(&self) -> Result<Vec<FieldName>, HeaderFieldError> {
        let value = self.get("h").unwrap_or_default();
        tag_list::parse_colon_separated_value(value)
            .into_iter()
            .map(FieldName::new)
            .collect()
    }

    /// Returns the decoded body hash of the *bh=* tag.
    pub fn body_hash(&self) -> Result<Vec<u8>, Base64Error> {
        util::decode_base64(self.get("bh").unwrap_or_default())
    }

    /// Returns the decoded signature of the *b=* tag.
    pub fn signature_data(&self) -> Result<Vec<u8>, Base64Error> {
        util::decode_base64(self.get("b").unwrap_or_default())
    }

    /// Returns the decoded agent or user identifier of the *i=* tag.
    pub fn identifier(&self) -> Option<String> {
        let value = self.get("i")?;
        let bytes = quoted_printable::decode(value).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Formats the value for transport, folded to lines of at most 78
    /// characters where possible.
    pub fn to_folded(&self) -> String {
        format::fold_header_value(self)
    }
}

impl Display for DkimHeaderValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        format::format_tags(f, self.tags())
    }
}

impl FromStr for DkimHeaderValue {
    type Err = DkimHeaderValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag_list = TagList::parse(s)?;

        let tags: Vec<(Box<str>, String)> = tag_list
            .as_ref()
            .iter()
            .map(|spec| {
                let value = match spec.name {
                    "b" | "bh" => tag_list::strip_fws_from_tag_value(spec.value),
                    _ => spec.value.into(),
                };
                (spec.name.into(), value)
            })
            .collect();

        let value = Self { tags };

        for name in REQUIRED_TAGS {
            if value.get(name).is_none() {
                return Err(DkimHeaderValueError::MissingTag(name));
            }
        }

        if value.get("v") != Some("1") {
            return Err(DkimHeaderValueError::UnsupportedVersion);
        }
        if value.algorithm().is_none() {
            return Err(DkimHeaderValueError::UnsupportedAlgorithm);
        }
        if value.signed_headers().is_err() {
            return Err(DkimHeaderValueError::ValueSyntax);
        }

        Ok(value)
    }
}
