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

//! A library for signing email messages with *DomainKeys Identified Mail*
//! (DKIM) signatures as described in [RFC 6376].
//!
//! Signing canonicalizes the message body and a selection of headers, hashes
//! the body into the *bh=* tag, and signs the canonicalized headers together
//! with a *DKIM-Signature* header whose *b=* tag is still empty. The
//! completed *DKIM-Signature* header becomes the first header of the signed
//! message.
//!
//! Headers are canonicalized with the *relaxed* algorithm. The body is
//! normalized to CRLF line endings with surrounding whitespace and blank lines
//! trimmed, which is its own *simple* canonical form; signatures therefore
//! carry `c=relaxed/simple`.
//!
//! # Usage
//!
//! A [`Signer`] combines validated [`SigningParams`] with a [`SigningKey`].
//! It is created once and then signs any number of [`Message`]s.
//!
//! ```
//! use dkim_signer::{Message, RsaSha256Key, Signer, SigningParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let pem = std::fs::read_to_string("tests/keys/rsa2048.pem")?;
//! let params = SigningParams::new("example.com", "202209", ["from", "to", "subject"])?;
//! let key = RsaSha256Key::from_pem(&pem)?;
//! let signer = Signer::new(params, key);
//!
//! let mut message = Message::new();
//! message.set_from("from@example.com", None)?;
//! message.add_to("to@example.com", None)?;
//! message.set_subject("Subject")?;
//! message.set_body("Hello world!\n")?;
//!
//! let signed = signer.sign_message(&message)?;
//!
//! assert!(signed.to_string().starts_with("DKIM-Signature: v=1; a=rsa-sha256; "));
//! # Ok(())
//! # }
//! ```
//!
//! Signers can also be built from a serde-deserializable [`SignerConfig`].
//!
//! [RFC 6376]: https://www.rfc-editor.org/rfc/rfc6376

pub mod canonicalize;
pub mod config;
pub mod crypto;
pub mod header;
pub mod message;
pub mod mime;
pub mod quoted_printable;
pub mod signature;
pub mod signer;
mod tag_list;
mod util;

pub use crate::{
    config::{ConfigError, SignerConfig},
    crypto::{Ed25519Sha256Key, KeyError, RsaSha256Key, SigningError, SigningKey},
    header::{FieldBody, FieldName, HeaderField, HeaderFields},
    message::{Body, Message},
    mime::{MimeMessage, MimePart},
    signature::{DkimHeaderValue, SignatureAlgorithm, DKIM_SIGNATURE_NAME},
    signer::{ParamsError, Signer, SignerError, SigningParams},
    util::{decode_base64, encode_base64, Base64Error, CanonicalStr},
};
