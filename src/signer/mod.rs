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

//! Signer and supporting types.

mod params;

pub use params::{ParamsError, SigningParams, DEFAULT_SIGNED_HEADERS};

use crate::{
    canonicalize,
    crypto::{self, SigningError, SigningKey},
    header::{FieldBody, FieldName, HeaderFieldError},
    message::{Body, Message},
    signature::{DkimHeaderValue, DKIM_SIGNATURE_NAME},
    util,
};
use tracing::{debug, trace, warn};

/// An error that occurs when signing a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SignerError {
    #[error("failed to sign message")]
    Signing(#[from] SigningError),
    #[error("failed to create DKIM-Signature header")]
    InvalidHeader(#[from] HeaderFieldError),
}

/// A signer for email messages.
///
/// The signer holds immutable parameters and a key, and may be used to sign
/// any number of messages, also from several threads at once.
#[derive(Clone, Debug)]
pub struct Signer<K> {
    params: SigningParams,
    key: K,
}

impl<K: SigningKey> Signer<K> {
    pub fn new(params: SigningParams, key: K) -> Self {
        Self { params, key }
    }

    pub fn params(&self) -> &SigningParams {
        &self.params
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Signs a message.
    ///
    /// Returns a signed copy of the message: its body is the canonicalized
    /// body, and the *DKIM-Signature* header is the first header, followed
    /// by the original headers in order. The given message is not modified.
    ///
    /// A *DKIM-Signature* header already present in the message is replaced.
    pub fn sign_message(&self, message: &Message) -> Result<Message, SignerError> {
        let params = &self.params;
        let algorithm = self.key.algorithm();

        debug!(
            domain = params.domain(),
            selector = params.selector(),
            %algorithm,
            "signing message"
        );

        let mut signed = message.clone();

        let body = canonicalize::canonicalize_body(&signed.body().to_text());

        let hash_alg = algorithm.to_hash_algorithm();
        let body_hash = util::encode_base64(crypto::data_hash_digest(hash_alg, body.as_bytes()));

        trace!(%body_hash, body_len = body.len(), "computed body hash");

        // a text body leaves the headers alone
        signed.set_body(Body::Text(body))?;

        if !signed.headers().contains("From") {
            warn!("message has no From header");
        }

        let removed = signed.headers_mut().remove(DKIM_SIGNATURE_NAME);
        if removed > 0 {
            warn!(removed, "replacing existing DKIM-Signature header");
        }

        let unsigned = DkimHeaderValue::unsigned(params, algorithm, &body_hash);

        let name = FieldName::new(DKIM_SIGNATURE_NAME)?;
        signed.headers_mut().add(name.clone(), FieldBody::new(unsigned.to_string())?);

        let canonical_headers =
            canonicalize::canonicalize_headers(signed.headers(), params.headers_to_sign());

        trace!(len = canonical_headers.len(), "canonicalized header block");

        let signature = self.key.sign(canonical_headers.as_bytes())?;

        signed.headers_mut().remove(DKIM_SIGNATURE_NAME);

        let value = unsigned.with_signature(&signature);
        signed.headers_mut().prepend(name, FieldBody::new(value.to_string())?);

        debug!(domain = params.domain(), "message signed");

        Ok(signed)
    }
}
