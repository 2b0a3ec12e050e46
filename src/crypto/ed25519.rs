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
    crypto::{data_hash_digest, format_signature, HashAlgorithm, KeyError, SigningError, SigningKey},
    signature::SignatureAlgorithm,
};
use ed25519_dalek::{Signer, SigningKey as Ed25519SigningKey};
use std::fmt::{self, Debug, Formatter};

/// An Ed25519 private key producing *ed25519-sha256* signatures (RFC 8463).
#[derive(Clone)]
pub struct Ed25519Sha256Key {
    signing_key: Ed25519SigningKey,
}

impl Ed25519Sha256Key {
    /// Creates a key from a PKCS#8 PEM document.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeyError> {
        match super::read_signing_key_pem(pem)? {
            super::PrivateKey::Ed25519(signing_key) => Ok(Self::from_signing_key(signing_key)),
            super::PrivateKey::Rsa(_) => Err(KeyError::UnsupportedKeyType),
        }
    }

    pub fn from_signing_key(signing_key: Ed25519SigningKey) -> Self {
        Self { signing_key }
    }
}

impl Debug for Ed25519Sha256Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Sha256Key").finish_non_exhaustive()
    }
}

impl SigningKey for Ed25519Sha256Key {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519Sha256
    }

    fn sign(&self, payload: &[u8]) -> Result<String, SigningError> {
        let signature_data = sign_ed25519(&self.signing_key, payload)?;
        Ok(format_signature(&signature_data))
    }
}

/// Signs the SHA-256 digest of `msg`; in *ed25519-sha256* the hash is the
/// input to PureEdDSA.
pub fn sign_ed25519(signing_key: &Ed25519SigningKey, msg: &[u8]) -> Result<Vec<u8>, SigningError> {
    let digest = data_hash_digest(HashAlgorithm::Sha256, msg);
    let signature = signing_key
        .try_sign(&digest)
        .map_err(|_| SigningError::SigningFailure)?;
    Ok(signature.to_bytes().to_vec())
}
