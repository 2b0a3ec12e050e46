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

//! Signer configuration.
//!
//! The configuration mirrors a `dkim` block of an application configuration
//! file. Reading that file is left to the application: any serde data format
//! may be used.
//!
//! ```json
//! {
//!   "private_key": "MIIEowIBAAKCAQEA...",
//!   "params": {
//!     "d": "example.com",
//!     "s": "202209",
//!     "h": "from:to:subject"
//!   }
//! }
//! ```

use crate::{
    crypto::{self, KeyError, SigningKey},
    signer::{ParamsError, Signer, SigningParams},
};

/// An error that occurs when building a signer from configuration.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration field {0:?}")]
    MissingRequiredField(&'static str),
    #[error("unsupported signature version {0}")]
    UnsupportedVersion(u8),
    #[error("algorithm {0:?} does not match the private key")]
    AlgorithmMismatch(String),
    #[error("invalid signing parameters")]
    Params(#[from] ParamsError),
    #[error("invalid private key")]
    Key(#[from] KeyError),
}

/// Configuration of a [`Signer`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignerConfig {
    /// The private key: the Base64 body of a PKCS#1 PEM document, or a
    /// complete PEM document.
    #[serde(default)]
    pub private_key: Option<String>,
    /// The signature tags.
    #[serde(default)]
    pub params: ParamsConfig,
}

/// Signature tags of a [`SignerConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsConfig {
    /// Version, must be 1 if given.
    #[serde(default)]
    pub v: Option<u8>,
    /// Signature algorithm, must match the private key if given.
    #[serde(default)]
    pub a: Option<String>,
    /// Signing domain.
    #[serde(default)]
    pub d: Option<String>,
    /// Selector.
    #[serde(default)]
    pub s: Option<String>,
    /// Headers to sign.
    #[serde(default)]
    pub h: Option<HeaderList>,
    /// Agent or user identifier.
    #[serde(default)]
    pub i: Option<String>,
}

/// A list of header names, either joined with colons or as a sequence.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum HeaderList {
    Joined(String),
    List(Vec<String>),
}

impl HeaderList {
    pub fn names(&self) -> Vec<&str> {
        let names: Vec<&str> = match self {
            Self::Joined(s) => s.split(':').collect(),
            Self::List(v) => v.iter().map(|s| s.as_str()).collect(),
        };
        names
            .into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

impl SignerConfig {
    /// Builds the signing parameters.
    pub fn signing_params(&self) -> Result<SigningParams, ConfigError> {
        let params = &self.params;

        if let Some(v) = params.v {
            if v != 1 {
                return Err(ConfigError::UnsupportedVersion(v));
            }
        }

        let d = required(params.d.as_deref(), "d")?;
        let s = required(params.s.as_deref(), "s")?;

        let headers = params.h.as_ref().map(HeaderList::names).unwrap_or_default();
        if headers.is_empty() {
            return Err(ConfigError::MissingRequiredField("h"));
        }

        let mut signing_params = SigningParams::new(d, s, headers)?;

        if let Some(i) = params.i.as_deref().filter(|i| !i.is_empty()) {
            signing_params = signing_params.with_identifier(i)?;
        }

        Ok(signing_params)
    }

    /// Builds a signer from this configuration.
    pub fn build(&self) -> Result<Signer<Box<dyn SigningKey>>, ConfigError> {
        let signing_params = self.signing_params()?;

        let private_key = required(self.private_key.as_deref(), "private_key")?;
        let key = crypto::read_signing_key(private_key)?;

        if let Some(a) = &self.params.a {
            if !a.eq_ignore_ascii_case(key.algorithm_name()) {
                return Err(ConfigError::AlgorithmMismatch(a.clone()));
            }
        }

        Ok(Signer::new(signing_params, key))
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingRequiredField(name))
}
