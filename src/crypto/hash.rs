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

use crate::util::CanonicalStr;
use digest::Digest;
use sha2::Sha256;

/// A hash algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HashAlgorithm {
    Sha256,
}

impl CanonicalStr for HashAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

/// Computes the digest of `data` using the given hash algorithm.
pub fn data_hash_digest(hash_alg: HashAlgorithm, data: &[u8]) -> Box<[u8]> {
    match hash_alg {
        HashAlgorithm::Sha256 => digest_with::<Sha256>(data),
    }
}

fn digest_with<D: Digest>(data: &[u8]) -> Box<[u8]> {
    let mut hasher = D::new();
    hasher.update(data);
    hasher.finalize().to_vec().into()
}
