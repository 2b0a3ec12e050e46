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

use base64ct::{Base64, Encoding};

/// A trait for entities that can be represented as a canonical string.
pub trait CanonicalStr {
    /// Returns the canonical representation as a static string slice.
    fn canonical_str(&self) -> &'static str;
}

/// An error that occurs when decoding Base64 data.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, thiserror::Error)]
#[error("failed to decode Base64 data")]
pub struct Base64Error;

/// Encodes binary data as a Base64 string.
pub fn encode_base64<T: AsRef<[u8]>>(input: T) -> String {
    Base64::encode_string(input.as_ref())
}

/// Decodes a Base64 string, ignoring any interspersed whitespace.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, Base64Error> {
    let s: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
        .collect();
    Base64::decode_vec(&s).map_err(|_| Base64Error)
}

/// Splits an ASCII string into chunks of `width` characters separated by a
/// single space.
pub(crate) fn chunk_with_spaces(s: &str, width: usize) -> String {
    debug_assert!(s.is_ascii());
    debug_assert!(width > 0);

    let mut result = String::with_capacity(s.len() + s.len() / width);

    for (i, chunk) in s.as_bytes().chunks(width).enumerate() {
        if i > 0 {
            result.push(' ');
        }
        // ASCII input, chunk boundaries are char boundaries
        result.extend(chunk.iter().map(|&b| char::from(b)));
    }

    result
}
