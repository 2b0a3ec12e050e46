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

//! Quoted-Printable encodings.
//!
//! DKIM-Quoted-Printable (RFC 6376, section 2.11) is used for the *i=* tag.
//! The RFC 2047 *Q* encoding is used for encoded-words in unstructured header
//! fields such as *Subject*.

use crate::tag_list::{is_wsp, strip_fws, strip_suffix};
use std::fmt::Write;

// "=?UTF-8?Q?" + "?=" leaves 63 characters of an encoded-word's maximum 75
const MAX_ENCODED_TEXT_LEN: usize = 63;

/// Encodes a string as DKIM-Quoted-Printable.
pub fn encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for c in s.chars() {
        // All non-ASCII Unicode characters can be used as-is, some ASCII
        // characters need encoding.
        if is_dkim_safe_char(c) {
            result.push(c);
        } else {
            let mut buf = [0; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(result, "={b:02X}");
            }
        }
    }

    result
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, thiserror::Error)]
#[error("failed to decode Quoted-Printable data")]
pub struct QuotedPrintableError;

/// Decodes the bytes in a DKIM-Quoted-Printable-encoded string.
pub fn decode(mut s: &str) -> Result<Vec<u8>, QuotedPrintableError> {
    fn strip_dkim_safe_chars(input: &str) -> Option<&str> {
        input
            .strip_prefix(is_dkim_safe_char)
            .map(|s| s.trim_start_matches(is_dkim_safe_char))
    }

    enum State { Char, Fws }

    let mut state = State::Char;
    let mut result = Vec::with_capacity(s.len());

    loop {
        match state {
            State::Char => {
                if let Some(snext) = s.strip_prefix('=') {
                    let (snext, x) = strip_hex_octet(snext).ok_or(QuotedPrintableError)?;
                    result.push(x);
                    s = snext;
                } else if let Some(snext) = strip_dkim_safe_chars(s) {
                    result.extend(strip_suffix(s, snext).bytes());
                    s = snext;
                } else if let Some(snext) = strip_fws(s) {
                    s = snext;
                    state = State::Fws;
                } else {
                    break;
                }
            }
            State::Fws => {
                if let Some(snext) = s.strip_prefix('=') {
                    let (snext, x) = strip_hex_octet(snext).ok_or(QuotedPrintableError)?;
                    result.push(x);
                    s = snext;
                    state = State::Char;
                } else if let Some(snext) = strip_dkim_safe_chars(s) {
                    result.extend(strip_suffix(s, snext).bytes());
                    s = snext;
                    state = State::Char;
                } else if strip_fws(s).is_some() {
                    return Err(QuotedPrintableError);
                } else {
                    break;
                }
            }
        }
    }

    if s.is_empty() {
        Ok(result)
    } else {
        Err(QuotedPrintableError)
    }
}

fn strip_hex_octet(s: &str) -> Option<(&str, u8)> {
    fn strip_hexdig(s: &str) -> Option<(&str, u8)> {
        let s = strip_fws(s).unwrap_or(s);
        let snext = s.strip_prefix(is_hexdig)?;
        let b = s.as_bytes()[0];
        Some((snext, b))
    }

    let (s, digit1) = strip_hexdig(s)?;
    let (s, digit2) = strip_hexdig(s)?;

    let b = u8_from_digits(digit1, digit2);

    Some((s, b))
}

/// Returns whether an unstructured header field value must be transmitted
/// as encoded-words.
pub fn needs_encoded_words(s: &str) -> bool {
    !s.chars().all(|c| is_wsp(c) || c.is_ascii_graphic())
}

/// Encodes text as a sequence of RFC 2047 *Q*-encoded UTF-8 encoded-words,
/// separated by single spaces.
///
/// Characters are never split across encoded-words.
pub fn encode_words(text: &str) -> String {
    let mut words = vec![];
    let mut word = String::new();

    for c in text.chars() {
        let mut encoded = String::new();

        if c == ' ' {
            encoded.push('_');
        } else if c.is_ascii_alphanumeric() || matches!(c, '!' | '*' | '+' | '-' | '/') {
            encoded.push(c);
        } else {
            let mut buf = [0; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(encoded, "={b:02X}");
            }
        }

        if word.len() + encoded.len() > MAX_ENCODED_TEXT_LEN {
            words.push(format!("=?UTF-8?Q?{word}?="));
            word.clear();
        }
        word.push_str(&encoded);
    }

    if !word.is_empty() || words.is_empty() {
        words.push(format!("=?UTF-8?Q?{word}?="));
    }

    words.join(" ")
}

fn u8_from_digits(c1: u8, c2: u8) -> u8 {
    // Strictly speaking, only uppercase hex digits are allowed in (DKIM-)
    // Quoted-Printable, but there is no harm in accepting lowercase, too.
    fn to_u8(c: u8) -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'A'..=b'F' => c - b'A' + 0xa,
            b'a'..=b'f' => c - b'a' + 0xa,
            _ => unreachable!(),
        }
    }

    debug_assert!(c1.is_ascii_hexdigit() && c2.is_ascii_hexdigit());

    to_u8(c1) * 0x10 + to_u8(c2)
}

fn is_dkim_safe_char(c: char) -> bool {
    // printable ASCII without ; and = plus any non-ASCII UTF-8
    matches!(c, '!'..=':' | '<' | '>'..='~') || !c.is_ascii()
}

fn is_hexdig(c: char) -> bool {
    c.is_ascii_hexdigit()
}
