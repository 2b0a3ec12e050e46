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

//! Canonicalization utilities.
//!
//! Headers are canonicalized with the *relaxed* algorithm of RFC 6376,
//! section 3.4.2. The body canonicalization normalizes line breaks to CRLF
//! and trims surrounding whitespace and blank lines, producing a body that is
//! its own *simple* canonical form (section 3.4.3).

use crate::{
    header::{FieldName, HeaderFields},
    signature::DKIM_SIGNATURE_NAME,
};

const CRLF: &str = "\r\n";

// stripped from both ends of a body after line break normalization
const BODY_TRIM_CHARS: [char; 5] = [' ', '\t', '\r', '\n', '\0'];

/// Canonicalizes a header field with the *relaxed* algorithm, returning
/// `name:value` without a line terminator.
///
/// The value must be given in its encoded wire form; folded values are
/// unfolded.
pub fn canonicalize_header(name: &str, value: &str) -> String {
    let mut result = String::with_capacity(name.len() + value.len() + 1);

    result.push_str(&name.to_ascii_lowercase());
    result.push(':');
    canonicalize_header_value(&mut result, value);

    result
}

fn canonicalize_header_value(result: &mut String, value: &str) {
    fn is_space(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\r' | '\n' | '\u{b}' | '\u{c}')
    }

    let value = value.trim_matches(is_space);

    // unfolding is subsumed: CRLF plus the following WSP is one run
    let mut compressing = false;
    for c in value.chars() {
        if is_space(c) {
            if !compressing {
                result.push(' ');
                compressing = true;
            }
        } else {
            result.push(c);
            compressing = false;
        }
    }
}

/// Produces the canonicalized header block that is input to the signature.
///
/// For each name in `signed_headers`, followed by *DKIM-Signature* unless
/// already included, the first header field of that name is canonicalized
/// and terminated with CRLF. Names without a matching header field are
/// skipped. The final CRLF is removed from the result.
pub fn canonicalize_headers(headers: &HeaderFields, signed_headers: &[FieldName]) -> String {
    let dkim_signature_included = signed_headers.iter().any(|name| *name == DKIM_SIGNATURE_NAME);

    let names = signed_headers
        .iter()
        .map(|name| name.as_ref())
        .chain((!dkim_signature_included).then_some(DKIM_SIGNATURE_NAME));

    let mut result = String::new();

    for name in names {
        if let Some(value) = headers.get(name) {
            result.push_str(&canonicalize_header(name, value.as_str()));
            result.push_str(CRLF);
        }
    }

    let len = result.trim_end_matches(['\r', '\n']).len();
    result.truncate(len);

    result
}

/// Canonicalizes a message body.
///
/// All line breaks (CRLF, CR, LF, VT, FF, and the Unicode line and paragraph
/// separators) become CRLF. Leading and trailing whitespace is then removed
/// from the body as a whole, which drops blank lines at either end, and the
/// result ends with exactly one CRLF. The empty body becomes a single CRLF.
pub fn canonicalize_body(body: &str) -> String {
    let mut result = String::with_capacity(body.len() + 2);

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                result.push_str(CRLF);
            }
            '\n' | '\u{b}' | '\u{c}' | '\u{85}' | '\u{2028}' | '\u{2029}' => {
                result.push_str(CRLF);
            }
            c => result.push(c),
        }
    }

    let len = result.trim_end_matches(BODY_TRIM_CHARS).len();
    result.truncate(len);
    let start = result.len() - result.trim_start_matches(BODY_TRIM_CHARS).len();
    result.drain(..start);
    result.push_str(CRLF);

    result
}
