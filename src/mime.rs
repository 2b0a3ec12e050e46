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

//! Multi-part MIME bodies.

use crate::util;
use rand::{distributions::Alphanumeric, Rng};
use std::fmt::{self, Display, Formatter, Write};

const CRLF: &str = "\r\n";

// RFC 2045 limits encoded lines to 76 characters
const BASE64_LINE_WIDTH: usize = 76;

const BOUNDARY_TOKEN_LEN: usize = 32;

/// A content transfer encoding.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TransferEncoding {
    #[default]
    SevenBit,
    EightBit,
    Base64,
}

impl Display for TransferEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Base64 => "base64",
        })
    }
}

/// A part of a multi-part body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MimePart {
    content: Vec<u8>,
    content_type: String,
    charset: Option<String>,
    encoding: TransferEncoding,
    filename: Option<String>,
}

impl MimePart {
    pub fn new(content: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            charset: None,
            encoding: TransferEncoding::Base64,
            filename: None,
        }
    }

    /// Creates a *text/plain* part. Non-ASCII text is sent as 8bit.
    pub fn text(text: &str) -> Self {
        Self::text_with_type(text, "text/plain")
    }

    /// Creates a *text/html* part. Non-ASCII text is sent as 8bit.
    pub fn html(text: &str) -> Self {
        Self::text_with_type(text, "text/html")
    }

    fn text_with_type(text: &str, content_type: &str) -> Self {
        let encoding = if text.is_ascii() {
            TransferEncoding::SevenBit
        } else {
            TransferEncoding::EightBit
        };

        Self {
            content: text.into(),
            content_type: content_type.into(),
            charset: Some("utf-8".into()),
            encoding,
            filename: None,
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_encoding(mut self, encoding: TransferEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Marks the part as an attachment with the given file name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn encoding(&self) -> TransferEncoding {
        self.encoding
    }

    fn write_to(&self, out: &mut String) {
        out.push_str("Content-Type: ");
        out.push_str(&self.content_type);
        if let Some(charset) = &self.charset {
            let _ = write!(out, "; charset={charset}");
        }
        out.push_str(CRLF);

        let encoding = self.effective_encoding();

        let _ = write!(out, "Content-Transfer-Encoding: {encoding}{CRLF}");

        if let Some(filename) = &self.filename {
            let filename = filename.replace(['\\', '"'], "");
            let _ = write!(out, "Content-Disposition: attachment; filename=\"{filename}\"{CRLF}");
        }

        out.push_str(CRLF);

        match std::str::from_utf8(&self.content) {
            Ok(text) if encoding != TransferEncoding::Base64 => out.push_str(text),
            _ => {
                let encoded = util::encode_base64(&self.content);
                let lines = util::chunk_with_spaces(&encoded, BASE64_LINE_WIDTH);
                out.push_str(&lines.replace(' ', CRLF));
            }
        }
    }

    /// The encoding used on the wire: content that is not valid UTF-8 text
    /// is always sent as Base64.
    pub fn effective_encoding(&self) -> TransferEncoding {
        match self.encoding {
            TransferEncoding::SevenBit | TransferEncoding::EightBit
                if std::str::from_utf8(&self.content).is_err() =>
            {
                TransferEncoding::Base64
            }
            encoding => encoding,
        }
    }
}

/// A *multipart/mixed* body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MimeMessage {
    boundary: String,
    parts: Vec<MimePart>,
}

impl MimeMessage {
    /// Creates an empty multi-part body with a freshly generated boundary.
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: vec![],
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[MimePart] {
        &self.parts
    }

    pub fn add_part(&mut self, part: MimePart) {
        self.parts.push(part);
    }

    /// The value of the *Content-Type* header of a message with this body.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary=\"{}\"", self.boundary)
    }

    /// Renders the body in its wire form.
    pub fn generate_message(&self) -> String {
        let mut out = String::new();

        for part in &self.parts {
            let _ = write!(out, "--{}{CRLF}", self.boundary);
            part.write_to(&mut out);
            out.push_str(CRLF);
        }

        let _ = write!(out, "--{}--{CRLF}", self.boundary);

        out
    }
}

impl Default for MimeMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<MimePart> for MimeMessage {
    fn from_iter<T: IntoIterator<Item = MimePart>>(iter: T) -> Self {
        let mut message = Self::new();
        message.parts.extend(iter);
        message
    }
}

fn generate_boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(BOUNDARY_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("=_{token}")
}
