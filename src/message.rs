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

//! Email message model.
//!
//! A [`Message`] is an ordered list of header fields plus a body, which is
//! either plain text or a [`MimeMessage`]. Header values are stored in their
//! encoded wire form, which is the form that is canonicalized for signing.

use crate::{
    header::{self, FieldBody, FieldName, HeaderFieldError, HeaderFields, LINE_WIDTH},
    mime::MimeMessage,
    quoted_printable,
};
use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

const CRLF: &str = "\r\n";

/// A message body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Body {
    Text(String),
    Mime(MimeMessage),
}

impl Body {
    /// Resolves the body to text, rendering a multi-part body.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Mime(m) => Cow::Owned(m.generate_message()),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<MimeMessage> for Body {
    fn from(m: MimeMessage) -> Self {
        Self::Mime(m)
    }
}

/// An email message.
///
/// Cloning a message yields an independent copy of its headers and body.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    headers: HeaderFields,
    body: Body,
}

impl Message {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn headers(&self) -> &HeaderFields {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderFields {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Sets the body.
    ///
    /// A multi-part body also sets the *MIME-Version* and *Content-Type*
    /// headers.
    pub fn set_body(&mut self, body: impl Into<Body>) -> Result<(), HeaderFieldError> {
        let body = body.into();

        if let Body::Mime(mime) = &body {
            self.set_header("MIME-Version", "1.0")?;
            self.set_header("Content-Type", &mime.content_type())?;
        }

        self.body = body;

        Ok(())
    }

    /// Appends a header field. The value must be in encoded wire form.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), HeaderFieldError> {
        let name = FieldName::new(name)?;
        let value = FieldBody::new(value)?;
        self.headers.add(name, value);
        Ok(())
    }

    /// Replaces all header fields of the given name with a single one,
    /// keeping the position of the first one.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), HeaderFieldError> {
        let name = FieldName::new(name)?;
        let value = FieldBody::new(value)?;

        let mut fields: Vec<_> = std::mem::take(&mut self.headers).into();

        let mut value = Some(value);
        fields.retain_mut(|(n, v)| {
            if *n != name {
                return true;
            }
            match value.take() {
                Some(val) => {
                    *v = val;
                    true
                }
                None => false,
            }
        });

        if let Some(value) = value {
            fields.push((name, value));
        }

        self.headers.replace_all(fields);

        Ok(())
    }

    /// Sets the *From* header to the given mailbox.
    pub fn set_from(&mut self, address: &str, name: Option<&str>) -> Result<(), HeaderFieldError> {
        let mailbox = format_mailbox(address, name)?;
        self.set_header("From", &mailbox)
    }

    /// Adds a mailbox to the *To* header.
    pub fn add_to(&mut self, address: &str, name: Option<&str>) -> Result<(), HeaderFieldError> {
        self.add_address("To", address, name)
    }

    /// Adds a mailbox to the *Cc* header.
    pub fn add_cc(&mut self, address: &str, name: Option<&str>) -> Result<(), HeaderFieldError> {
        self.add_address("Cc", address, name)
    }

    fn add_address(
        &mut self,
        field: &str,
        address: &str,
        name: Option<&str>,
    ) -> Result<(), HeaderFieldError> {
        let mailbox = format_mailbox(address, name)?;

        let value = match self.headers.get(field) {
            Some(existing) => format!("{existing}, {mailbox}"),
            None => mailbox,
        };

        self.set_header(field, &value)
    }

    /// Sets the *Subject* header. Text that is not printable ASCII is encoded
    /// as encoded-words; long values are folded.
    pub fn set_subject(&mut self, subject: &str) -> Result<(), HeaderFieldError> {
        let value = if quoted_printable::needs_encoded_words(subject) {
            quoted_printable::encode_words(subject)
        } else {
            subject.into()
        };

        let value = header::fold_field_body("Subject", &value, LINE_WIDTH);

        self.set_header("Subject", &value)
    }
}

/// Formats a mailbox, encoding or quoting the display name as needed.
fn format_mailbox(address: &str, name: Option<&str>) -> Result<String, HeaderFieldError> {
    if address.is_empty() || !address.chars().all(|c| c.is_ascii_graphic()) {
        return Err(HeaderFieldError);
    }

    let mailbox = match name.filter(|n| !n.trim().is_empty()) {
        None => address.into(),
        Some(name) if quoted_printable::needs_encoded_words(name) => {
            format!("{} <{address}>", quoted_printable::encode_words(name))
        }
        Some(name) if is_phrase(name) => format!("{name} <{address}>"),
        Some(name) => {
            let name = name.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{name}\" <{address}>")
        }
    };

    Ok(mailbox)
}

// atext and spaces, RFC 5322, section 3.2.3
fn is_phrase(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || " !#$%&'*+-/=?^_`{|}~".contains(c))
}

impl Display for Message {
    /// Formats the message in wire form with CRLF line endings. Long
    /// single-line header values are folded.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            let value = header::fold_field_body(name.as_ref(), value.as_str(), LINE_WIDTH);
            if value.is_empty() {
                write!(f, "{name}:{CRLF}")?;
            } else {
                write!(f, "{name}: {value}{CRLF}")?;
            }
        }

        f.write_str(CRLF)?;

        f.write_str(&self.body.to_text())
    }
}

impl FromStr for Message {
    type Err = HeaderFieldError;

    /// Parses a message in wire form. The header block ends at the first
    /// empty line; lines may end in CRLF or LF.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (header_block, body) = split_header_block(s);

        let headers = header_block.parse()?;

        Ok(Self {
            headers,
            body: Body::Text(body.into()),
        })
    }
}

fn split_header_block(s: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in s.split_inclusive('\n') {
        offset += line.len();
        if line == "\r\n" || line == "\n" {
            return (&s[..offset - line.len()], &s[offset..]);
        }
    }

    (s, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::MimePart;

    #[test]
    fn setters() {
        let mut message = Message::new();

        message.set_from("from@example.com", None).unwrap();
        message.add_to("to@example.com", Some("Ms To")).unwrap();
        message.add_to("other@example.com", Some("Doe, Jane")).unwrap();
        message.add_cc("cc@example.com", Some("Zoë")).unwrap();
        message.set_subject("Subject Subject").unwrap();
        message.set_from("real@example.com", None).unwrap();

        let fields: Vec<_> = message
            .headers()
            .iter()
            .map(|(n, v)| (n.as_ref(), v.as_str()))
            .collect();

        assert_eq!(
            fields,
            [
                ("From", "real@example.com"),
                ("To", "Ms To <to@example.com>, \"Doe, Jane\" <other@example.com>"),
                ("Cc", "=?UTF-8?Q?Zo=C3=AB?= <cc@example.com>"),
                ("Subject", "Subject Subject"),
            ]
        );

        assert!(message.set_from("a b@example.com", None).is_err());
    }

    #[test]
    fn set_subject_folds_long_value() {
        let mut message = Message::new();
        let subject = "word ".repeat(30);

        message.set_subject(subject.trim_end()).unwrap();

        let value = message.headers().get("Subject").unwrap();
        assert!(value.is_folded());
        assert!(format!("Subject: {value}").split(CRLF).all(|l| l.len() <= LINE_WIDTH));
    }

    #[test]
    fn set_mime_body_adds_headers() {
        let mut mime = MimeMessage::with_boundary("xyz");
        mime.add_part(MimePart::text("hi"));

        let mut message = Message::new();
        message.set_body(mime).unwrap();

        assert_eq!(message.headers().get("MIME-Version").unwrap().as_str(), "1.0");
        assert_eq!(
            message.headers().get("Content-Type").unwrap().as_str(),
            "multipart/mixed; boundary=\"xyz\""
        );
        assert!(message.body().to_text().starts_with("--xyz\r\n"));
    }

    #[test]
    fn parse_and_display() {
        let s = "From: me@example.com\nSubject: a\n b\n\nline 1\nline 2\n";

        let message: Message = s.parse().unwrap();

        assert_eq!(message.headers().len(), 2);
        assert_eq!(message.headers().get("subject").unwrap().as_str(), "a\r\n b");
        assert_eq!(message.body(), &Body::Text("line 1\nline 2\n".into()));
        assert_eq!(
            message.to_string(),
            "From: me@example.com\r\nSubject: a\r\n b\r\n\r\nline 1\nline 2\n"
        );
    }

    #[test]
    fn parse_without_body() {
        let message: Message = "From: me@example.com\r\n".parse().unwrap();

        assert_eq!(message.headers().len(), 1);
        assert_eq!(message.body(), &Body::Text(String::new()));

        let message: Message = "\r\nbody only".parse().unwrap();

        assert!(message.headers().is_empty());
        assert_eq!(message.body().to_text(), "body only");
    }

    #[test]
    fn clone_is_independent() {
        let mut message = Message::new();
        message.set_subject("original").unwrap();

        let mut copy = message.clone();
        copy.set_subject("changed").unwrap();
        copy.headers_mut().clear();

        assert_eq!(message.headers().get("Subject").unwrap().as_str(), "original");
    }
}
