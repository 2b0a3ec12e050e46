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

//! Representation of email header data.

use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

/// The maximum line width used when folding header fields.
pub const LINE_WIDTH: usize = 78;

pub type HeaderField = (FieldName, FieldBody);

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid header field")]
pub struct HeaderFieldError;

/// An ordered collection of header fields.
///
/// Lookup by name is case-insensitive. Insertion order is preserved.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HeaderFields(Vec<HeaderField>);

impl HeaderFields {
    pub fn new() -> Self {
        Self(vec![])
    }

    pub fn from_vec(value: Vec<(String, String)>) -> Result<Self, HeaderFieldError> {
        value
            .into_iter()
            .map(|(name, value)| {
                let name = FieldName::new(name)?;
                let body = FieldBody::new(value)?;
                Ok::<_, HeaderFieldError>((name, body))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HeaderField> {
        self.0.iter()
    }

    /// Returns the value of the first header field with the given name.
    pub fn get(&self, name: &str) -> Option<&FieldBody> {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, body)| body)
    }

    /// Returns the values of all header fields with the given name, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldBody> + 'a {
        self.0
            .iter()
            .filter(move |(n, _)| *n == name)
            .map(|(_, body)| body)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends a header field.
    pub fn add(&mut self, name: FieldName, body: FieldBody) {
        self.0.push((name, body));
    }

    /// Inserts a header field before all others.
    pub fn prepend(&mut self, name: FieldName, body: FieldBody) {
        self.0.insert(0, (name, body));
    }

    /// Removes all header fields with the given name, returns how many were
    /// removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let len = self.0.len();
        self.0.retain(|(n, _)| *n != name);
        len - self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Replaces the contents of this collection.
    pub fn replace_all<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = HeaderField>,
    {
        self.0.clear();
        self.0.extend(fields);
    }
}

impl AsRef<[HeaderField]> for HeaderFields {
    fn as_ref(&self) -> &[HeaderField] {
        &self.0
    }
}

impl From<HeaderFields> for Vec<HeaderField> {
    fn from(headers: HeaderFields) -> Self {
        headers.0
    }
}

impl FromIterator<HeaderField> for HeaderFields {
    fn from_iter<T: IntoIterator<Item = HeaderField>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a HeaderFields {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for HeaderFields {
    type Item = HeaderField;
    type IntoIter = std::vec::IntoIter<HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromStr for HeaderFields {
    type Err = HeaderFieldError;

    /// Parses a header block. Lines may end in CRLF or LF, continuation
    /// lines are joined with CRLF.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields: Vec<(FieldName, String)> = vec![];

        for line in s.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);

            if line.starts_with([' ', '\t']) {
                let (_, value) = fields.last_mut().ok_or(HeaderFieldError)?;
                value.push_str("\r\n");
                value.push_str(line);
            } else if line.is_empty() {
                continue;
            } else {
                let (name, value) = line.split_once(':').ok_or(HeaderFieldError)?;
                let name = FieldName::new(name)?;
                fields.push((name, value.trim_start_matches([' ', '\t']).into()));
            }
        }

        fields
            .into_iter()
            .map(|(name, value)| Ok::<_, HeaderFieldError>((name, FieldBody::new(value)?)))
            .collect()
    }
}

/// A header field name.
///
/// Comparisons ignore ASCII case.
#[derive(Clone, Eq)]
pub struct FieldName(Box<str>);

impl FieldName {
    pub fn new(value: impl Into<Box<str>>) -> Result<Self, HeaderFieldError> {
        let value = value.into();
        if value.is_empty() {
            return Err(HeaderFieldError);
        }
        if !value.chars().all(|c| c.is_ascii_graphic() && c != ':') {
            return Err(HeaderFieldError);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Debug for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for FieldName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl PartialEq<&str> for FieldName {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<str> for FieldName {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for FieldName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

/// A header field value in its encoded wire form, without the leading space
/// after the colon. Folded values keep their CRLF line breaks.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct FieldBody(Box<str>);

impl FieldBody {
    pub fn new(value: impl Into<Box<str>>) -> Result<Self, HeaderFieldError> {
        let value = value.into();
        // only folded continuation lines:
        if !value.split("\r\n").skip(1).all(|line| line.starts_with([' ', '\t'])) {
            return Err(HeaderFieldError);
        }
        // no empty or blank lines past the first one, no trailing CRLF:
        if !value.split("\r\n").skip(1).all(|line| !line.trim_matches([' ', '\t']).is_empty()) {
            return Err(HeaderFieldError);
        }
        // no stray CR and LF
        if !value.split("\r\n").all(|line| !line.contains(['\r', '\n'])) {
            return Err(HeaderFieldError);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_folded(&self) -> bool {
        self.0.contains("\r\n")
    }
}

impl AsRef<str> for FieldBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Debug for FieldBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldBody").field(&self.0).finish()
    }
}

impl Display for FieldBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Folds a single-line header field value at spaces so that no line of the
/// formatted field `name: value` is longer than `width` characters where
/// possible. Values that are already folded are returned unchanged.
pub fn fold_field_body(name: &str, value: &str, width: usize) -> String {
    if value.contains("\r\n") {
        return value.into();
    }

    let mut result = String::with_capacity(value.len() + value.len() / width * 3);

    // name + ':' + SP
    let mut i = name.chars().count() + 2;

    for (n, word) in value.split(' ').enumerate() {
        let len = word.chars().count();

        if n == 0 {
            result.push_str(word);
            i += len;
        } else if !word.is_empty() && i + 1 + len > width && !result.trim().is_empty() {
            // the space stays as indentation of the continuation line
            result.push_str("\r\n ");
            result.push_str(word);
            i = 1 + len;
        } else {
            result.push(' ');
            result.push_str(word);
            i += 1 + len;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_name_debug() {
        let name = FieldName::new("Subject").unwrap();

        assert_eq!(format!("{name:?}"), "\"Subject\"");
        assert_eq!(format!("{name}"), "Subject");
    }

    #[test]
    fn field_name_ok() {
        assert!(FieldName::new("abc").is_ok());

        assert!(FieldName::new("abc ").is_err());
        assert!(FieldName::new("a:c").is_err());
        assert!(FieldName::new("").is_err());
    }

    #[test]
    fn field_body_ok() {
        assert!(FieldBody::new("ab\r\n\tcd ").is_ok());
        assert!(FieldBody::new("\r\n\ta").is_ok());
        assert!(FieldBody::new("  ").is_ok());
        assert!(FieldBody::new("").is_ok());

        assert!(FieldBody::new(" \r\na").is_err());
        assert!(FieldBody::new(" \r\n \r\n a").is_err());
        assert!(FieldBody::new(" \na").is_err());
        assert!(FieldBody::new(" abc\r\n").is_err());
    }

    #[test]
    fn header_fields_lookup() {
        let mut headers = HeaderFields::from_vec(vec![
            ("From".into(), "me".into()),
            ("To".into(), "you (yes,\r\n\t you!)".into()),
            ("to".into(), "another".into()),
        ])
        .unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("TO").unwrap().as_str(), "you (yes,\r\n\t you!)");
        assert_eq!(headers.get_all("to").count(), 2);
        assert!(headers.get("Subject").is_none());

        assert_eq!(headers.remove("To"), 2);
        assert_eq!(headers.len(), 1);

        headers.prepend(FieldName::new("X-First").unwrap(), FieldBody::new("1").unwrap());
        assert_eq!(headers.as_ref()[0].0, "x-first");

        headers.clear();
        assert!(headers.is_empty());
    }

    #[test]
    fn header_fields_from_str() {
        let headers = HeaderFields::from_str(
            "From: me <me@example.com>\nSubject: a long\n  subject\r\nTo:you@example.com",
        )
        .unwrap();

        let fields: Vec<_> = headers
            .iter()
            .map(|(name, body)| (name.as_ref(), body.as_str()))
            .collect();

        assert_eq!(
            fields,
            [
                ("From", "me <me@example.com>"),
                ("Subject", "a long\r\n  subject"),
                ("To", "you@example.com"),
            ]
        );

        assert!(HeaderFields::from_str(" continuation first").is_err());
        assert!(HeaderFields::from_str("no colon here").is_err());
    }

    #[test]
    fn fold_field_body_ok() {
        let value = "Subject ".repeat(10);
        let value = value.trim_end();

        let folded = fold_field_body("Subject", value, LINE_WIDTH);

        assert_eq!(folded.replace("\r\n", ""), value);
        assert!(format!("Subject: {folded}").split("\r\n").all(|l| l.len() <= LINE_WIDTH));
        assert!(FieldBody::new(folded).is_ok());

        assert_eq!(fold_field_body("To", "short", LINE_WIDTH), "short");
        assert_eq!(fold_field_body("To", "a\r\n b", 1), "a\r\n b");
    }
}
