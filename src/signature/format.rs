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
    crypto::SIGNATURE_CHUNK_WIDTH,
    header::{self, LINE_WIDTH},
    signature::{DkimHeaderValue, DKIM_SIGNATURE_NAME},
    tag_list, util,
};
use std::fmt::{self, Formatter};

const TAG_SEPARATOR: &str = "; ";

pub fn format_tags<'a, I>(f: &mut Formatter<'_>, tags: I) -> fmt::Result
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    for (i, (name, value)) in tags.into_iter().enumerate() {
        if i > 0 {
            f.write_str(TAG_SEPARATOR)?;
        }
        match name {
            // parsed values carry no FWS, chunk them as the signer does
            "b" if value.is_ascii() => {
                let data = tag_list::strip_fws_from_tag_value(value);
                let chunked = util::chunk_with_spaces(&data, SIGNATURE_CHUNK_WIDTH);
                write!(f, "{name}={chunked}")?;
            }
            _ => write!(f, "{name}={value}")?,
        }
    }
    Ok(())
}

// Folding only ever happens at existing spaces: after a tag separator, or
// between the chunks of the b= value. Both positions are FWS in the tag list
// syntax, so the folded value parses and canonicalizes like the unfolded one.
pub fn fold_header_value(value: &DkimHeaderValue) -> String {
    header::fold_field_body(DKIM_SIGNATURE_NAME, &value.to_string(), LINE_WIDTH)
}
