//! Unencrypted `#data=` links
//!
//! A reversible encoding only: anyone holding the link can read the payload.
//!
//! Links are written as UTF-8. The browser application writes them with
//! `btoa`, one Latin-1 byte per character; bodies that are not valid UTF-8
//! are read that way.

use tracing::debug;
use url::Url;

use crate::fragment::{self, LinkKind};
use crate::LinkError;

/// Create a `#data=` link carrying `text` as base64 UTF-8.
pub fn encode_plain_link(base: &Url, text: &str) -> String {
    debug!(payload_bytes = text.len(), "encoded plain link");
    fragment::build_link(base, LinkKind::Plain, text.as_bytes())
}

/// Recover the payload of a `#data=` link.
pub fn decode_plain_link(link: &str) -> Result<String, LinkError> {
    let body = fragment::find_body(link, LinkKind::Plain).ok_or(LinkError::NoPlainPayload)?;
    let bytes = fragment::decode_body(&body)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => Ok(e.as_bytes().iter().map(|&b| char::from(b)).collect()),
    }
}
