//! URL fragment handling shared by plain and encrypted links
//!
//! Fragments are read as `key=value` pairs, so percent-encoded bodies
//! (`encodeURIComponent` output from the browser application) and raw
//! unpadded URL-safe bodies are both understood.

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
        DecodePaddingMode,
    },
    Engine as _,
};
use url::{form_urlencoded, Url};

use crate::LinkError;

/// Fragment key of encrypted links
pub const ENCRYPTED_KEY: &str = "encrypted";

/// Fragment key of plain links
pub const DATA_KEY: &str = "data";

/// URL-safe alphabet; writes without padding, reads with or without it
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Standard alphabet as emitted by `btoa`
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The two kinds of shareable link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `#data=`: base64 of the payload, no password
    Plain,
    /// `#encrypted=`: base64 of a [`CipherFrame`](crate::CipherFrame)
    Encrypted,
}

impl LinkKind {
    pub fn key(&self) -> &'static str {
        match self {
            LinkKind::Plain => DATA_KEY,
            LinkKind::Encrypted => ENCRYPTED_KEY,
        }
    }
}

/// Everything after the first `#`, or the whole input when there is none.
pub fn fragment(link: &str) -> &str {
    link.split_once('#').map_or(link, |(_, f)| f)
}

/// Determine which kind of shared payload a link carries, if any.
pub fn detect(link: &str) -> Option<LinkKind> {
    form_urlencoded::parse(fragment(link).as_bytes()).find_map(|(k, _)| match &*k {
        DATA_KEY => Some(LinkKind::Plain),
        ENCRYPTED_KEY => Some(LinkKind::Encrypted),
        _ => None,
    })
}

/// The percent-decoded body stored under `kind`'s key.
pub fn find_body(link: &str, kind: LinkKind) -> Option<String> {
    form_urlencoded::parse(fragment(link).as_bytes())
        .find(|(k, _)| k == kind.key())
        .map(|(_, v)| v.into_owned())
}

/// Decode a fragment body in either base64 alphabet, padded or not.
pub fn decode_body(body: &str) -> Result<Vec<u8>, LinkError> {
    // Form decoding turns a literal '+' into ' '; base64 never contains spaces
    let body = body.replace(' ', "+");
    let engine = if body.contains(['+', '/']) {
        &STANDARD_LENIENT
    } else {
        &URL_SAFE_LENIENT
    };
    engine
        .decode(body.as_bytes())
        .map_err(|e| LinkError::MalformedEncoding(e.to_string()))
}

/// `base` with its fragment replaced by `<key>=<base64(payload)>`.
///
/// Encrypted bodies use the unpadded URL-safe alphabet. Plain bodies are
/// written the way the browser application writes them, standard padded
/// base64 percent-encoded, so its `atob` can read them.
pub fn build_link(base: &Url, kind: LinkKind, payload: &[u8]) -> String {
    let mut url = base.clone();
    let body = match kind {
        LinkKind::Encrypted => URL_SAFE_LENIENT.encode(payload),
        LinkKind::Plain => form_urlencoded::byte_serialize(STANDARD.encode(payload).as_bytes()).collect(),
    };
    url.set_fragment(Some(&format!("{}={body}", kind.key())));
    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://geosketch.app/mars.html").unwrap()
    }

    #[test]
    fn test_build_link_shape() {
        let link = build_link(&base(), LinkKind::Encrypted, &[0xfb, 0xff, 0x00]);
        assert_eq!(link, "https://geosketch.app/mars.html#encrypted=-_8A");
    }

    #[test]
    fn test_plain_body_uses_standard_alphabet() {
        let link = build_link(&base(), LinkKind::Plain, &[0xfb, 0xff]);
        assert_eq!(link, "https://geosketch.app/mars.html#data=%2B%2F8%3D");
        let body = find_body(&link, LinkKind::Plain).unwrap();
        assert_eq!(body, "+/8=");
        assert_eq!(decode_body(&body).unwrap(), [0xfb, 0xff]);
    }

    #[test]
    fn test_build_link_replaces_existing_fragment() {
        let base = Url::parse("https://geosketch.app/moon.html#data=old").unwrap();
        let link = build_link(&base, LinkKind::Plain, b"new");
        assert_eq!(link, "https://geosketch.app/moon.html#data=bmV3");
    }

    #[test]
    fn test_detect() {
        assert_eq!(detect("https://h/p#data=abc"), Some(LinkKind::Plain));
        assert_eq!(detect("https://h/p#encrypted=abc"), Some(LinkKind::Encrypted));
        assert_eq!(detect("encrypted=abc"), Some(LinkKind::Encrypted));
        assert_eq!(detect("https://h/p"), None);
        assert_eq!(detect("https://h/p#view=1"), None);
    }

    #[test]
    fn test_find_body_percent_decodes() {
        let body = find_body("https://h/p#encrypted=ab%2Bc%2Fd%3D%3D", LinkKind::Encrypted);
        assert_eq!(body.as_deref(), Some("ab+c/d=="));
        assert_eq!(find_body("https://h/p#data=x", LinkKind::Encrypted), None);
    }

    #[test]
    fn test_decode_body_both_alphabets() {
        let bytes = [0xfb, 0xff, 0xbf, 0x00];
        assert_eq!(decode_body("-_-_AA").unwrap(), bytes);
        assert_eq!(decode_body("+/+/AA==").unwrap(), bytes);
        assert_eq!(decode_body("+/+/AA").unwrap(), bytes);
        // literal '+' that went through form decoding
        assert_eq!(decode_body(" / /AA==").unwrap(), bytes);
    }

    #[test]
    fn test_decode_body_rejects_garbage() {
        for bad in ["!!!", "abc$", "a"] {
            assert!(
                matches!(decode_body(bad), Err(LinkError::MalformedEncoding(_))),
                "{bad:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_decode_empty_body() {
        assert!(decode_body("").unwrap().is_empty());
    }
}
