//! Encrypted share links
//!
//! Encode: payload → gzip → random salt/IV → PBKDF2 → AES-256-GCM → frame → `#encrypted=`
//! Decode: the same steps reversed. Each call owns its salt, IV and key; nothing
//! is retained between calls.

use rand::{rngs::OsRng, CryptoRng, RngCore};
use secrecy::SecretString;
use tracing::debug;
use url::Url;

use crate::fragment::{self, LinkKind};
use crate::kdf::{derive_link_key, KdfParams};
use crate::{cipher, compress, frame, LinkError, IV_SIZE, SALT_SIZE};

/// Create an `#encrypted=` link for `plaintext` under `base`.
///
/// Salt and IV come from the operating system CSPRNG, so two calls with the
/// same arguments never produce the same link.
pub fn encode_link(
    base: &Url,
    plaintext: &str,
    password: &SecretString,
    params: &KdfParams,
) -> Result<String, LinkError> {
    encode_link_with_rng(base, plaintext, password, params, &mut OsRng)
}

/// [`encode_link`] with an explicit randomness source.
///
/// A failing source yields [`LinkError::RandomnessUnavailable`] and no link.
/// Payloads the decoder would refuse to inflate are rejected up front with
/// [`LinkError::PayloadTooLarge`].
pub fn encode_link_with_rng<R: RngCore + CryptoRng>(
    base: &Url,
    plaintext: &str,
    password: &SecretString,
    params: &KdfParams,
    rng: &mut R,
) -> Result<String, LinkError> {
    if plaintext.is_empty() {
        return Err(LinkError::EmptyPayload);
    }
    if plaintext.len() as u64 > compress::MAX_DECOMPRESSED_SIZE {
        return Err(LinkError::PayloadTooLarge {
            len: plaintext.len(),
        });
    }

    let compressed = compress::compress(plaintext.as_bytes()).map_err(LinkError::Compression)?;

    let mut salt = [0u8; SALT_SIZE];
    let mut iv = [0u8; IV_SIZE];
    rng.try_fill_bytes(&mut salt)
        .and_then(|()| rng.try_fill_bytes(&mut iv))
        .map_err(|e| LinkError::RandomnessUnavailable(e.to_string()))?;

    let key = derive_link_key(password, &salt, params);
    let ciphertext = cipher::seal(&key, &iv, &compressed)?;
    let frame = frame::build(&salt, &iv, &ciphertext);

    debug!(
        payload_bytes = plaintext.len(),
        compressed_bytes = compressed.len(),
        frame_bytes = frame.len(),
        "encoded encrypted link"
    );
    Ok(fragment::build_link(base, LinkKind::Encrypted, &frame))
}

/// Extract and validate the frame of an `#encrypted=` link.
///
/// Checks everything that can be checked without a password: the marker, the
/// base64 body and the minimum frame length.
pub fn read_link_frame(link: &str) -> Result<Vec<u8>, LinkError> {
    let body =
        fragment::find_body(link, LinkKind::Encrypted).ok_or(LinkError::NoEncryptedPayload)?;
    let bytes = fragment::decode_body(&body)?;
    frame::parse(&bytes)?;
    Ok(bytes)
}

/// Decrypt a frame previously returned by [`read_link_frame`].
pub fn decode_link_frame(
    frame_bytes: &[u8],
    password: &SecretString,
    params: &KdfParams,
) -> Result<String, LinkError> {
    let frame = frame::parse(frame_bytes)?;
    let key = derive_link_key(password, frame.salt, params);
    let compressed = cipher::open(&key, frame.iv, frame.ciphertext)?;

    let plain =
        compress::decompress(&compressed).map_err(|e| LinkError::CorruptPayload(e.to_string()))?;
    let text = String::from_utf8(plain)
        .map_err(|e| LinkError::CorruptPayload(format!("payload is not UTF-8: {e}")))?;

    debug!(
        frame_bytes = frame_bytes.len(),
        payload_bytes = text.len(),
        "decoded encrypted link"
    );
    Ok(text)
}

/// Recover the payload of an `#encrypted=` link.
pub fn decode_link(
    link: &str,
    password: &SecretString,
    params: &KdfParams,
) -> Result<String, LinkError> {
    let frame_bytes = read_link_frame(link)?;
    decode_link_frame(&frame_bytes, password, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> Url {
        Url::parse("https://geosketch.app/earth.html").unwrap()
    }

    fn fast() -> KdfParams {
        KdfParams { iterations: 100 }
    }

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn test_roundtrip() {
        let link = encode_link(&base(), "POINT(10 20)\tnote", &pw("correct-horse"), &fast()).unwrap();
        assert!(link.starts_with("https://geosketch.app/earth.html#encrypted="));
        let text = decode_link(&link, &pw("correct-horse"), &fast()).unwrap();
        assert_eq!(text, "POINT(10 20)\tnote");
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(
            encode_link(&base(), "", &pw("pw"), &fast()),
            Err(LinkError::EmptyPayload)
        ));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let text = "x".repeat(compress::MAX_DECOMPRESSED_SIZE as usize + 1);
        match encode_link(&base(), &text, &pw("pw"), &fast()) {
            Err(LinkError::PayloadTooLarge { len }) => assert_eq!(len, text.len()),
            other => panic!("expected PayloadTooLarge, got: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_password() {
        let link = encode_link(&base(), "secret sketch", &pw("right"), &fast()).unwrap();
        assert!(matches!(
            decode_link(&link, &pw("wrong"), &fast()),
            Err(LinkError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_mismatched_iterations_fail_authentication() {
        let link = encode_link(&base(), "sketch", &pw("pw"), &fast()).unwrap();
        assert!(matches!(
            decode_link(&link, &pw("pw"), &KdfParams { iterations: 101 }),
            Err(LinkError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_read_link_frame_validates_without_password() {
        assert!(matches!(
            read_link_frame("https://geosketch.app/earth.html"),
            Err(LinkError::NoEncryptedPayload)
        ));
        assert!(matches!(
            read_link_frame("https://geosketch.app/earth.html#data=YQ"),
            Err(LinkError::NoEncryptedPayload)
        ));
        assert!(matches!(
            read_link_frame("https://geosketch.app/earth.html#encrypted=%%%"),
            Err(LinkError::MalformedEncoding(_))
        ));
        assert!(matches!(
            read_link_frame("https://geosketch.app/earth.html#encrypted=AAAA"),
            Err(LinkError::MalformedFrame { len: 3 })
        ));
    }

    #[test]
    fn test_authenticated_garbage_is_corrupt_payload() {
        // A validly sealed frame whose plaintext is not gzip
        let salt = [1u8; SALT_SIZE];
        let iv = [2u8; IV_SIZE];
        let key = derive_link_key(&pw("pw"), &salt, &fast());
        let ciphertext = cipher::seal(&key, &iv, b"definitely not gzip").unwrap();
        let bytes = frame::build(&salt, &iv, &ciphertext);

        assert!(matches!(
            decode_link_frame(&bytes, &pw("pw"), &fast()),
            Err(LinkError::CorruptPayload(_))
        ));
    }

    #[test]
    fn test_authenticated_non_utf8_is_corrupt_payload() {
        let salt = [3u8; SALT_SIZE];
        let iv = [4u8; IV_SIZE];
        let key = derive_link_key(&pw("pw"), &salt, &fast());
        let compressed = compress::compress(&[0xff, 0xfe, 0x00]).unwrap();
        let ciphertext = cipher::seal(&key, &iv, &compressed).unwrap();
        let bytes = frame::build(&salt, &iv, &ciphertext);

        assert!(matches!(
            decode_link_frame(&bytes, &pw("pw"), &fast()),
            Err(LinkError::CorruptPayload(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn encode_decode_roundtrip(text in "\\PC{1,200}", password in "\\PC{0,24}") {
            let password = pw(&password);
            let link = encode_link(&base(), &text, &password, &fast()).unwrap();
            let decoded = decode_link(&link, &password, &fast()).unwrap();
            prop_assert_eq!(decoded, text);
        }
    }
}
