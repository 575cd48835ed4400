//! Binary frame carried by encrypted links
//!
//! ```text
//! [16 bytes: PBKDF2 salt][12 bytes: AES-GCM IV][N bytes: ciphertext + 16-byte tag]
//! ```
//!
//! There is no length or version field: the fixed 16/12 split is the format.
//! A different layout must be published under a new fragment marker instead of
//! changing this one.

use crate::{LinkError, FRAME_HEADER_SIZE, IV_SIZE, SALT_SIZE};

/// A parsed frame borrowing from the decoded link bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherFrame<'a> {
    pub salt: &'a [u8; SALT_SIZE],
    pub iv: &'a [u8; IV_SIZE],
    pub ciphertext: &'a [u8],
}

/// Concatenate salt, IV and ciphertext.
pub fn build(salt: &[u8; SALT_SIZE], iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + ciphertext.len());
    frame.extend_from_slice(salt);
    frame.extend_from_slice(iv);
    frame.extend_from_slice(ciphertext);
    frame
}

/// Split a frame into salt, IV and ciphertext.
///
/// Fails with [`LinkError::MalformedFrame`] when fewer than 28 bytes are given.
pub fn parse(frame: &[u8]) -> Result<CipherFrame<'_>, LinkError> {
    if frame.len() < FRAME_HEADER_SIZE {
        return Err(LinkError::MalformedFrame { len: frame.len() });
    }
    let (salt, rest) = frame.split_at(SALT_SIZE);
    let (iv, ciphertext) = rest.split_at(IV_SIZE);
    Ok(CipherFrame {
        salt: salt
            .try_into()
            .map_err(|_| LinkError::MalformedFrame { len: frame.len() })?,
        iv: iv
            .try_into()
            .map_err(|_| LinkError::MalformedFrame { len: frame.len() })?,
        ciphertext,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_layout() {
        let frame = build(&[1u8; SALT_SIZE], &[2u8; IV_SIZE], b"ct");
        assert_eq!(frame.len(), 30);
        assert!(frame[..16].iter().all(|&b| b == 1));
        assert!(frame[16..28].iter().all(|&b| b == 2));
        assert_eq!(&frame[28..], b"ct");
    }

    #[test]
    fn test_parse_splits_at_fixed_offsets() {
        let bytes: Vec<u8> = (0u8..40).collect();
        let frame = parse(&bytes).unwrap();
        assert_eq!(frame.salt[0], 0);
        assert_eq!(frame.salt[15], 15);
        assert_eq!(frame.iv[0], 16);
        assert_eq!(frame.iv[11], 27);
        assert_eq!(frame.ciphertext, &bytes[28..]);
    }

    #[test]
    fn test_parse_header_only_frame() {
        let frame = parse(&[0u8; FRAME_HEADER_SIZE]).unwrap();
        assert!(frame.ciphertext.is_empty());
    }

    #[test]
    fn test_parse_short_frames() {
        for len in [0, 1, 16, 27] {
            let bytes = vec![0u8; len];
            assert!(
                matches!(parse(&bytes), Err(LinkError::MalformedFrame { len: l }) if l == len),
                "{len}-byte frame must be rejected"
            );
        }
    }

    #[test]
    fn test_build_then_parse() {
        let salt = [9u8; SALT_SIZE];
        let iv = [8u8; IV_SIZE];
        let built = build(&salt, &iv, b"ciphertext and tag");
        let parsed = parse(&built).unwrap();
        assert_eq!(parsed.salt, &salt);
        assert_eq!(parsed.iv, &iv);
        assert_eq!(parsed.ciphertext, b"ciphertext and tag");
    }
}
