//! AES-256-GCM encryption of link payloads
//!
//! Output of [`seal`] is `ciphertext || 16-byte tag`; the IV travels
//! separately in the frame. No associated data is bound, matching links
//! produced by the browser application.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use crate::kdf::LinkKey;
use crate::{LinkError, IV_SIZE, TAG_SIZE};

/// Encrypt `plaintext` under `key` with the given IV.
///
/// The IV must never repeat for the same key; callers draw a fresh random one
/// per link.
pub fn seal(key: &LinkKey, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, LinkError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|e| LinkError::Cipher(format!("AES-GCM encryption failed: {e}")))
}

/// Decrypt and authenticate `ciphertext || tag`.
///
/// Any failure, whether a wrong key or modified bytes, is reported as
/// [`LinkError::AuthenticationFailed`].
pub fn open(key: &LinkKey, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>, LinkError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(LinkError::AuthenticationFailed);
    }
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| LinkError::AuthenticationFailed)
}
