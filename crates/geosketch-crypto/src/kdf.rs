//! Key derivation: PBKDF2-HMAC-SHA256 password → link key

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{KEY_SIZE, SALT_SIZE};

/// Iteration count used by links created in the browser application.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// A 256-bit AES key derived for a single link.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct LinkKey {
    bytes: [u8; KEY_SIZE],
}

impl LinkKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for LinkKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2 parameters for link keys.
///
/// Not embedded in links; both sides must use the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// HMAC-SHA256 iterations (default: 100000)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Derive a 256-bit link key from a password and salt using PBKDF2-HMAC-SHA256.
pub fn derive_link_key(
    password: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> LinkKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(
        password.expose_secret().as_bytes(),
        salt,
        params.iterations.max(1),
        &mut key,
    );
    let derived = LinkKey::from_bytes(key);
    key.zeroize();
    derived
}
