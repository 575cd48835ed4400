//! geosketch-crypto: shareable links for sketch payloads
//!
//! Two fragment formats are supported:
//!
//! ```text
//! https://host/page#data=<base64(utf8 payload), %-encoded>  plain, unauthenticated
//! https://host/page#encrypted=<base64url(frame)>            password protected
//! ```
//!
//! Encrypted pipeline:
//! payload → gzip → PBKDF2-HMAC-SHA256(password, salt) → AES-256-GCM → frame → base64url
//!
//! Frame layout:
//! ```text
//! [16 bytes: salt][12 bytes: IV][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! The KDF parameters are not part of the frame; encoder and decoder must
//! agree on them out of band.

pub mod cipher;
pub mod compress;
pub mod error;
pub mod fragment;
pub mod frame;
pub mod kdf;
pub mod link;
pub mod plain;
pub mod share;

pub use error::LinkError;
pub use fragment::{detect, LinkKind};
pub use frame::CipherFrame;
pub use kdf::{derive_link_key, KdfParams, LinkKey};
pub use link::{decode_link, decode_link_frame, encode_link, encode_link_with_rng, read_link_frame};
pub use plain::{decode_plain_link, encode_plain_link};
pub use share::ShareCodec;

/// Size of a derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the per-link PBKDF2 salt
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM IV (96-bit)
pub const IV_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Smallest well-formed frame: salt and IV with an empty ciphertext
pub const FRAME_HEADER_SIZE: usize = SALT_SIZE + IV_SIZE;
