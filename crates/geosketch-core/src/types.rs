//! Contracts between the link codec and the surrounding application.
//!
//! The codec only ever sees payload text and a password. Where the text comes
//! from (a feature table, a file, stdin) and how the password is collected
//! (a terminal prompt, an environment variable) is up to the implementor.

use secrecy::SecretString;

/// Supplies the current payload text (the serialized feature table).
pub trait PayloadSource {
    fn payload_text(&self) -> String;
}

/// Receives a decoded payload.
pub trait PayloadSink {
    fn set_payload_text(&mut self, text: String);
}

/// Why a password is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPurpose {
    /// A new encrypted link is being created
    Encrypt,
    /// An encrypted link is being opened
    Decrypt,
}

impl PromptPurpose {
    pub fn title(&self) -> &'static str {
        match self {
            PromptPurpose::Encrypt => "Enter password to encrypt",
            PromptPurpose::Decrypt => "Enter password to decrypt",
        }
    }
}

/// Supplies passwords. Implementations must not store or log them.
pub trait PasswordPrompt {
    fn password(&mut self, purpose: PromptPurpose) -> std::io::Result<SecretString>;
}

impl PayloadSource for String {
    fn payload_text(&self) -> String {
        self.clone()
    }
}

impl PayloadSource for str {
    fn payload_text(&self) -> String {
        self.to_owned()
    }
}

impl PayloadSink for String {
    fn set_payload_text(&mut self, text: String) {
        *self = text;
    }
}

impl PayloadSink for Option<String> {
    fn set_payload_text(&mut self, text: String) {
        *self = Some(text);
    }
}
