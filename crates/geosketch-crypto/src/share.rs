//! Share/open orchestration over the payload and password collaborators

use geosketch_core::{PasswordPrompt, PayloadSink, PayloadSource, PromptPurpose};
use tracing::{debug, warn};
use url::Url;

use crate::fragment::{self, LinkKind};
use crate::kdf::KdfParams;
use crate::{link, plain, LinkError};

/// Creates and opens share links for one page of the application.
///
/// Holds no secrets: passwords are requested from a [`PasswordPrompt`] per
/// call and dropped before the call returns.
#[derive(Debug, Clone)]
pub struct ShareCodec {
    base_url: Url,
    kdf: KdfParams,
    max_password_attempts: u32,
}

impl ShareCodec {
    pub fn new(base_url: Url, kdf: KdfParams, max_password_attempts: u32) -> Self {
        Self {
            base_url,
            kdf,
            max_password_attempts: max_password_attempts.max(1),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    /// Share the current payload without a password.
    pub fn share_plain<S: PayloadSource + ?Sized>(&self, source: &S) -> String {
        plain::encode_plain_link(&self.base_url, &source.payload_text())
    }

    /// Share the current payload behind a password.
    ///
    /// A blank payload is rejected before the password is requested.
    pub fn share_encrypted<S, P>(&self, source: &S, prompt: &mut P) -> Result<String, LinkError>
    where
        S: PayloadSource + ?Sized,
        P: PasswordPrompt + ?Sized,
    {
        let text = source.payload_text();
        if text.trim().is_empty() {
            return Err(LinkError::EmptyPayload);
        }
        let password = prompt
            .password(PromptPurpose::Encrypt)
            .map_err(LinkError::Prompt)?;
        link::encode_link(&self.base_url, &text, &password, &self.kdf)
    }

    /// Open a link of either kind and hand its payload to `sink`.
    ///
    /// Only encrypted links ask for a password. A wrong password is asked
    /// again up to the configured number of attempts; every other error ends
    /// the attempt immediately. The sink is untouched on failure.
    pub fn open<P, K>(&self, link: &str, prompt: &mut P, sink: &mut K) -> Result<LinkKind, LinkError>
    where
        P: PasswordPrompt + ?Sized,
        K: PayloadSink + ?Sized,
    {
        let kind = fragment::detect(link).ok_or(LinkError::NoEncryptedPayload)?;
        debug!(?kind, "opening share link");

        match kind {
            LinkKind::Plain => {
                sink.set_payload_text(plain::decode_plain_link(link)?);
            }
            LinkKind::Encrypted => {
                let frame = link::read_link_frame(link)?;
                let mut attempt = 1;
                let text = loop {
                    let password = prompt
                        .password(PromptPurpose::Decrypt)
                        .map_err(LinkError::Prompt)?;
                    match link::decode_link_frame(&frame, &password, &self.kdf) {
                        Ok(text) => break text,
                        Err(e) if e.is_retryable() && attempt < self.max_password_attempts => {
                            warn!(attempt, max = self.max_password_attempts, "{e}");
                            attempt += 1;
                        }
                        Err(e) => return Err(e),
                    }
                };
                sink.set_payload_text(text);
            }
        }
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::collections::VecDeque;
    use std::io;

    /// Answers prompts from a fixed list and records what was asked.
    struct ScriptedPrompt {
        answers: VecDeque<&'static str>,
        asked: Vec<PromptPurpose>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                asked: Vec::new(),
            }
        }
    }

    impl PasswordPrompt for ScriptedPrompt {
        fn password(&mut self, purpose: PromptPurpose) -> io::Result<SecretString> {
            self.asked.push(purpose);
            self.answers
                .pop_front()
                .map(SecretString::from)
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "prompt cancelled"))
        }
    }

    fn codec(attempts: u32) -> ShareCodec {
        ShareCodec::new(
            Url::parse("https://geosketch.app/earth.html").unwrap(),
            KdfParams { iterations: 100 },
            attempts,
        )
    }

    #[test]
    fn test_share_and_open_encrypted() {
        let codec = codec(3);
        let mut prompt = ScriptedPrompt::new(&["correct-horse", "correct-horse"]);
        let link = codec.share_encrypted("POINT(10 20)\tnote", &mut prompt).unwrap();

        let mut sink: Option<String> = None;
        let kind = codec.open(&link, &mut prompt, &mut sink).unwrap();
        assert_eq!(kind, LinkKind::Encrypted);
        assert_eq!(sink.as_deref(), Some("POINT(10 20)\tnote"));
        assert_eq!(prompt.asked, [PromptPurpose::Encrypt, PromptPurpose::Decrypt]);
    }

    #[test]
    fn test_plain_links_never_prompt() {
        let codec = codec(3);
        let link = codec.share_plain("LINESTRING(0 0, 1 1)");
        let mut prompt = ScriptedPrompt::new(&[]);
        let mut sink = String::new();

        assert_eq!(codec.open(&link, &mut prompt, &mut sink).unwrap(), LinkKind::Plain);
        assert_eq!(sink, "LINESTRING(0 0, 1 1)");
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn test_empty_payload_does_not_prompt() {
        let mut prompt = ScriptedPrompt::new(&["pw"]);
        for blank in ["", " \n\t"] {
            assert!(matches!(
                codec(3).share_encrypted(blank, &mut prompt),
                Err(LinkError::EmptyPayload)
            ));
        }
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn test_wrong_password_is_asked_again() {
        let codec = codec(3);
        let link = codec
            .share_encrypted("sketch", &mut ScriptedPrompt::new(&["right"]))
            .unwrap();

        let mut prompt = ScriptedPrompt::new(&["wrong", "also-wrong", "right"]);
        let mut sink: Option<String> = None;
        codec.open(&link, &mut prompt, &mut sink).unwrap();
        assert_eq!(sink.as_deref(), Some("sketch"));
        assert_eq!(prompt.asked.len(), 3);
    }

    #[test]
    fn test_attempts_are_bounded() {
        let codec = codec(2);
        let link = codec
            .share_encrypted("sketch", &mut ScriptedPrompt::new(&["right"]))
            .unwrap();

        let mut prompt = ScriptedPrompt::new(&["wrong", "wrong", "right"]);
        let mut sink: Option<String> = None;
        assert!(matches!(
            codec.open(&link, &mut prompt, &mut sink),
            Err(LinkError::AuthenticationFailed)
        ));
        assert_eq!(prompt.asked.len(), 2);
        assert!(sink.is_none());
    }

    #[test]
    fn test_malformed_link_fails_before_prompting() {
        let mut prompt = ScriptedPrompt::new(&["pw"]);
        let mut sink: Option<String> = None;
        let err = codec(3)
            .open("https://geosketch.app/earth.html#encrypted=AAAA", &mut prompt, &mut sink)
            .unwrap_err();
        assert!(matches!(err, LinkError::MalformedFrame { len: 3 }));
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn test_link_without_payload() {
        let mut sink: Option<String> = None;
        assert!(matches!(
            codec(3).open("https://geosketch.app/earth.html", &mut ScriptedPrompt::new(&[]), &mut sink),
            Err(LinkError::NoEncryptedPayload)
        ));
    }

    #[test]
    fn test_cancelled_prompt() {
        let err = codec(3)
            .share_encrypted("sketch", &mut ScriptedPrompt::new(&[]))
            .unwrap_err();
        assert!(matches!(err, LinkError::Prompt(_)));
    }
}
