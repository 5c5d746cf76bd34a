//! Participant identities and authority-issued tokens.
//!
//! Both are opaque strings. They are compared byte for byte: no
//! normalization, no case folding.

use base64::prelude::*;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Number of random bytes behind every token.
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Opaque identifier a participant chooses for itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random 128-bit identity rendered as a hyphenated UUID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Interpret raw enrollment bytes as an identity.
    ///
    /// Any byte sequence is accepted; invalid UTF-8 is replaced rather than
    /// rejected since enrollment has no error path.
    #[must_use]
    pub fn from_wire(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability string proving that an identity enrolled with the authority.
///
/// `Debug` is redacted so tokens never end up in logs by accident; use
/// [`Token::as_str`] when the raw value is really needed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generate a fresh unguessable token.
    ///
    /// 32 bytes from the OS RNG, URL-safe base64 without padding (43 chars),
    /// which stays well under the enrollment read ceiling.
    #[must_use]
    pub fn generate() -> Self {
        let mut random = [0u8; TOKEN_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut random);
        Self(BASE64_URL_SAFE_NO_PAD.encode(random))
    }

    /// Interpret the raw enrollment response as a token.
    #[must_use]
    pub fn from_wire(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Compare against a presented token in constant time.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token(<{} chars>)", self.0.len())
    }
}
