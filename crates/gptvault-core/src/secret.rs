//! Zeroizing, redacting string wrapper for passphrases and API keys.

use std::fmt;
use std::str::Utf8Error;
use zeroize::Zeroizing;

/// Owned secret text.
///
/// The buffer is wiped on drop. Formatting prints `[REDACTED]`, and there
/// is no `Serialize` impl, so the value only leaves through
/// [`expose_secret`](Self::expose_secret).
#[derive(Clone, Default)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Take ownership of decrypted bytes. Invalid UTF-8 is wiped before the
    /// error is returned.
    pub fn from_utf8(bytes: Vec<u8>) -> Result<Self, Utf8Error> {
        String::from_utf8(bytes).map(Self::new).map_err(|e| {
            let err = e.utf8_error();
            drop(Zeroizing::new(e.into_bytes()));
            err
        })
    }

    pub fn expose_secret(&self) -> &str {
        self.0.as_str()
    }

    pub fn expose_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.expose_bytes(), other.expose_bytes())
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Compare two byte strings without short-circuiting on content.
///
/// Lengths are compared first and are not treated as secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
