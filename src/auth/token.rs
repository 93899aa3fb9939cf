//! Bearer token codec
//!
//! A token is the URL-safe base64 (padded) encoding of `name 0x1F secret`.
//! It carries no signature: the secret itself is the credential and is
//! compared against the table, the codec only splits it back out.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use std::fmt;

/// Separator between name and secret inside a token
pub const TOKEN_SEPARATOR: char = '\u{1f}';

/// A decoded (name, secret) pair
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub name: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }

    /// True when nothing usable was decoded
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Encode a name and secret into a bearer token
pub fn encode(name: &str, secret: &str) -> String {
    let mut raw = String::with_capacity(name.len() + TOKEN_SEPARATOR.len_utf8() + secret.len());
    raw.push_str(name);
    raw.push(TOKEN_SEPARATOR);
    raw.push_str(secret);
    URL_SAFE.encode(raw)
}

/// Decode a bearer token.
///
/// Never fails: anything that is not valid base64 of UTF-8 text decodes to
/// empty credentials. Only the first separator splits, so a secret may
/// contain further separators; a payload without one is all name.
pub fn decode(token: &str) -> Credentials {
    let Ok(raw) = URL_SAFE.decode(token) else {
        return Credentials::default();
    };
    let Ok(raw) = String::from_utf8(raw) else {
        return Credentials::default();
    };

    match raw.split_once(TOKEN_SEPARATOR) {
        Some((name, secret)) => Credentials::new(name, secret),
        None => Credentials {
            name: raw,
            secret: String::new(),
        },
    }
}
