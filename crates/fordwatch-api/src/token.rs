// Bearer token bookkeeping.
//
// Tokens are held here and nowhere else; the session manager is the only
// writer, and callers only ever see the opaque secret value.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// A bearer token with its validity window.
///
/// `expires_at` is `None` when the vendor response did not carry an
/// `expires_in` -- such a token is trusted until explicitly rejected.
#[derive(Debug, Clone)]
pub struct Token {
    pub value: SecretString,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Whether the token is still usable at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => now < expiry,
            None => true,
        }
    }
}

/// Holds the current bearer credential. No network knowledge.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: Option<Token>,
}

impl TokenStore {
    /// The stored token, if present and not expired at `now`.
    pub fn valid(&self, now: DateTime<Utc>) -> Option<&Token> {
        self.current.as_ref().filter(|t| t.is_valid(now))
    }

    /// Replace the stored token.
    pub fn set(&mut self, token: Token) {
        self.current = Some(token);
    }

    /// Drop the stored token, forcing the next caller to re-authenticate.
    pub fn clear(&mut self) {
        self.current = None;
    }
}
