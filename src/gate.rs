//! Capability secret and path authorization.
//!
//! Producers prove write access by embedding the process-wide secret as the
//! first path segment: `/<secret>/<base32(message)>`.

use std::fmt;

use bytes::Bytes;
use data_encoding::BASE32;

/// Minimum secret length.
pub const MIN_SECRET_LEN: usize = 6;
/// Maximum secret length.
pub const MAX_SECRET_LEN: usize = 100;
/// Random bytes drawn for a generated secret.
pub const GENERATED_SECRET_BYTES: usize = 10;

/// Errors from secret validation and path authorization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Secret must be at least 6 characters")]
    SecretTooShort,

    #[error("Secret is too long (max 100 characters)")]
    SecretTooLong,

    #[error("Bad character '{0}' in secret, must be alphanumeric")]
    SecretBadCharacter(char),

    #[error("Permission denied")]
    Forbidden,

    #[error("Failed to parse message as base32")]
    BadRequest,
}

/// Process-wide capability secret. Immutable once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Validate an operator-supplied secret.
    pub fn parse(value: &str) -> Result<Self, GateError> {
        if value.len() < MIN_SECRET_LEN {
            return Err(GateError::SecretTooShort);
        }
        if value.len() > MAX_SECRET_LEN {
            return Err(GateError::SecretTooLong);
        }
        if let Some(c) = value.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(GateError::SecretBadCharacter(c));
        }
        Ok(Self(value.to_string()))
    }

    /// Generate a random secret: 10 CSPRNG bytes, base32-encoded.
    pub fn generate() -> Self {
        let token: [u8; GENERATED_SECRET_BYTES] = rand::random();
        Self(BASE32.encode(&token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of logs and panics.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

/// Authorizes ingest paths against the capability secret.
#[derive(Debug, Clone)]
pub struct SecretGate {
    prefix: String,
}

impl SecretGate {
    pub fn new(secret: &Secret) -> Self {
        Self {
            prefix: format!("/{}/", secret.as_str()),
        }
    }

    /// Check `path` against `/<secret>/` and decode the base32 remainder.
    ///
    /// Returns [`GateError::Forbidden`] when the prefix does not match and
    /// [`GateError::BadRequest`] when the remainder is not valid base32 or
    /// decodes to nothing.
    pub fn authorize(&self, path: &str) -> Result<Bytes, GateError> {
        let encoded = path
            .strip_prefix(self.prefix.as_str())
            .ok_or(GateError::Forbidden)?;

        let message = BASE32
            .decode(encoded.as_bytes())
            .map_err(|_| GateError::BadRequest)?;

        if message.is_empty() {
            return Err(GateError::BadRequest);
        }
        Ok(Bytes::from(message))
    }
}
