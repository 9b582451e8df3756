//! Error types for sealing, opening and parsing envelopes.

use std::fmt;

use thiserror::Error;

use crate::NONCE_LEN;

/// Top-level error type for every engine and codec operation.
///
/// The set is deliberately small:
/// - [`Error::RandomSource`]: the OS CSPRNG could not supply bytes.
/// - [`Error::InvalidFormat`]: the input is not a well-formed envelope.
/// - [`Error::Decryption`]: authentication failed during open.
#[derive(Debug, Error)]
pub enum Error {
    /// The secure random source could not supply entropy.
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    /// The input does not conform to the `EV[...]` wire format.
    #[error("invalid message format: {0}")]
    InvalidFormat(#[from] FormatError),

    /// Authentication failed. Wrong key and tampered data are reported identically.
    #[error("could not decrypt message")]
    Decryption,

    /// The AEAD primitive refused to seal the plaintext (length limit exceeded).
    #[error("could not encrypt message")]
    Seal,
}

/// The envelope segment a [`FormatError::Base64`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Nonce,
    Ciphertext,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Nonce => f.write_str("nonce"),
            Segment::Ciphertext => f.write_str("ciphertext"),
        }
    }
}

/// Why an input was rejected as an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The input does not match `EV[<version>:<nonce>:<ciphertext>]` in full.
    #[error("input does not match EV[<version>:<nonce>:<ciphertext>]")]
    Malformed,

    /// Decrypted field content is expected to be text but is not UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    NotUtf8,

    /// The version segment does not fit an unsigned integer.
    #[error("schema version {0:?} is not a valid integer")]
    Version(String),

    /// A base64 segment failed to decode.
    #[error("{segment} segment is not valid base64")]
    Base64 { segment: Segment },

    /// The nonce segment decoded to the wrong number of bytes.
    #[error("nonce decodes to {0} bytes, expected {NONCE_LEN}")]
    NonceLength(usize),

    /// Parsed successfully, but the engine only understands [`crate::SCHEMA_VERSION`].
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if retrying the same call may succeed.
    ///
    /// Only entropy exhaustion is transient; format and authentication
    /// failures are properties of the input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::RandomSource(_))
    }
}
