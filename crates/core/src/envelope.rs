//! The `EV[...]` envelope: wire format, parsing and detection.
//!
//! # Wire format
//!
//! ```text
//! EV[<version>:<base64(nonce)>:<base64(ciphertext+tag)>]
//! ```
//!
//! Both base64 segments use the standard alphabet with padding. A 24-byte
//! nonce always encodes to exactly 32 characters. The grammar is anchored at
//! both ends: trailing or leading bytes make the whole input invalid.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex_lite::Regex;

use crate::error::{FormatError, Segment};
use crate::NONCE_LEN;

/// Wire format revision written by this crate.
pub const SCHEMA_VERSION: u32 = 1;

// Versions are canonical decimal, without leading zeros.
const PATTERN: &str = r"^EV\[(0|[1-9]\d*):([A-Za-z0-9+/=]{32}):([A-Za-z0-9+/=]+)\]$";

fn grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| Regex::new(PATTERN).expect("envelope grammar is a valid regex"))
}

/// A parsed envelope.
///
/// Holds no reference to a key; the key is always supplied at open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Wire format revision. Any value parses; only [`SCHEMA_VERSION`] opens.
    pub schema_version: u32,
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

/// Returns `true` if `data` is a complete envelope in the `EV[...]` format.
///
/// Only the grammar is checked; base64 validity and nonce length are left
/// to [`Envelope::load`]. Used as a fast pre-check to avoid double encryption.
pub fn is_envelope(data: &[u8]) -> bool {
    std::str::from_utf8(data).is_ok_and(|s| grammar().is_match(s))
}

impl Envelope {
    /// Render this envelope in its persistable text form.
    pub fn dump(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Strictly parse an envelope from its text form.
    ///
    /// Versions other than [`SCHEMA_VERSION`] are accepted here; rejecting
    /// them is the engine's job.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] naming the first segment that failed.
    pub fn load(data: &[u8]) -> Result<Self, FormatError> {
        let text = std::str::from_utf8(data).map_err(|_| FormatError::Malformed)?;
        let caps = grammar().captures(text).ok_or(FormatError::Malformed)?;

        let version = &caps[1];
        let schema_version = version
            .parse::<u32>()
            .map_err(|_| FormatError::Version(version.to_owned()))?;

        let nonce_bytes = STANDARD
            .decode(&caps[2])
            .map_err(|_| FormatError::Base64 {
                segment: Segment::Nonce,
            })?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .as_slice()
            .try_into()
            .map_err(|_| FormatError::NonceLength(nonce_bytes.len()))?;

        let ciphertext = STANDARD
            .decode(&caps[3])
            .map_err(|_| FormatError::Base64 {
                segment: Segment::Ciphertext,
            })?;

        Ok(Self {
            schema_version,
            nonce,
            ciphertext,
        })
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EV[{}:{}:{}]",
            self.schema_version,
            STANDARD.encode(self.nonce),
            STANDARD.encode(&self.ciphertext),
        )
    }
}

impl FromStr for Envelope {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::load(s.as_bytes())
    }
}
