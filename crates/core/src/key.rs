//! [`Key`]: the 256-bit secret and the seal/open engine built on it.
//!
//! **Algorithm:** XSalsa20-Poly1305 (NaCl `secretbox`). The 192-bit nonce is
//! large enough to be drawn at random for every message without a realistic
//! collision risk, so each call to [`Key::encrypt`] generates a fresh one.
//!
//! **Never reuse a nonce with the same key.** Reuse breaks both confidentiality
//! and authentication of the scheme.

use std::fmt;

use crypto_secretbox::aead::{generic_array::GenericArray, Aead, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::envelope::{is_envelope, Envelope, SCHEMA_VERSION};
use crate::error::{Error, FormatError, Result};
use crate::random::{OsRandom, RandomSource};

/// Byte length of a key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an XSalsa20 nonce (24 bytes = 192 bits).
pub const NONCE_LEN: usize = 24;

/// A 256-bit secret key.
///
/// The key bytes are overwritten with zeroes on drop. There is no `Display`
/// or serde implementation; `Debug` output is redacted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    bytes: [u8; KEY_LEN],
}

impl Key {
    /// Generate a new random key from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomSource`] if the CSPRNG cannot supply entropy.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&OsRandom)
    }

    /// Generate a new random key from `rng`.
    pub fn generate_with<R: RandomSource + ?Sized>(rng: &R) -> Result<Self> {
        let mut key = Self {
            bytes: [0u8; KEY_LEN],
        };
        key.regenerate_with(rng)?;
        Ok(key)
    }

    /// Replace this key's material with fresh random bytes.
    ///
    /// Must not run concurrently with any other use of the same key. On
    /// failure the previous material is left untouched.
    pub fn regenerate(&mut self) -> Result<()> {
        self.regenerate_with(&OsRandom)
    }

    /// Like [`Key::regenerate`], drawing bytes from `rng`.
    pub fn regenerate_with<R: RandomSource + ?Sized>(&mut self, rng: &R) -> Result<()> {
        let mut fresh = [0u8; KEY_LEN];
        let filled = rng.fill_bytes(&mut fresh);
        if filled.is_ok() {
            self.bytes.copy_from_slice(&fresh);
        }
        fresh.zeroize();
        filled
    }

    /// The raw key bytes, for handing to a lower-level primitive.
    ///
    /// Avoid logging or persisting the returned value.
    pub fn bytes(&self) -> [u8; KEY_LEN] {
        self.bytes
    }

    /// Lowercase hex of the key, for diagnostics only.
    ///
    /// This is not a storage format and must never be written out or sent.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Encrypt `plaintext` and return the envelope text.
    ///
    /// Input that is already an envelope is returned unchanged, so values
    /// passed through several times are never double-wrapped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomSource`] if no nonce could be generated.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.encrypt_with(&OsRandom, plaintext)
    }

    /// Like [`Key::encrypt`], drawing the nonce from `rng`.
    pub fn encrypt_with<R: RandomSource + ?Sized>(
        &self,
        rng: &R,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        if is_envelope(plaintext) {
            debug!(len = plaintext.len(), "input already sealed; passing through");
            return Ok(plaintext.to_vec());
        }
        Ok(self.seal_with(rng, plaintext)?.dump())
    }

    /// Parse `data` as an envelope and decrypt it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if `data` is not a valid envelope or
    /// carries an unknown schema version, and [`Error::Decryption`] if
    /// authentication fails.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let envelope = Envelope::load(data).map_err(|e| {
            debug!(error = %e, "rejected envelope");
            Error::InvalidFormat(e)
        })?;
        self.open(&envelope)
    }

    /// Seal `plaintext` under a fresh nonce without rendering it to text.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Envelope> {
        self.seal_with(&OsRandom, plaintext)
    }

    /// Like [`Key::seal`], drawing the nonce from `rng`.
    pub fn seal_with<R: RandomSource + ?Sized>(
        &self,
        rng: &R,
        plaintext: &[u8],
    ) -> Result<Envelope> {
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce)?;

        let ciphertext = self
            .cipher()
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|_| Error::Seal)?;

        Ok(Envelope {
            schema_version: SCHEMA_VERSION,
            nonce,
            ciphertext,
        })
    }

    /// Authenticate and decrypt a parsed envelope.
    ///
    /// Rejects any version other than [`SCHEMA_VERSION`] before the AEAD runs.
    pub fn open(&self, envelope: &Envelope) -> Result<Vec<u8>> {
        if envelope.schema_version != SCHEMA_VERSION {
            debug!(
                version = envelope.schema_version,
                "rejected unsupported schema version"
            );
            return Err(FormatError::UnsupportedVersion(envelope.schema_version).into());
        }
        self.cipher()
            .decrypt(
                GenericArray::from_slice(&envelope.nonce),
                envelope.ciphertext.as_slice(),
            )
            .map_err(|_| Error::Decryption)
    }

    fn cipher(&self) -> XSalsa20Poly1305 {
        XSalsa20Poly1305::new(GenericArray::from_slice(&self.bytes))
    }
}

impl From<[u8; KEY_LEN]> for Key {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time over the full length.
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for Key {}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("Key([REDACTED])")
    }
}

/// Generate a new random key.
pub fn generate_key() -> Result<Key> {
    Key::generate()
}

/// Encrypt `plaintext` under `key`. See [`Key::encrypt`].
pub fn encrypt(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
    key.encrypt(plaintext)
}

/// Decrypt envelope text under `key`. See [`Key::decrypt`].
pub fn decrypt(key: &Key, data: &[u8]) -> Result<Vec<u8>> {
    key.decrypt(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::MockRandomSource;

    fn entropy_failure() -> MockRandomSource {
        let mut rng = MockRandomSource::new();
        rng.expect_fill_bytes()
            .returning(|_| Err(Error::RandomSource("entropy pool exhausted".into())));
        rng
    }

    #[test]
    fn generated_keys_differ() {
        let k1 = Key::generate().unwrap();
        let k2 = Key::generate().unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn regenerate_overwrites_material() {
        let mut key = Key::from([0u8; KEY_LEN]);
        key.regenerate().unwrap();
        assert_ne!(key.bytes(), [0u8; KEY_LEN]);
    }

    #[test]
    fn regenerate_failure_keeps_previous_material() {
        let mut key = Key::from([9u8; KEY_LEN]);
        let err = key.regenerate_with(&entropy_failure()).unwrap_err();
        assert!(matches!(err, Error::RandomSource(_)));
        assert_eq!(key.bytes(), [9u8; KEY_LEN]);
    }

    #[test]
    fn generate_surfaces_random_source_error() {
        let err = Key::generate_with(&entropy_failure()).unwrap_err();
        assert!(matches!(err, Error::RandomSource(_)));
    }

    #[test]
    fn encrypt_surfaces_random_source_error() {
        let key = Key::from([1u8; KEY_LEN]);
        let err = key.encrypt_with(&entropy_failure(), b"x").unwrap_err();
        assert!(matches!(err, Error::RandomSource(_)));
    }

    #[test]
    fn passthrough_does_not_touch_random_source() {
        let key = Key::from([1u8; KEY_LEN]);
        let sealed = key.encrypt(b"value").unwrap();
        let mut rng = MockRandomSource::new();
        rng.expect_fill_bytes().never();
        assert_eq!(key.encrypt_with(&rng, &sealed).unwrap(), sealed);
    }

    #[test]
    fn hello_world_round_trip() {
        let key = generate_key().unwrap();
        let sealed = encrypt(&key, b"hello, world!").unwrap();

        let text = std::str::from_utf8(&sealed).unwrap();
        assert!(text.starts_with("EV[1:"));
        assert_eq!(text.split(':').nth(1).unwrap().len(), 32);
        assert!(is_envelope(&sealed));

        assert_eq!(decrypt(&key, &sealed).unwrap(), b"hello, world!");
    }

    #[test]
    fn empty_plaintext_round_trip() {
        let key = Key::generate().unwrap();
        let sealed = key.encrypt(b"").unwrap();
        assert_eq!(key.decrypt(&sealed).unwrap(), b"");
    }

    #[test]
    fn fixed_nonce_is_deterministic() {
        let mut rng = MockRandomSource::new();
        rng.expect_fill_bytes().times(2).returning(|dest| {
            dest.fill(0x24);
            Ok(())
        });
        let key = Key::from([3u8; KEY_LEN]);
        let a = key.seal_with(&rng, b"same").unwrap();
        let b = key.seal_with(&rng, b"same").unwrap();
        assert_eq!(a.nonce, [0x24; NONCE_LEN]);
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let k1 = Key::generate().unwrap();
        let k2 = Key::generate().unwrap();
        let sealed = k1.encrypt(b"secret").unwrap();
        assert!(matches!(k2.decrypt(&sealed), Err(Error::Decryption)));
    }

    #[test]
    fn tampered_nonce_fails_decryption() {
        let key = Key::generate().unwrap();
        let mut env = key.seal(b"tamper me").unwrap();
        env.nonce[0] ^= 0x01;
        assert!(matches!(key.open(&env), Err(Error::Decryption)));
    }

    #[test]
    fn truncated_ciphertext_fails_decryption() {
        let key = Key::generate().unwrap();
        let mut env = key.seal(b"tamper me").unwrap();
        env.ciphertext.truncate(4);
        assert!(matches!(key.open(&env), Err(Error::Decryption)));
    }

    #[test]
    fn unknown_version_is_rejected_before_open() {
        let key = Key::generate().unwrap();
        let mut env = key.seal(b"v2 payload").unwrap();
        env.schema_version = 2;
        let err = key.decrypt(&env.dump()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidFormat(FormatError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn decrypt_rejects_plain_text() {
        let key = Key::generate().unwrap();
        assert!(matches!(
            key.decrypt(b"not an envelope"),
            Err(Error::InvalidFormat(FormatError::Malformed))
        ));
        assert!(matches!(
            key.decrypt(b"EV[1:short:Zm9v]"),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn to_hex_is_lowercase_and_full_length() {
        let key = Key::from([0xABu8; KEY_LEN]);
        assert_eq!(key.to_hex(), "ab".repeat(KEY_LEN));
    }

    #[test]
    fn key_redacted_in_debug() {
        let key = Key::from([0xFFu8; KEY_LEN]);
        let shown = format!("{key:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("255"));
        assert!(!shown.contains("ff"));
    }
}
