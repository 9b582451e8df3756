//! Versioned, text-safe envelopes for encrypting values at rest.
//!
//! A [`Key`] seals arbitrary bytes with XSalsa20-Poly1305 and renders the
//! result as `EV[<version>:<nonce>:<ciphertext>]`, so the nonce and format
//! revision travel with the ciphertext and nothing else needs to be stored.
//!
//! ```
//! use evseal_core::{is_envelope, Key};
//!
//! let key = Key::generate().unwrap();
//! let sealed = key.encrypt(b"hello, world!").unwrap();
//! assert!(is_envelope(&sealed));
//! assert_eq!(key.decrypt(&sealed).unwrap(), b"hello, world!");
//! ```
//!
//! # Security invariants
//!
//! - Key material never appears in `Debug` output, logs or serialised data.
//! - Decryption failures do not say whether the key or the data was wrong.

pub mod envelope;
pub mod error;
pub mod fields;
pub mod key;
pub mod random;

#[cfg(test)]
mod proptests;

pub use envelope::{is_envelope, Envelope, SCHEMA_VERSION};
pub use error::{Error, FormatError, Result, Segment};
pub use fields::{open_fields, seal_fields};
pub use key::{decrypt, encrypt, generate_key, Key, KEY_LEN, NONCE_LEN};
pub use random::{OsRandom, RandomSource};
