//! Property-based tests for the seal/open engine.
//!
//! - Anything sealed opens again to the same bytes
//! - Two seals of the same plaintext never produce the same text
//! - Already-sealed input passes through `encrypt` unchanged
//! - Any single flipped bit in the ciphertext is detected

use base64::{engine::general_purpose::STANDARD, Engine as _};
use proptest::prelude::*;

use crate::{is_envelope, Envelope, Error, Key, KEY_LEN};

fn any_key() -> impl Strategy<Value = Key> {
    any::<[u8; KEY_LEN]>().prop_map(Key::from)
}

proptest! {
    #[test]
    fn round_trip(key in any_key(), plaintext in prop::collection::vec(any::<u8>(), 0..512)) {
        let sealed = key.encrypt(&plaintext).unwrap();
        prop_assert_eq!(key.decrypt(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn sealing_is_randomised(key in any_key(), plaintext in prop::collection::vec(any::<u8>(), 0..64)) {
        let a = key.encrypt(&plaintext).unwrap();
        let b = key.encrypt(&plaintext).unwrap();
        prop_assert_ne!(&a, &b);
        prop_assert_eq!(key.decrypt(&a).unwrap(), key.decrypt(&b).unwrap());
    }

    #[test]
    fn sealed_input_is_not_rewrapped(key in any_key(), plaintext in prop::collection::vec(any::<u8>(), 0..64)) {
        let sealed = key.encrypt(&plaintext).unwrap();
        prop_assert!(is_envelope(&sealed));
        prop_assert_eq!(key.encrypt(&sealed).unwrap(), sealed);
    }

    #[test]
    fn flipped_bit_is_detected(
        key in any_key(),
        plaintext in prop::collection::vec(any::<u8>(), 1..64),
        bit in any::<prop::sample::Index>(),
    ) {
        let mut envelope = key.seal(&plaintext).unwrap();
        let i = bit.index(envelope.ciphertext.len() * 8);
        envelope.ciphertext[i / 8] ^= 1 << (i % 8);

        let text = envelope.dump();
        prop_assert!(matches!(key.decrypt(&text), Err(Error::Decryption)));
    }

    #[test]
    fn other_key_is_rejected(k1 in any_key(), k2 in any_key(), plaintext in prop::collection::vec(any::<u8>(), 1..64)) {
        prop_assume!(k1 != k2);
        let sealed = k1.encrypt(&plaintext).unwrap();
        prop_assert!(matches!(k2.decrypt(&sealed), Err(Error::Decryption)));
    }

    #[test]
    fn arbitrary_text_never_panics(input in ".{0,80}") {
        let key = Key::from([0u8; KEY_LEN]);
        let detected = is_envelope(input.as_bytes());
        match key.decrypt(input.as_bytes()) {
            Ok(_) => prop_assert!(detected),
            Err(Error::InvalidFormat(_)) | Err(Error::Decryption) => {}
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
        }
    }

    #[test]
    fn nonce_segment_is_always_32_chars(nonce in any::<[u8; 24]>(), ciphertext in prop::collection::vec(any::<u8>(), 1..32)) {
        let envelope = Envelope { schema_version: 1, nonce, ciphertext };
        let text = envelope.to_string();
        let segment = text.split(':').nth(1).unwrap();
        prop_assert_eq!(segment.len(), 32);
        prop_assert_eq!(STANDARD.decode(segment).unwrap(), nonce.to_vec());
        prop_assert_eq!(Envelope::load(text.as_bytes()).unwrap(), envelope);
    }
}
