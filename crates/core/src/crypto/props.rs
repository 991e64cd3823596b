//! Property-based tests for the encrypted field codec.
//!
//! - Roundtrip identity: decrypt(encrypt(p)) == p for all plaintexts
//! - Tamper detection: any bit flip in ciphertext or IV fails HMAC
//!   verification, never decrypts successfully

use proptest::prelude::*;

use super::codec::{CryptoError, EncryptedValue, FieldCodec};

fn codec() -> FieldCodec {
    FieldCodec::new([13u8; 32], b"prop-test-hmac-key".to_vec())
}

/// Strategy for arbitrary field plaintexts, including empty and unicode.
fn plaintext() -> impl Strategy<Value = String> {
    ".{0,128}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_roundtrip_identity(p in plaintext()) {
        let codec = codec();
        let sealed = codec.encrypt(&p).unwrap();
        prop_assert_eq!(codec.decrypt(&sealed).unwrap(), p);
    }

    #[test]
    fn prop_serialized_roundtrip(p in plaintext()) {
        let codec = codec();
        let raw = codec.encrypt(&p).unwrap().to_string();
        let (value, err) = codec.maybe_decrypt(&raw);
        prop_assert!(err.is_none());
        prop_assert_eq!(value, p);
    }

    #[test]
    fn prop_ciphertext_bitflip_fails_hmac(
        p in ".{1,64}",
        byte_index in 0usize..64,
        bit in 0u8..8,
    ) {
        let codec = codec();
        let EncryptedValue::Sealed { mut ciphertext, iv, hmac } =
            codec.encrypt(&p).unwrap()
        else {
            panic!("expected sealed value");
        };

        let idx = byte_index % ciphertext.len();
        ciphertext[idx] ^= 1 << bit;

        let tampered = EncryptedValue::Sealed { ciphertext, iv, hmac };
        prop_assert!(matches!(
            codec.decrypt(&tampered),
            Err(CryptoError::HmacMismatch)
        ));
    }

    #[test]
    fn prop_iv_bitflip_fails_hmac(
        p in ".{1,64}",
        byte_index in 0usize..16,
        bit in 0u8..8,
    ) {
        let codec = codec();
        let EncryptedValue::Sealed { ciphertext, mut iv, hmac } =
            codec.encrypt(&p).unwrap()
        else {
            panic!("expected sealed value");
        };

        iv[byte_index] ^= 1 << bit;

        let tampered = EncryptedValue::Sealed { ciphertext, iv, hmac };
        prop_assert!(matches!(
            codec.decrypt(&tampered),
            Err(CryptoError::HmacMismatch)
        ));
    }
}
