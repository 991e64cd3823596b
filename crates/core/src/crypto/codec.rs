//! Encrypted field codec.
//!
//! Wire form of an encrypted value:
//! `encrypted:<base64 ciphertext>:<base64 iv>:<base64 hmac>`
//!
//! The HMAC is computed over the ciphertext and IV with a separate key
//! and is verified in constant time before the cipher is ever invoked.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::Sha256;
use thiserror::Error;

use payrail_shared::config::EncryptionConfig;

type Aes256Ctr = Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Marker prefix identifying an encrypted serialized value.
pub const ENCRYPTED_MARKER: &str = "encrypted";

/// Size of the per-call initialization vector.
const IV_LEN: usize = 16;

/// Errors from the encrypted field codec.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// One or both process-wide secrets are missing. Callers fall back to
    /// plaintext storage; core saves are never blocked on this.
    #[error("Encryption unavailable: cipher or HMAC key not configured")]
    EncryptionUnavailable,

    /// Encryption could not be performed.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// The stored HMAC does not match the ciphertext. The value was
    /// tampered with or the keys changed.
    #[error("HMAC verification failed")]
    HmacMismatch,

    /// The stored value is malformed or could not be decrypted.
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// A stored field value: either legacy plaintext or an authenticated
/// ciphertext triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptedValue {
    /// Legacy plaintext value, used as-is.
    Plaintext(String),
    /// Encrypted value with authentication tag.
    Sealed {
        /// AES-256-CTR ciphertext.
        ciphertext: Vec<u8>,
        /// Per-call random initialization vector.
        iv: [u8; IV_LEN],
        /// HMAC-SHA256 over the ciphertext and IV.
        hmac: Vec<u8>,
    },
}

impl EncryptedValue {
    /// Returns true for the sealed (encrypted) form.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed { .. })
    }

    /// Returns true if a raw stored string carries the encrypted marker.
    #[must_use]
    pub fn is_tagged(raw: &str) -> bool {
        raw.starts_with(&format!("{ENCRYPTED_MARKER}:"))
    }
}

impl std::fmt::Display for EncryptedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plaintext(value) => write!(f, "{value}"),
            Self::Sealed {
                ciphertext,
                iv,
                hmac,
            } => write!(
                f,
                "{ENCRYPTED_MARKER}:{}:{}:{}",
                BASE64.encode(ciphertext),
                BASE64.encode(iv),
                BASE64.encode(hmac)
            ),
        }
    }
}

impl std::str::FromStr for EncryptedValue {
    type Err = CryptoError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if !Self::is_tagged(raw) {
            return Ok(Self::Plaintext(raw.to_string()));
        }

        let parts: Vec<&str> = raw.splitn(4, ':').collect();
        if parts.len() != 4 {
            return Err(CryptoError::DecryptionFailed(
                "malformed encrypted value: expected 3 segments".to_string(),
            ));
        }

        let decode = |segment: &str, what: &str| {
            BASE64.decode(segment).map_err(|e| {
                CryptoError::DecryptionFailed(format!("invalid base64 in {what}: {e}"))
            })
        };

        let ciphertext = decode(parts[1], "ciphertext")?;
        let iv_bytes = decode(parts[2], "iv")?;
        let hmac = decode(parts[3], "hmac")?;

        let iv: [u8; IV_LEN] = iv_bytes.try_into().map_err(|_| {
            CryptoError::DecryptionFailed(format!("iv must be {IV_LEN} bytes"))
        })?;

        Ok(Self::Sealed {
            ciphertext,
            iv,
            hmac,
        })
    }
}

/// Key material for the codec.
#[derive(Clone)]
struct KeyMaterial {
    cipher_key: [u8; 32],
    hmac_key: Vec<u8>,
}

/// Authenticated field encryption with graceful unavailability.
///
/// An unavailable codec (missing secrets) fails every `encrypt` with
/// [`CryptoError::EncryptionUnavailable`] and can still pass legacy
/// plaintext values through `maybe_decrypt`.
#[derive(Clone)]
pub struct FieldCodec {
    keys: Option<KeyMaterial>,
}

impl FieldCodec {
    /// Creates a codec with the given secrets.
    #[must_use]
    pub fn new(cipher_key: [u8; 32], hmac_key: Vec<u8>) -> Self {
        Self {
            keys: Some(KeyMaterial {
                cipher_key,
                hmac_key,
            }),
        }
    }

    /// Creates a codec without secrets; every `encrypt` fails.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self { keys: None }
    }

    /// Builds a codec from configuration, unavailable when either key is
    /// absent or undecodable.
    #[must_use]
    pub fn from_config(config: &EncryptionConfig) -> Self {
        match (config.cipher_key_bytes(), config.hmac_key_bytes()) {
            (Some(cipher_key), Some(hmac_key)) => Self::new(cipher_key, hmac_key),
            _ => Self::unavailable(),
        }
    }

    /// Returns true if secrets are configured.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.keys.is_some()
    }

    /// Encrypts a plaintext field value.
    ///
    /// Uses a fresh 16-byte IV from the operating system RNG per call. If
    /// strong randomness is unavailable the call fails; it never proceeds
    /// with a weak IV.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedValue, CryptoError> {
        let keys = self.keys.as_ref().ok_or(CryptoError::EncryptionUnavailable)?;

        let mut iv = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| CryptoError::EncryptionFailed(format!("os rng unavailable: {e}")))?;

        let mut ciphertext = plaintext.as_bytes().to_vec();
        let mut cipher = Aes256Ctr::new(&keys.cipher_key.into(), &iv.into());
        cipher.apply_keystream(&mut ciphertext);

        let hmac = Self::mac(&keys.hmac_key, &ciphertext, &iv)?;

        Ok(EncryptedValue::Sealed {
            ciphertext,
            iv,
            hmac,
        })
    }

    /// Decrypts a stored value.
    ///
    /// The HMAC is verified (constant time) before the cipher runs.
    /// Plaintext values are returned unchanged.
    pub fn decrypt(&self, value: &EncryptedValue) -> Result<String, CryptoError> {
        let (ciphertext, iv, hmac) = match value {
            EncryptedValue::Plaintext(plaintext) => return Ok(plaintext.clone()),
            EncryptedValue::Sealed {
                ciphertext,
                iv,
                hmac,
            } => (ciphertext, iv, hmac),
        };

        let keys = self.keys.as_ref().ok_or(CryptoError::EncryptionUnavailable)?;

        let mut mac = HmacSha256::new_from_slice(&keys.hmac_key)
            .map_err(|e| CryptoError::DecryptionFailed(format!("bad hmac key: {e}")))?;
        mac.update(ciphertext);
        mac.update(iv);
        mac.verify_slice(hmac).map_err(|_| CryptoError::HmacMismatch)?;

        let mut plaintext = ciphertext.clone();
        let mut cipher = Aes256Ctr::new(&keys.cipher_key.into(), &(*iv).into());
        cipher.apply_keystream(&mut plaintext);

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid utf-8: {e}")))
    }

    /// Decrypts a raw stored string, tolerating every failure.
    ///
    /// Untagged legacy values pass through unchanged. Any parse or
    /// decryption failure yields an empty string with the error recorded
    /// for the caller to inspect; this is called from bulk export loops
    /// that must not abort on one bad record.
    #[must_use]
    pub fn maybe_decrypt(&self, raw: &str) -> (String, Option<CryptoError>) {
        if !EncryptedValue::is_tagged(raw) {
            return (raw.to_string(), None);
        }

        let value = match raw.parse::<EncryptedValue>() {
            Ok(value) => value,
            Err(e) => return (String::new(), Some(e)),
        };

        match self.decrypt(&value) {
            Ok(plaintext) => (plaintext, None),
            Err(e) => (String::new(), Some(e)),
        }
    }

    // The tag covers ciphertext and IV so a flipped IV is caught before
    // the cipher runs, same as a flipped ciphertext byte.
    fn mac(hmac_key: &[u8], ciphertext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>, CryptoError> {
        let mut mac = HmacSha256::new_from_slice(hmac_key)
            .map_err(|e| CryptoError::EncryptionFailed(format!("bad hmac key: {e}")))?;
        mac.update(ciphertext);
        mac.update(iv);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> FieldCodec {
        FieldCodec::new([42u8; 32], b"test-hmac-key".to_vec())
    }

    #[test]
    fn test_roundtrip() {
        let codec = codec();
        let sealed = codec.encrypt("021000021").unwrap();
        assert!(sealed.is_sealed());
        assert_eq!(codec.decrypt(&sealed).unwrap(), "021000021");
    }

    #[test]
    fn test_serialized_form() {
        let codec = codec();
        let sealed = codec.encrypt("123456789").unwrap();
        let raw = sealed.to_string();
        assert!(raw.starts_with("encrypted:"));
        assert_eq!(raw.split(':').count(), 4);

        let parsed: EncryptedValue = raw.parse().unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(codec.decrypt(&parsed).unwrap(), "123456789");
    }

    #[test]
    fn test_unavailable_codec_fails_encrypt() {
        let codec = FieldCodec::unavailable();
        assert!(!codec.is_available());
        assert!(matches!(
            codec.encrypt("secret"),
            Err(CryptoError::EncryptionUnavailable)
        ));
    }

    #[test]
    fn test_plaintext_passthrough() {
        let codec = codec();
        let value = EncryptedValue::Plaintext("legacy value".to_string());
        assert_eq!(codec.decrypt(&value).unwrap(), "legacy value");
    }

    #[test]
    fn test_tampered_ciphertext_is_hmac_mismatch() {
        let codec = codec();
        let EncryptedValue::Sealed {
            mut ciphertext,
            iv,
            hmac,
        } = codec.encrypt("routing 021000021").unwrap()
        else {
            panic!("expected sealed value");
        };
        ciphertext[0] ^= 0x01;

        let tampered = EncryptedValue::Sealed {
            ciphertext,
            iv,
            hmac,
        };
        assert!(matches!(
            codec.decrypt(&tampered),
            Err(CryptoError::HmacMismatch)
        ));
    }

    #[test]
    fn test_wrong_hmac_key_is_mismatch_not_garbage() {
        let sealed = codec().encrypt("account 12345678").unwrap();
        let other = FieldCodec::new([42u8; 32], b"a different key".to_vec());
        assert!(matches!(
            other.decrypt(&sealed),
            Err(CryptoError::HmacMismatch)
        ));
    }

    #[test]
    fn test_maybe_decrypt_untagged_passthrough() {
        let (value, err) = codec().maybe_decrypt("plain account number");
        assert_eq!(value, "plain account number");
        assert!(err.is_none());
    }

    #[test]
    fn test_maybe_decrypt_malformed_yields_empty() {
        let (value, err) = codec().maybe_decrypt("encrypted:@@@:also-bad:nope");
        assert_eq!(value, "");
        assert!(matches!(err, Some(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_maybe_decrypt_success() {
        let codec = codec();
        let raw = codec.encrypt("12345678").unwrap().to_string();
        let (value, err) = codec.maybe_decrypt(&raw);
        assert_eq!(value, "12345678");
        assert!(err.is_none());
    }

    #[test]
    fn test_iv_uniqueness_per_call() {
        let codec = codec();
        let a = codec.encrypt("same plaintext").unwrap();
        let b = codec.encrypt("same plaintext").unwrap();
        // Fresh IV per call means distinct ciphertexts.
        assert_ne!(a, b);
    }

    #[test]
    fn test_truncated_iv_rejected() {
        let raw = format!("encrypted:{}:{}:{}", "YWJj", "c2hvcnQ=", "bWFj");
        assert!(matches!(
            raw.parse::<EncryptedValue>(),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }
}
