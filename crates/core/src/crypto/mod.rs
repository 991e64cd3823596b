//! Authenticated encryption of sensitive banking fields.
//!
//! Account and routing numbers are stored encrypted at rest using
//! AES-256-CTR with an HMAC-SHA256 over the ciphertext and IV
//! (encrypt-then-MAC; the plaintext is never MACed).
//! Legacy records predating encryption remain plaintext and pass through
//! untouched.

pub mod codec;

#[cfg(test)]
mod props;

pub use codec::{CryptoError, EncryptedValue, FieldCodec, ENCRYPTED_MARKER};
