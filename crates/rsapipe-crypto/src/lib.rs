//! rsapipe-crypto: RSA key material and a chunked RSA-OAEP stream cipher
//!
//! RSA can only seal a few hundred bytes per operation, so streams are split
//! into key-size-bound chunks that are sealed independently and concatenated:
//!
//! ```text
//! plaintext ──┬─ chunk 0 (≤ k-130 bytes) ── OAEP-SHA512 ──▶ block 0 (k bytes)
//!             ├─ chunk 1                 ── OAEP-SHA512 ──▶ block 1 (k bytes)
//!             └─ ...                                         ...
//! ```
//!
//! `k` is the modulus size in bytes (512 for the 4096-bit keys generated here).
//! Decryption walks the ciphertext with a stride of `k` and reverses each block.
//!
//! Key material is stored as PKCS#1 PEM (`RSA PRIVATE KEY`), optionally sealed
//! with the legacy OpenSSL `DEK-Info` scheme under a passphrase.

pub mod armor;
pub mod chunk;
pub mod dek;
pub mod keys;
pub mod pipe;

pub use chunk::{max_plaintext_chunk, ChunkTransformer, OaepDecryptor, OaepEncryptor};
pub use dek::DekCipher;
pub use keys::KeyPair;
pub use pipe::{CipherPipe, PipeSummary};
pub use rsapipe_core::{Direction, RsapipeError, RsapipeResult};

/// Modulus size of generated keys, in bits
pub const KEY_BITS: usize = 4096;

/// Output size of SHA-512, the OAEP digest and MGF1 hash
pub const DIGEST_SIZE: usize = 64;
