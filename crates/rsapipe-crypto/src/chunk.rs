//! Per-chunk RSA-OAEP transforms
//!
//! Padding: OAEP with SHA-512 as both the label digest and the MGF1 hash, empty
//! label. For a modulus of `k` bytes:
//! ```text
//! encrypt: [≤ k - 2*64 - 2 bytes plaintext] → [k bytes]
//! decrypt: [k bytes]                        → [≤ k - 2*64 - 2 bytes plaintext]
//! ```
//! OAEP always emits a full `k`-byte block, even for a short final chunk, which
//! is what lets decryption walk the ciphertext with a fixed stride.

use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha512;

use crate::DIGEST_SIZE;
use rsapipe_core::{Direction, RsapipeError, RsapipeResult};

/// One direction of the chunk cipher.
///
/// `chunk_size` is the input stride; `transform` maps one input chunk to its
/// output. Implementations hold only read-only key material, so chunks may be
/// transformed from several threads at once.
pub trait ChunkTransformer: Sync {
    fn direction(&self) -> Direction;

    fn chunk_size(&self) -> usize;

    fn transform(&self, index: usize, chunk: &[u8]) -> RsapipeResult<Vec<u8>>;
}

/// Largest plaintext chunk OAEP-SHA512 can seal under a `modulus_size`-byte key.
///
/// Zero when the key is too small to carry any payload.
pub fn max_plaintext_chunk(modulus_size: usize) -> usize {
    modulus_size.saturating_sub(2 * DIGEST_SIZE + 2)
}

fn oaep() -> Oaep {
    Oaep::new::<Sha512>()
}

/// Seals plaintext chunks with the public key.
pub struct OaepEncryptor<'k> {
    key: &'k RsaPublicKey,
}

impl<'k> OaepEncryptor<'k> {
    pub fn new(key: &'k RsaPublicKey) -> Self {
        Self { key }
    }
}

impl ChunkTransformer for OaepEncryptor<'_> {
    fn direction(&self) -> Direction {
        Direction::Encrypt
    }

    fn chunk_size(&self) -> usize {
        max_plaintext_chunk(self.key.size())
    }

    fn transform(&self, index: usize, chunk: &[u8]) -> RsapipeResult<Vec<u8>> {
        self.key
            .encrypt(&mut rand::thread_rng(), oaep(), chunk)
            .map_err(|e| RsapipeError::ChunkTransform {
                direction: Direction::Encrypt,
                index,
                reason: e.to_string(),
            })
    }
}

/// Opens ciphertext blocks with the private key.
pub struct OaepDecryptor<'k> {
    key: &'k RsaPrivateKey,
}

impl<'k> OaepDecryptor<'k> {
    pub fn new(key: &'k RsaPrivateKey) -> Self {
        Self { key }
    }
}

impl ChunkTransformer for OaepDecryptor<'_> {
    fn direction(&self) -> Direction {
        Direction::Decrypt
    }

    fn chunk_size(&self) -> usize {
        self.key.size()
    }

    fn transform(&self, index: usize, chunk: &[u8]) -> RsapipeResult<Vec<u8>> {
        self.key
            .decrypt_blinded(&mut rand::thread_rng(), oaep(), chunk)
            .map_err(|e| RsapipeError::ChunkTransform {
                direction: Direction::Decrypt,
                index,
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;
    use sha2::Digest;

    fn fixture_key() -> KeyPair {
        KeyPair::parse(include_bytes!("../tests/fixtures/rsa2048.pem"), b"").unwrap()
    }

    #[test]
    fn test_digest_size_is_sha512() {
        assert_eq!(DIGEST_SIZE, <Sha512 as Digest>::output_size());
    }

    #[test]
    fn test_max_plaintext_chunk() {
        assert_eq!(max_plaintext_chunk(512), 382);
        assert_eq!(max_plaintext_chunk(256), 126);
        assert_eq!(max_plaintext_chunk(128), 0);
    }

    #[test]
    fn test_chunk_sizes_follow_key() {
        let key = fixture_key();
        assert_eq!(OaepEncryptor::new(key.public_key()).chunk_size(), 126);
        assert_eq!(OaepDecryptor::new(key.private_key()).chunk_size(), 256);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = fixture_key();
        let enc = OaepEncryptor::new(key.public_key());
        let dec = OaepDecryptor::new(key.private_key());

        let sealed = enc.transform(0, b"hello, chunked world").unwrap();
        let opened = dec.transform(0, &sealed).unwrap();
        assert_eq!(opened, b"hello, chunked world");
    }

    #[test]
    fn test_block_is_full_modulus_even_for_short_chunk() {
        let key = fixture_key();
        let enc = OaepEncryptor::new(key.public_key());

        assert_eq!(enc.transform(0, b"x").unwrap().len(), 256);
        assert_eq!(enc.transform(0, &[0u8; 126]).unwrap().len(), 256);
    }

    #[test]
    fn test_oversized_chunk_reports_index() {
        let key = fixture_key();
        let enc = OaepEncryptor::new(key.public_key());

        let err = enc.transform(7, &[0u8; 127]).unwrap_err();
        assert_eq!(err.chunk_index(), Some(7));
    }

    #[test]
    fn test_tampered_block_reports_index() {
        let key = fixture_key();
        let enc = OaepEncryptor::new(key.public_key());
        let dec = OaepDecryptor::new(key.private_key());

        let mut sealed = enc.transform(0, b"secret data").unwrap();
        sealed[100] ^= 0xFF;

        let err = dec.transform(2, &sealed).unwrap_err();
        assert!(matches!(
            err,
            RsapipeError::ChunkTransform {
                direction: Direction::Decrypt,
                index: 2,
                ..
            }
        ));
    }
}
