//! RSA key pair lifecycle: generation, PEM encoding, PEM parsing

use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::debug;
use zeroize::Zeroizing;

use crate::armor;
use crate::dek::DekCipher;
use crate::KEY_BITS;
use rsapipe_core::{RsapipeError, RsapipeResult};

/// An RSA private key and the public key derived from it. Immutable once built.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate a new 4096-bit key pair and validate it before handing it out.
    pub fn generate() -> RsapipeResult<Self> {
        Self::generate_with_bits(KEY_BITS)
    }

    fn generate_with_bits(bits: usize) -> RsapipeResult<Self> {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| RsapipeError::KeyGeneration(e.to_string()))?;
        private
            .validate()
            .map_err(|e| RsapipeError::KeyValidation(e.to_string()))?;

        debug!(bits, "generated RSA key pair");
        Ok(Self::from_private(private))
    }

    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }

    /// Parse a PEM `RSA PRIVATE KEY` block.
    ///
    /// An empty `passphrase` means the body is plain PKCS#1 DER. Otherwise the
    /// body is decrypted per its `DEK-Info` header first; a decrypted body that
    /// does not parse is reported as a passphrase failure.
    pub fn parse(pem_bytes: &[u8], passphrase: &[u8]) -> RsapipeResult<Self> {
        let block = armor::decode(pem_bytes)?;

        let private = if passphrase.is_empty() {
            RsaPrivateKey::from_pkcs1_der(block.contents())
                .map_err(|e| RsapipeError::KeyStructureParse(e.to_string()))?
        } else {
            let der = armor::decrypt_contents(&block, passphrase)?;
            RsaPrivateKey::from_pkcs1_der(&der).map_err(|e| {
                RsapipeError::PassphraseDecryption(format!(
                    "decrypted key is not valid PKCS#1, passphrase is likely wrong: {e}"
                ))
            })?
        };

        let pair = Self::from_private(private);
        debug!(
            bits = pair.bits(),
            encrypted = armor::is_encrypted(&block),
            "parsed RSA private key"
        );
        Ok(pair)
    }

    /// Encode the private key as an unencrypted PKCS#1 PEM block (LF line endings).
    pub fn to_pem(&self) -> RsapipeResult<Zeroizing<String>> {
        let der = self
            .private
            .to_pkcs1_der()
            .map_err(|e| RsapipeError::KeyEncode(e.to_string()))?;
        Ok(armor::encode(der.as_bytes()))
    }

    /// Encode the private key as a PKCS#1 PEM block sealed under `passphrase`.
    pub fn to_encrypted_pem(
        &self,
        passphrase: &[u8],
        cipher: DekCipher,
    ) -> RsapipeResult<Zeroizing<String>> {
        if passphrase.is_empty() {
            return Err(RsapipeError::KeyEncode(
                "refusing to encrypt a key under an empty passphrase".into(),
            ));
        }
        let der = self
            .private
            .to_pkcs1_der()
            .map_err(|e| RsapipeError::KeyEncode(e.to_string()))?;
        armor::encode_encrypted(der.as_bytes(), passphrase, cipher)
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Modulus size in bytes; also the size of every OAEP block.
    pub fn size(&self) -> usize {
        self.public.size()
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.public.n().bits()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits())
            .field("private", &"[REDACTED]")
            .finish()
    }
}
