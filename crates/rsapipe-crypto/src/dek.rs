//! Legacy OpenSSL PEM encryption (RFC 1421 `DEK-Info`)
//!
//! ```text
//! DEK-Info: AES-256-CBC,<hex IV>
//! key  = EVP_BytesToKey(MD5, passphrase, salt = IV[..8], count = 1)
//! body = CBC(key, IV, PKCS#7(der))
//! ```
//!
//! This is what `openssl rsa -traditional -aes256` writes. CBC with PKCS#7 is
//! not authenticated, so a wrong passphrase is only caught when the padding
//! happens to be invalid; callers must treat a later parse failure the same way.

use cbc::cipher::{
    block_padding::Pkcs7, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit,
};
use md5::{Digest, Md5};
use rand::RngCore;
use std::str::FromStr;
use zeroize::Zeroizing;

use rsapipe_core::{RsapipeError, RsapipeResult};

/// Bytes of the IV used as the key derivation salt
pub const SALT_SIZE: usize = 8;

/// Block ciphers accepted in a `DEK-Info` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DekCipher {
    DesCbc,
    Des3Cbc,
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl DekCipher {
    pub const ALL: [DekCipher; 5] = [
        DekCipher::DesCbc,
        DekCipher::Des3Cbc,
        DekCipher::Aes128Cbc,
        DekCipher::Aes192Cbc,
        DekCipher::Aes256Cbc,
    ];

    /// Name as written in the `DEK-Info` header
    pub fn name(self) -> &'static str {
        match self {
            DekCipher::DesCbc => "DES-CBC",
            DekCipher::Des3Cbc => "DES-EDE3-CBC",
            DekCipher::Aes128Cbc => "AES-128-CBC",
            DekCipher::Aes192Cbc => "AES-192-CBC",
            DekCipher::Aes256Cbc => "AES-256-CBC",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn key_size(self) -> usize {
        match self {
            DekCipher::DesCbc => 8,
            DekCipher::Des3Cbc => 24,
            DekCipher::Aes128Cbc => 16,
            DekCipher::Aes192Cbc => 24,
            DekCipher::Aes256Cbc => 32,
        }
    }

    /// Block size, which is also the IV size
    pub fn block_size(self) -> usize {
        match self {
            DekCipher::DesCbc | DekCipher::Des3Cbc => 8,
            _ => 16,
        }
    }
}

impl FromStr for DekCipher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|c| c.name()).collect();
            format!("unknown cipher {s:?} (expected one of: {})", known.join(", "))
        })
    }
}

/// Output of [`encrypt`]: the IV to publish in `DEK-Info` and the sealed bytes
#[derive(Debug)]
pub struct SealedBlock {
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration.
///
/// `D_0 = ""`, `D_i = MD5(D_{i-1} || passphrase || salt)`, key = `D_1 || D_2 || ...`
/// truncated to `key_size`.
pub fn derive_key(passphrase: &[u8], salt: &[u8], key_size: usize) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(Vec::with_capacity(key_size + 16));
    let mut block = Zeroizing::new(Vec::new());

    while key.len() < key_size {
        let mut hasher = Md5::new();
        hasher.update(&*block);
        hasher.update(passphrase);
        hasher.update(salt);
        let digest = hasher.finalize();

        block.clear();
        block.extend_from_slice(&digest);
        key.extend_from_slice(&block);
    }

    key.truncate(key_size);
    key
}

/// Decrypt a `DEK-Info` protected PEM body.
pub fn decrypt(
    cipher: DekCipher,
    iv: &[u8],
    passphrase: &[u8],
    data: &[u8],
) -> RsapipeResult<Zeroizing<Vec<u8>>> {
    if iv.len() != cipher.block_size() {
        return Err(RsapipeError::PassphraseDecryption(format!(
            "{} IV must be {} bytes, got {}",
            cipher.name(),
            cipher.block_size(),
            iv.len()
        )));
    }
    if data.is_empty() || data.len() % cipher.block_size() != 0 {
        return Err(RsapipeError::PassphraseDecryption(format!(
            "encrypted key length {} is not a multiple of the {}-byte block size",
            data.len(),
            cipher.block_size()
        )));
    }

    let key = derive_key(passphrase, &iv[..SALT_SIZE], cipher.key_size());
    let plaintext = match cipher {
        DekCipher::DesCbc => cbc_decrypt::<des::Des>(&key, iv, data),
        DekCipher::Des3Cbc => cbc_decrypt::<des::TdesEde3>(&key, iv, data),
        DekCipher::Aes128Cbc => cbc_decrypt::<aes::Aes128>(&key, iv, data),
        DekCipher::Aes192Cbc => cbc_decrypt::<aes::Aes192>(&key, iv, data),
        DekCipher::Aes256Cbc => cbc_decrypt::<aes::Aes256>(&key, iv, data),
    }
    .map_err(RsapipeError::PassphraseDecryption)?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt a PEM body under `passphrase` with a fresh random IV.
pub fn encrypt(cipher: DekCipher, passphrase: &[u8], data: &[u8]) -> RsapipeResult<SealedBlock> {
    let mut iv = vec![0u8; cipher.block_size()];
    rand::thread_rng().fill_bytes(&mut iv);

    let key = derive_key(passphrase, &iv[..SALT_SIZE], cipher.key_size());
    let ciphertext = match cipher {
        DekCipher::DesCbc => cbc_encrypt::<des::Des>(&key, &iv, data),
        DekCipher::Des3Cbc => cbc_encrypt::<des::TdesEde3>(&key, &iv, data),
        DekCipher::Aes128Cbc => cbc_encrypt::<aes::Aes128>(&key, &iv, data),
        DekCipher::Aes192Cbc => cbc_encrypt::<aes::Aes192>(&key, &iv, data),
        DekCipher::Aes256Cbc => cbc_encrypt::<aes::Aes256>(&key, &iv, data),
    }
    .map_err(RsapipeError::KeyEncode)?;

    Ok(SealedBlock { iv, ciphertext })
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, String>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| format!("invalid key or IV length: {e}"))?
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| "decryption password incorrect".to_string())
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, String>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    Ok(cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| format!("invalid key or IV length: {e}"))?
        .encrypt_padded_vec_mut::<Pkcs7>(data))
}
