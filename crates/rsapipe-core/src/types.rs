use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a cipher pipe transforms its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Plaintext in, ciphertext out (public key)
    Encrypt,
    /// Ciphertext in, plaintext out (private key)
    Decrypt,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encrypt => f.write_str("encryption"),
            Direction::Decrypt => f.write_str("decryption"),
        }
    }
}
