use thiserror::Error;

use crate::types::Direction;

pub type RsapipeResult<T> = Result<T, RsapipeError>;

#[derive(Debug, Error)]
pub enum RsapipeError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("generated key failed validation: {0}")]
    KeyValidation(String),

    #[error("key encoding failed: {0}")]
    KeyEncode(String),

    #[error("cannot decode key armor: {0}")]
    ArmorDecode(String),

    #[error("provided key is of wrong type: expected {expected:?}, found {found:?}")]
    ArmorTypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("cannot decrypt private key: {0}")]
    PassphraseDecryption(String),

    #[error("cannot parse private key: {0}")]
    KeyStructureParse(String),

    #[error("{direction} failed at chunk {index}: {reason}")]
    ChunkTransform {
        direction: Direction,
        index: usize,
        reason: String,
    },

    #[error("reading input stream failed: {0}")]
    StreamRead(#[source] std::io::Error),

    #[error("writing output stream failed: {0}")]
    StreamWrite(#[source] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl RsapipeError {
    /// Index of the chunk that failed, for chunk transform errors.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            RsapipeError::ChunkTransform { index, .. } => Some(*index),
            _ => None,
        }
    }
}
