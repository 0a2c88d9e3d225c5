use thiserror::Error;

pub use crate::constants::{BLOCK_SIZE, IV_LEN_16, KEY_LEN_32};

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length provided to the cipher.
    #[error("invalid key length: expected={expected}, actual={actual}")]
    InvalidKeyLen { expected: usize, actual: usize },

    /// IV length mismatch (must be one block).
    #[error("invalid iv length: expected={expected}, actual={actual}")]
    InvalidIvLen { expected: usize, actual: usize },

    /// All-zero key or IV; almost certainly an uninitialised buffer.
    #[error("weak key material: {0} is all zeros")]
    WeakKeyMaterial(&'static str),

    /// The secure random source failed to produce bytes.
    #[error("random source failure: {0}")]
    Rng(String),

    #[error("invalid hex in {field}: {msg}")]
    Hex { field: &'static str, msg: String },
}
