//! crypto/context.rs
//! Per-run key and IV generation.
//!
//! Design:
//! - Key and IV come from an injected `RngCore + CryptoRng`, never from user
//!   input. Production passes `OsRng`; tests pass a seeded or replaying RNG.
//! - `CipherContext` is move-only and consumed by the cipher stage, so one
//!   context can never drive two runs. A retry generates a new context, and
//!   with it a fresh IV.
//!
//! Security notes:
//! - All-zero keys or IVs are rejected.
//! - Secrets are zeroized on drop.

use std::fmt;

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::types::{CryptoError, IV_LEN_16, KEY_LEN_32};

/// Key and IV for exactly one encryption run.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherContext {
    key: [u8; KEY_LEN_32],
    iv: [u8; IV_LEN_16],
}

impl CipherContext {
    /// Draw a fresh key and IV from `rng`.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut ctx = Self { key: [0u8; KEY_LEN_32], iv: [0u8; IV_LEN_16] };
        rng.try_fill_bytes(&mut ctx.key).map_err(|e| CryptoError::Rng(e.to_string()))?;
        rng.try_fill_bytes(&mut ctx.iv).map_err(|e| CryptoError::Rng(e.to_string()))?;
        validate_key_material(&ctx.key, &ctx.iv)?;
        Ok(ctx)
    }

    /// Copy of the key and IV for the caller to keep for decryption. Must be
    /// taken before the context is handed to the cipher stage.
    pub fn key_material(&self) -> CipherKeyMaterial {
        CipherKeyMaterial { key: self.key, iv: self.iv }
    }

    pub(crate) fn key(&self) -> &[u8; KEY_LEN_32] {
        &self.key
    }

    pub(crate) fn iv(&self) -> &[u8; IV_LEN_16] {
        &self.iv
    }
}

impl fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherContext").finish_non_exhaustive()
    }
}

/// Exported key and IV, used to build the reverse pipeline.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherKeyMaterial {
    key: [u8; KEY_LEN_32],
    iv: [u8; IV_LEN_16],
}

impl CipherKeyMaterial {
    pub fn from_slices(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LEN_32] = key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLen { expected: KEY_LEN_32, actual: key.len() })?;
        let iv: [u8; IV_LEN_16] = iv
            .try_into()
            .map_err(|_| CryptoError::InvalidIvLen { expected: IV_LEN_16, actual: iv.len() })?;
        validate_key_material(&key, &iv)?;
        Ok(Self { key, iv })
    }

    pub fn from_hex(key_hex: &str, iv_hex: &str) -> Result<Self, CryptoError> {
        let key = hex::decode(key_hex.trim())
            .map_err(|e| CryptoError::Hex { field: "key", msg: e.to_string() })?;
        let iv = hex::decode(iv_hex.trim())
            .map_err(|e| CryptoError::Hex { field: "iv", msg: e.to_string() })?;
        Self::from_slices(&key, &iv)
    }

    pub fn key(&self) -> &[u8; KEY_LEN_32] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_LEN_16] {
        &self.iv
    }

    pub fn key_hex(&self) -> String {
        hex::encode(self.key)
    }

    pub fn iv_hex(&self) -> String {
        hex::encode(self.iv)
    }
}

impl fmt::Debug for CipherKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IVs are not secret; keys are.
        f.debug_struct("CipherKeyMaterial")
            .field("iv", &self.iv_hex())
            .finish_non_exhaustive()
    }
}

/// Summary: reject all-zero key or IV.
#[inline]
pub fn validate_key_material(key: &[u8], iv: &[u8]) -> Result<(), CryptoError> {
    if key.iter().all(|&b| b == 0) {
        return Err(CryptoError::WeakKeyMaterial("key"));
    }
    if iv.iter().all(|&b| b == 0) {
        return Err(CryptoError::WeakKeyMaterial("iv"));
    }
    Ok(())
}
