//! src/crypto/cbc.rs
//! AES-256-CBC block cipher stages with PKCS#7 padding.
//!
//! Design notes:
//! - Input is accumulated until at least one full block is available; every
//!   complete block is chained (XOR with the previous ciphertext block, the
//!   IV for the first) and encrypted.
//! - All blocks completed by one input chunk leave as one output chunk.
//! - The decrypt side always withholds the last block: it may be the padding
//!   block, which can only be validated at finalize.
//! - Chaining is inherently sequential; one stage instance serves one run.

use aes_gcm::aes::cipher::generic_array::GenericArray;
use aes_gcm::aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes_gcm::aes::{Aes256, Block};
use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::context::{CipherContext, CipherKeyMaterial};
use crate::crypto::types::BLOCK_SIZE;
use crate::stream::chunk::{Chunk, ChunkSequencer};
use crate::stream::stage::{StageLifecycle, TransformStage};
use crate::types::StageError;

/// Pad the trailing `0..BLOCK_SIZE` bytes to one full block. The pad value is
/// the pad length, so an empty tail becomes a whole block of `0x10`.
pub fn pkcs7_pad(tail: &[u8]) -> [u8; BLOCK_SIZE] {
    debug_assert!(tail.len() < BLOCK_SIZE);
    let pad = (BLOCK_SIZE - tail.len()) as u8;
    let mut block = [pad; BLOCK_SIZE];
    block[..tail.len()].copy_from_slice(tail);
    block
}

/// Length of the payload in a padded block, or `InvalidPadding`.
pub fn pkcs7_unpad_len(block: &[u8; BLOCK_SIZE]) -> Result<usize, StageError> {
    let pad = block[BLOCK_SIZE - 1];
    if pad == 0 || pad as usize > BLOCK_SIZE {
        return Err(StageError::InvalidPadding);
    }
    // Check every pad byte without an early exit.
    let mismatch = block[BLOCK_SIZE - pad as usize..]
        .iter()
        .fold(0u8, |acc, &b| acc | (b ^ pad));
    if mismatch != 0 {
        return Err(StageError::InvalidPadding);
    }
    Ok(BLOCK_SIZE - pad as usize)
}

fn cbc_encrypt_block(cipher: &Aes256, chain: &mut [u8; BLOCK_SIZE], plain: &[u8]) {
    let mut block = Block::clone_from_slice(plain);
    for (b, c) in block.iter_mut().zip(chain.iter()) {
        *b ^= c;
    }
    cipher.encrypt_block(&mut block);
    chain.copy_from_slice(&block);
}

fn cbc_decrypt_block(cipher: &Aes256, chain: &mut [u8; BLOCK_SIZE], ct: &[u8], out: &mut [u8; BLOCK_SIZE]) {
    let mut block = Block::clone_from_slice(ct);
    cipher.decrypt_block(&mut block);
    for ((o, b), c) in out.iter_mut().zip(block.iter()).zip(chain.iter()) {
        *o = b ^ c;
    }
    chain.copy_from_slice(ct);
}

/// Encrypting stage: AES-256-CBC over the chunk stream, PKCS#7 at finalize.
pub struct BlockCipherTransform {
    cipher: Aes256,
    /// Previous ciphertext block; the IV before the first block.
    chain: [u8; BLOCK_SIZE],
    /// Plaintext not yet forming a full block.
    pending: Vec<u8>,
    seq: ChunkSequencer,
    lifecycle: StageLifecycle,
}

impl BlockCipherTransform {
    /// Takes ownership of the context; key and IV do not leave the stage.
    pub fn new(ctx: CipherContext) -> Self {
        let cipher = Aes256::new(GenericArray::from_slice(ctx.key()));
        Self {
            cipher,
            chain: *ctx.iv(),
            pending: Vec::with_capacity(BLOCK_SIZE),
            seq: ChunkSequencer::new(),
            lifecycle: StageLifecycle::default(),
        }
    }

    /// Bytes buffered waiting for a full block (always `< BLOCK_SIZE` between
    /// calls).
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

impl TransformStage for BlockCipherTransform {
    fn name(&self) -> &str {
        "encrypt:aes-256-cbc"
    }

    fn process(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.ensure_active()?;
        self.pending.extend_from_slice(chunk.data());
        drop(chunk);

        let ready = self.pending.len() / BLOCK_SIZE * BLOCK_SIZE;
        if ready == 0 {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(ready);
        for plain in self.pending[..ready].chunks_exact(BLOCK_SIZE) {
            cbc_encrypt_block(&self.cipher, &mut self.chain, plain);
            out.extend_from_slice(&self.chain);
        }
        self.pending.drain(..ready);

        Ok(vec![self.seq.emit(out)])
    }

    fn finalize(&mut self) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.finalize()?;

        let mut last = pkcs7_pad(&self.pending);
        debug!(tail = self.pending.len(), pad = BLOCK_SIZE - self.pending.len(), "padding final block");
        cbc_encrypt_block(&self.cipher, &mut self.chain, &last);
        let out = self.seq.emit(self.chain.to_vec());

        last.zeroize();
        self.pending.zeroize();
        self.chain.zeroize();
        Ok(vec![out])
    }
}

/// Decrypting stage: inverse of `BlockCipherTransform`.
pub struct BlockDecipherTransform {
    cipher: Aes256,
    chain: [u8; BLOCK_SIZE],
    /// Ciphertext not yet decrypted; holds the withheld last block.
    pending: Vec<u8>,
    total_in: u64,
    seq: ChunkSequencer,
    lifecycle: StageLifecycle,
}

impl BlockDecipherTransform {
    pub fn new(material: &CipherKeyMaterial) -> Self {
        Self {
            cipher: Aes256::new(GenericArray::from_slice(material.key())),
            chain: *material.iv(),
            pending: Vec::with_capacity(2 * BLOCK_SIZE),
            total_in: 0,
            seq: ChunkSequencer::new(),
            lifecycle: StageLifecycle::default(),
        }
    }
}

impl TransformStage for BlockDecipherTransform {
    fn name(&self) -> &str {
        "decrypt:aes-256-cbc"
    }

    fn process(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.ensure_active()?;
        self.total_in += chunk.len() as u64;
        self.pending.extend_from_slice(chunk.data());
        drop(chunk);

        // Keep between 1 and BLOCK_SIZE bytes back for finalize.
        let ready = match self.pending.len() {
            0 => 0,
            n => (n - 1) / BLOCK_SIZE * BLOCK_SIZE,
        };
        if ready == 0 {
            return Ok(Vec::new());
        }

        let mut out = vec![0u8; ready];
        let mut plain = [0u8; BLOCK_SIZE];
        for (ct, dst) in self.pending[..ready]
            .chunks_exact(BLOCK_SIZE)
            .zip(out.chunks_exact_mut(BLOCK_SIZE))
        {
            cbc_decrypt_block(&self.cipher, &mut self.chain, ct, &mut plain);
            dst.copy_from_slice(&plain);
        }
        plain.zeroize();
        self.pending.drain(..ready);

        Ok(vec![self.seq.emit(out)])
    }

    fn finalize(&mut self) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.finalize()?;

        if self.pending.len() != BLOCK_SIZE {
            return Err(StageError::InvalidCiphertextLength { len: self.total_in, block: BLOCK_SIZE });
        }

        let mut plain = [0u8; BLOCK_SIZE];
        cbc_decrypt_block(&self.cipher, &mut self.chain, &self.pending, &mut plain);
        let out = pkcs7_unpad_len(&plain).map(|n| match n {
            0 => Vec::new(),
            n => vec![self.seq.emit(plain[..n].to_vec())],
        });

        plain.zeroize();
        self.pending.zeroize();
        self.chain.zeroize();
        out
    }
}
