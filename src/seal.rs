use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305,
};
use ethers_core::{types::H256, utils::keccak256};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;

use crate::keys::SharedSecret;

/// ChaCha20-Poly1305 nonce length
pub const NONCE_LEN: usize = 12;
/// Poly1305 tag length
pub const TAG_LEN: usize = 16;

/// Sealing error
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// Payload could not be serialized
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
    /// AEAD encryption failed
    #[error("Encryption failed")]
    Encrypt,
    /// Tag mismatch, wrong key or wrong nonce
    #[error("Decryption failed")]
    Decrypt,
    /// Envelope shorter than a tag
    #[error("Envelope is {0} bytes, shorter than the authentication tag")]
    Truncated(usize),
}

/// An authenticated-encrypted payload. `ciphertext` is the AEAD output with
/// the tag appended, the form that is hashed, signed and relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    /// Serialize `payload` to JSON and seal it under a fresh random nonce
    pub fn seal<T: Serialize>(secret: &SharedSecret, payload: &T) -> Result<Self, SealError> {
        let plaintext = serde_json::to_vec(payload)?;
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        Self::seal_with_nonce(secret, nonce, &plaintext)
    }

    /// Seal raw bytes under a caller-chosen nonce. The nonce must never be
    /// reused with the same secret.
    pub fn seal_with_nonce(
        secret: &SharedSecret,
        nonce: [u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Self, SealError> {
        let cipher = ChaCha20Poly1305::new(&(*secret.as_bytes()).into());
        let ciphertext = cipher
            .encrypt(&nonce.into(), plaintext)
            .map_err(|_| SealError::Encrypt)?;
        Ok(Self { nonce, ciphertext })
    }

    /// Reassemble an envelope from its parts
    pub fn from_parts(nonce: [u8; NONCE_LEN], ciphertext: Vec<u8>) -> Result<Self, SealError> {
        if ciphertext.len() < TAG_LEN {
            return Err(SealError::Truncated(ciphertext.len()));
        }
        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt and authenticate, returning the original plaintext bytes
    pub fn open(&self, secret: &SharedSecret) -> Result<Vec<u8>, SealError> {
        let cipher = ChaCha20Poly1305::new(&(*secret.as_bytes()).into());
        cipher
            .decrypt(&self.nonce.into(), self.ciphertext.as_slice())
            .map_err(|_| SealError::Decrypt)
    }

    /// The nonce
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext with the tag appended
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// The authentication tag alone
    pub fn tag(&self) -> &[u8] {
        &self.ciphertext[self.ciphertext.len() - TAG_LEN..]
    }

    /// keccak256 over ciphertext and tag
    pub fn ciphertext_hash(&self) -> H256 {
        keccak256(&self.ciphertext).into()
    }
}
