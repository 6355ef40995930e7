//! Sealing of the serialized state.
//!
//! Layout of a sealed file: `MAGIC | nonce (12 bytes) | ciphertext + tag`.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::errors::{Result, StorageError};

pub(crate) const MAGIC: &[u8; 4] = b"SKS1";
pub(crate) const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_SALT: &[u8] = b"scorekeep-state";
const KEY_INFO: &[u8] = b"scorekeep-state-key-v1";

/// Symmetric cipher keyed from the deployment secret.
pub(crate) struct StateCipher {
    cipher: ChaCha20Poly1305,
}

impl StateCipher {
    pub fn from_secret(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(StorageError::crypto("encryption secret must not be empty"));
        }
        let hk = Hkdf::<Sha256>::new(Some(KEY_SALT), secret.as_bytes());
        let mut key = [0u8; 32];
        hk.expand(KEY_INFO, &mut key)
            .map_err(|e| StorageError::crypto(format!("Key derivation failed: {}", e)))?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| StorageError::crypto(format!("Cipher creation failed: {}", e)))?;
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| StorageError::crypto(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(MAGIC);
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < MAGIC.len() + NONCE_LEN + TAG_LEN {
            return Err(StorageError::format(format!(
                "file too short ({} bytes)",
                sealed.len()
            )));
        }
        let (magic, rest) = sealed.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(StorageError::format("unrecognized header"));
        }
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| StorageError::crypto(format!("Decryption failed: {}", e)))
    }
}
