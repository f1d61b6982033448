//! Payload encryption for cached values

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Length of the random nonce prepended to each ciphertext
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag appended by the cipher
pub const TAG_LEN: usize = 16;

/// AES-256-GCM encryptor for cache payloads.
///
/// Output layout is `nonce || ciphertext || tag`. A fresh nonce per call
/// makes encryption non-deterministic; the tag rejects tampered input.
#[derive(Clone)]
pub struct CacheEncryptor {
    cipher: Aes256Gcm,
}

impl CacheEncryptor {
    /// Derives a 256-bit key from `key` with SHA-256.
    pub fn new(key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey(
                "encryption key must not be empty".to_string(),
            ));
        }

        let digest = Sha256::digest(key.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&digest)
            .map_err(|e| CacheError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CacheError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(CacheError::Decryption(format!(
                "ciphertext too short: {} bytes",
                data.len()
            )));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CacheError::Decryption("integrity check failed".to_string()))
    }
}

impl std::fmt::Debug for CacheEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEncryptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let encryptor = CacheEncryptor::new("test-password").unwrap();
        let payload = b"{\"user\":42,\"name\":\"ada\"}";

        let encrypted = encryptor.encrypt(payload).unwrap();
        assert_ne!(&encrypted[NONCE_LEN..], payload.as_slice());
        assert_eq!(encryptor.decrypt(&encrypted).unwrap(), payload);
    }

    #[test]
    fn test_empty_payload() {
        let encryptor = CacheEncryptor::new("k").unwrap();
        let encrypted = encryptor.encrypt(b"").unwrap();

        assert_eq!(encrypted.len(), NONCE_LEN + TAG_LEN);
        assert!(encryptor.decrypt(&encrypted).unwrap().is_empty());
    }

    #[test]
    fn test_non_deterministic() {
        let encryptor = CacheEncryptor::new("k").unwrap();
        let first = encryptor.encrypt(b"same").unwrap();
        let second = encryptor.encrypt(b"same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            CacheEncryptor::new(""),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let first = CacheEncryptor::new("password1").unwrap();
        let second = CacheEncryptor::new("password2").unwrap();

        let encrypted = first.encrypt(b"secret").unwrap();
        assert!(matches!(
            second.decrypt(&encrypted),
            Err(CacheError::Decryption(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let encryptor = CacheEncryptor::new("k").unwrap();
        let mut encrypted = encryptor.encrypt(b"balance=100").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;

        assert!(matches!(
            encryptor.decrypt(&encrypted),
            Err(CacheError::Decryption(_))
        ));
    }

    #[test]
    fn test_truncated_and_garbage_input() {
        let encryptor = CacheEncryptor::new("k").unwrap();
        let encrypted = encryptor.encrypt(b"hello world").unwrap();

        for len in [0, 1, NONCE_LEN, NONCE_LEN + TAG_LEN - 1, encrypted.len() - 1] {
            assert!(encryptor.decrypt(&encrypted[..len]).is_err(), "len {}", len);
        }
        assert!(encryptor.decrypt(b"plainly not ciphertext at all!!!").is_err());
    }
}
