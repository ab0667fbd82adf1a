//! Password-based encryption of wallet secrets
//!
//! AES-256-GCM under a key stretched from the password with salted scrypt.
//! Ciphertexts are stored as base64 of
//! `version || log_n || salt || nonce || ciphertext+tag` so the cost
//! parameter travels with the value.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use scrypt::Params;

use crate::error::{Error, Result};

const BLOB_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 2 + SALT_LEN + NONCE_LEN;

/// scrypt N = 2^14, r = 8, p = 1
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
/// Refuse blobs asking for more than 2^20 rounds (1 GiB of memory)
const SCRYPT_MAX_LOG_N: u8 = 20;

fn cipher_for(password: &str, salt: &[u8], log_n: u8) -> Result<Aes256Gcm> {
    let params = Params::new(log_n, SCRYPT_R, SCRYPT_P, 32)
        .map_err(|e| Error::Crypto(format!("invalid scrypt parameters: {}", e)))?;

    let mut key = [0u8; 32];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key)
        .map_err(|e| Error::Crypto(format!("key derivation failed: {}", e)))?;

    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)))
}

/// Encrypt `plaintext` under `password`
pub fn encrypt_with_aes(password: &str, plaintext: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher_for(password, &salt, SCRYPT_LOG_N)?
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| Error::Crypto(format!("encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    blob.push(BLOB_VERSION);
    blob.push(SCRYPT_LOG_N);
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(general_purpose::STANDARD.encode(blob))
}

/// Decrypt a value produced by [`encrypt_with_aes`]
///
/// Fails on a wrong password, a tampered blob, or malformed encoding.
pub fn decrypt_with_aes(password: &str, encoded: &str) -> Result<String> {
    let blob = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Crypto(format!("invalid ciphertext encoding: {}", e)))?;

    if blob.len() <= HEADER_LEN {
        return Err(Error::Crypto("ciphertext too short".to_string()));
    }
    if blob[0] != BLOB_VERSION {
        return Err(Error::Crypto(format!(
            "unsupported ciphertext version {}",
            blob[0]
        )));
    }
    let log_n = blob[1];
    if log_n == 0 || log_n > SCRYPT_MAX_LOG_N {
        return Err(Error::Crypto(format!("scrypt cost 2^{} out of range", log_n)));
    }

    let (salt, rest) = blob[2..].split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let plaintext = cipher_for(password, salt, log_n)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::Crypto("decryption failed: wrong password or corrupted data".into()))?;

    String::from_utf8(plaintext)
        .map_err(|e| Error::Crypto(format!("decrypted value is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypt_recovers_plaintext() {
        let secret = "CAISIHq8zVgY1dB0mPrivateKeyBase64==";
        let sealed = encrypt_with_aes("hunter2", secret).unwrap();
        assert_ne!(sealed, secret);
        assert_eq!(decrypt_with_aes("hunter2", &sealed).unwrap(), secret);
    }

    #[test]
    fn test_repeated_encryption_always_decrypts() {
        let a = encrypt_with_aes("pw", "same plaintext").unwrap();
        let b = encrypt_with_aes("pw", "same plaintext").unwrap();
        assert_eq!(decrypt_with_aes("pw", &a).unwrap(), "same plaintext");
        assert_eq!(decrypt_with_aes("pw", &b).unwrap(), "same plaintext");
    }

    #[test]
    fn test_wrong_password_fails() {
        let sealed = encrypt_with_aes("correct horse", "mnemonic words").unwrap();
        assert!(matches!(
            decrypt_with_aes("battery staple", &sealed),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let sealed = encrypt_with_aes("pw", "payload").unwrap();
        let mut blob = general_purpose::STANDARD.decode(&sealed).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        let tampered = general_purpose::STANDARD.encode(blob);
        assert!(decrypt_with_aes("pw", &tampered).is_err());
    }

    #[test]
    fn test_same_input_gets_fresh_salt() {
        let a = general_purpose::STANDARD
            .decode(encrypt_with_aes("pw", "same plaintext").unwrap())
            .unwrap();
        let b = general_purpose::STANDARD
            .decode(encrypt_with_aes("pw", "same plaintext").unwrap())
            .unwrap();
        assert_eq!(a[0], BLOB_VERSION);
        assert_eq!(a[1], SCRYPT_LOG_N);
        assert_ne!(a[2..2 + SALT_LEN], b[2..2 + SALT_LEN]);
    }

    #[test]
    fn test_excessive_cost_is_refused() {
        let sealed = encrypt_with_aes("pw", "payload").unwrap();
        let mut blob = general_purpose::STANDARD.decode(&sealed).unwrap();
        blob[1] = 40;
        let inflated = general_purpose::STANDARD.encode(blob);
        assert!(matches!(
            decrypt_with_aes("pw", &inflated),
            Err(Error::Crypto(ref m)) if m.contains("out of range")
        ));
    }

    #[test]
    fn test_malformed_input_fails() {
        assert!(decrypt_with_aes("pw", "").is_err());
        assert!(decrypt_with_aes("pw", "!!not base64!!").is_err());
        assert!(decrypt_with_aes("pw", "AAAA").is_err());
    }
}
