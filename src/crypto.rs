//! At-rest encryption for the stored webhook password.
//!
//! A random AES-256-GCM key is generated on first use and kept in the local
//! store as a JWK document. Ciphertexts are `base64(iv):base64(ciphertext)`.
//! Values written by older versions were plain base64 and still decrypt.

use std::sync::Arc;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::storage::{LocalStore, StorageError, local::ENCRYPTION_KEY};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Key storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Stored key is malformed: {0}")]
    MalformedKey(String),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("Invalid ciphertext encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Decrypted value is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// JSON Web Key layout used to persist the symmetric key.
#[derive(Debug, Serialize, Deserialize)]
struct Jwk {
    kty: String,
    k: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    ext: bool,
    #[serde(default)]
    key_ops: Vec<String>,
}

impl Jwk {
    fn from_key(key: &[u8]) -> Self {
        Self {
            kty: "oct".to_string(),
            k: URL_SAFE_NO_PAD.encode(key),
            alg: Some("A256GCM".to_string()),
            ext: true,
            key_ops: vec!["encrypt".to_string(), "decrypt".to_string()],
        }
    }

    fn key_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        if self.kty != "oct" {
            return Err(CryptoError::MalformedKey(format!("unexpected kty {}", self.kty)));
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(self.k.trim_end_matches('='))
            .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::MalformedKey(format!(
                "expected {KEY_LEN} key bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

/// Encrypts and decrypts short secrets with the locally persisted key.
#[derive(Clone)]
pub struct SecretBox {
    store: LocalStore,
    cipher: Arc<OnceCell<Aes256Gcm>>,
}

impl std::fmt::Debug for SecretBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBox")
            .field("store", &self.store)
            .field("key_loaded", &self.cipher.initialized())
            .finish()
    }
}

impl SecretBox {
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            cipher: Arc::new(OnceCell::new()),
        }
    }

    async fn cipher(&self) -> Result<&Aes256Gcm, CryptoError> {
        self.cipher.get_or_try_init(|| self.load_or_create_key()).await
    }

    async fn load_or_create_key(&self) -> Result<Aes256Gcm, CryptoError> {
        if let Some(jwk) = self.store.get_json::<Jwk>(ENCRYPTION_KEY).await? {
            let bytes = jwk.key_bytes()?;
            let key = Key::<Aes256Gcm>::from_slice(&bytes);
            return Ok(Aes256Gcm::new(key));
        }

        let key = Aes256Gcm::generate_key(OsRng);
        self.store
            .set_json(ENCRYPTION_KEY, &Jwk::from_key(key.as_slice()))
            .await?;
        tracing::info!(name: "crypto.key.generated", "Generated new settings encryption key");
        Ok(Aes256Gcm::new(&key))
    }

    /// Encrypt `plaintext`. If encryption fails the plaintext is returned unchanged.
    pub async fn encrypt(&self, plaintext: &str) -> String {
        match self.try_encrypt(plaintext).await {
            Ok(sealed) => sealed,
            Err(e) => {
                tracing::error!(error = %e, "Encryption error");
                plaintext.to_string()
            }
        }
    }

    pub async fn try_encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = self.cipher().await?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Cipher(e.to_string()))?;
        Ok(format!("{}:{}", STANDARD.encode(nonce), STANDARD.encode(sealed)))
    }

    /// Decrypt a stored value, accepting the legacy base64-only format.
    ///
    /// Never fails: undecodable input yields an empty string.
    pub async fn decrypt(&self, ciphertext: &str) -> String {
        if !ciphertext.contains(':') {
            return legacy_decode(ciphertext);
        }
        match self.try_decrypt(ciphertext).await {
            Ok(plain) => plain,
            Err(e) => {
                tracing::warn!(error = %e, "Decryption error or legacy format mismatch");
                legacy_decode(ciphertext)
            }
        }
    }

    pub async fn try_decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let (iv_b64, sealed_b64) = ciphertext
            .split_once(':')
            .ok_or_else(|| CryptoError::Cipher("missing iv separator".to_string()))?;
        let iv = STANDARD.decode(iv_b64)?;
        if iv.len() != NONCE_LEN {
            return Err(CryptoError::Cipher(format!(
                "expected {NONCE_LEN}-byte iv, got {}",
                iv.len()
            )));
        }
        let sealed = STANDARD.decode(sealed_b64)?;

        let cipher = self.cipher().await?;
        let plain = cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|e| CryptoError::Cipher(e.to_string()))?;
        Ok(String::from_utf8(plain)?)
    }
}

fn legacy_decode(value: &str) -> String {
    STANDARD
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}
