//! Security collaborator
//!
//! The version graph treats encryption and signing as opaque capabilities
//! behind [`SecurityProvider`]. [`LocalKeyring`] is the default provider:
//! ChaCha20-Poly1305 for payloads and Ed25519 for version signatures, with
//! the signing key kept in the repository's key directory.

use crate::error::SecurityError;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs;
use std::path::Path;
use tracing::debug;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 12;
const SIGNING_KEY_FILE: &str = "signing.key";

/// Opaque encrypt/decrypt/sign/verify capability.
///
/// Keys and IVs travel as hex strings so they can be stored with a version.
pub trait SecurityProvider: Send + Sync {
    fn generate_key(&self) -> String;
    fn generate_iv(&self) -> String;
    fn encrypt(&self, plaintext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, SecurityError>;
    fn decrypt(&self, ciphertext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, SecurityError>;
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SecurityError>;
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;
}

/// Default provider backed by a locally stored Ed25519 key.
pub struct LocalKeyring {
    signing_key: SigningKey,
}

impl LocalKeyring {
    /// Load the signing key from `key_dir`, generating and saving one if absent.
    pub fn open_or_create<P: AsRef<Path>>(key_dir: P) -> Result<Self, SecurityError> {
        let key_dir = key_dir.as_ref();
        let key_path = key_dir.join(SIGNING_KEY_FILE);

        if key_path.exists() {
            let encoded = fs::read_to_string(&key_path)?;
            let bytes = decode_fixed::<KEY_LEN>(encoded.trim())?;
            return Ok(Self {
                signing_key: SigningKey::from_bytes(&bytes),
            });
        }

        fs::create_dir_all(key_dir)?;
        let signing_key = SigningKey::generate(&mut OsRng);
        let temp_path = key_path.with_extension("key.tmp");
        fs::write(&temp_path, hex::encode(signing_key.to_bytes()))?;
        fs::rename(&temp_path, &key_path)?;
        debug!(path = %key_path.display(), "Generated new signing key");

        Ok(Self { signing_key })
    }

    /// Keyring with a fresh key that is never persisted.
    pub fn ephemeral() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Hex-encoded public half of the signing key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn decode_fixed<const N: usize>(encoded: &str) -> Result<[u8; N], SecurityError> {
    let bytes = hex::decode(encoded).map_err(|e| SecurityError::InvalidKey(e.to_string()))?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| SecurityError::InvalidKey(format!("expected {} bytes, got {}", N, bytes.len())))
}

fn cipher_for(key: &str) -> Result<ChaCha20Poly1305, SecurityError> {
    let key = decode_fixed::<KEY_LEN>(key)?;
    ChaCha20Poly1305::new_from_slice(&key).map_err(|e| SecurityError::InvalidKey(e.to_string()))
}

impl SecurityProvider for LocalKeyring {
    fn generate_key(&self) -> String {
        random_hex(KEY_LEN)
    }

    fn generate_iv(&self) -> String {
        random_hex(IV_LEN)
    }

    fn encrypt(&self, plaintext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, SecurityError> {
        let cipher = cipher_for(key)?;
        let iv = decode_fixed::<IV_LEN>(iv)?;
        cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| SecurityError::EncryptFailed)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &str, iv: &str) -> Result<Vec<u8>, SecurityError> {
        let cipher = cipher_for(key)?;
        let iv = decode_fixed::<IV_LEN>(iv)?;
        cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext)
            .map_err(|_| SecurityError::DecryptFailed)
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SecurityError> {
        Ok(self.signing_key.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(signature) => self
                .signing_key
                .verifying_key()
                .verify(data, &signature)
                .is_ok(),
            Err(_) => false,
        }
    }
}
