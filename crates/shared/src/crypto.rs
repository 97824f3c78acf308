//! RSA-OAEP command payload encryption.
//!
//! Command payloads are encrypted under the target device's public key before
//! they are ever persisted; only the device holds the private key, so the
//! server stores and forwards opaque ciphertext. The scheme is RSA-OAEP with
//! SHA-256 over canonical JSON bytes, base64 transport encoding.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

/// RSA modulus size for device key pairs.
pub const KEY_BITS: usize = 2048;

/// Largest plaintext a single RSA-OAEP/SHA-256 block can carry at [`KEY_BITS`].
pub const MAX_PLAINTEXT_BYTES: usize = KEY_BITS / 8 - 2 * 32 - 2;

/// Error type for payload crypto operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Payload of {0} bytes exceeds the RSA-OAEP limit of {MAX_PLAINTEXT_BYTES}")]
    PayloadTooLarge(usize),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Ciphertext is not valid base64")]
    InvalidEncoding,

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
}

/// A freshly generated device key pair, PEM-encoded.
///
/// The private key never leaves the device; the public key is uploaded to the
/// server during activation.
#[derive(Debug, Clone)]
pub struct DeviceKeyPair {
    pub public_key_pem: String,
    pub private_key_pem: String,
}

/// Generate a new RSA key pair for a device.
pub fn generate_key_pair() -> Result<DeviceKeyPair, CryptoError> {
    let private_key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?
        .to_string();
    let public_key_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    Ok(DeviceKeyPair {
        public_key_pem,
        private_key_pem,
    })
}

/// Parse a PEM public key, verifying it is usable for payload encryption.
pub fn parse_public_key(public_key_pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Encrypt a payload under a device public key.
///
/// Returns the ciphertext as a transport-safe base64 string.
pub fn encrypt_payload(public_key_pem: &str, plaintext: &[u8]) -> Result<String, CryptoError> {
    if plaintext.len() > MAX_PLAINTEXT_BYTES {
        return Err(CryptoError::PayloadTooLarge(plaintext.len()));
    }

    let public_key = parse_public_key(public_key_pem)?;
    let ciphertext = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(STANDARD.encode(ciphertext))
}

/// Decrypt a base64 ciphertext with the device private key.
///
/// The error carries no detail on purpose; RSA decryption failures must not
/// leak which step rejected the input.
pub fn decrypt_payload(private_key_pem: &str, ciphertext_b64: &str) -> Result<Vec<u8>, CryptoError> {
    let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let ciphertext = STANDARD
        .decode(ciphertext_b64)
        .map_err(|_| CryptoError::InvalidEncoding)?;

    private_key
        .decrypt(Oaep::new::<Sha256>(), &ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}
