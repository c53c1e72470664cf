//! Password-based backup envelope crypto.
//!
//! - **Key derivation**: PBKDF2-HMAC-SHA256 (100 000 iterations)
//! - **Encryption**: AES-256-GCM with random 96-bit IV
//! - **Envelope format**: JSON with base64 salt, IV, ciphertext
//!
//! Changing any of the constants below is a format break and must bump
//! [`ENVELOPE_VERSION`].

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backup::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Envelope format version this build reads and writes.
pub const ENVELOPE_VERSION: u32 = 1;
/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
/// Salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-256-GCM IV length in bytes.
pub const IV_LEN: usize = 12;
/// Derived key length in bytes (256-bit for AES-256).
pub const KEY_LEN: usize = 32;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Encrypted backup envelope, the `.authpro` file content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEnvelope {
    /// Format version (gate before any crypto on read).
    pub version: u32,
    /// Base64 ciphertext (AES-256-GCM, tag appended).
    pub encrypted: String,
    /// Base64 96-bit IV.
    pub iv: String,
    /// Base64 128-bit PBKDF2 salt.
    pub salt: String,
    /// ISO-8601 creation time.
    pub timestamp: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Key derivation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Derive an AES-256 key from a password using PBKDF2-HMAC-SHA256.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Generate a cryptographically random salt.
pub(crate) fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Generate a cryptographically random IV for AES-GCM.
pub(crate) fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AES-256-GCM encrypt / decrypt
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) fn aes_encrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, BackupError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| {
        BackupError::new(BackupErrorKind::EncryptionFailed, "Failed to encrypt backup")
            .with_detail(format!("AES init: {}", e))
    })?;
    let nonce = Nonce::from_slice(iv);
    cipher.encrypt(nonce, plaintext).map_err(|e| {
        BackupError::new(BackupErrorKind::EncryptionFailed, "Failed to encrypt backup")
            .with_detail(format!("AES encrypt: {}", e))
    })
}

pub(crate) fn aes_decrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, BackupError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| {
        BackupError::new(
            BackupErrorKind::AuthenticationFailed,
            "Incorrect password or corrupted backup file",
        )
        .with_detail(format!("AES init: {}", e))
    })?;
    let nonce = Nonce::from_slice(iv);
    cipher.decrypt(nonce, ciphertext).map_err(|_| {
        BackupError::new(
            BackupErrorKind::AuthenticationFailed,
            "Incorrect password or corrupted backup file",
        )
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Envelope-level encrypt / decrypt
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Serialize a value to JSON and seal it into a fresh envelope.
///
/// Salt and IV are drawn fresh per call, so encrypting the same value
/// twice never yields the same envelope.
pub fn encrypt_backup<T: Serialize>(value: &T, password: &str) -> Result<BackupEnvelope, BackupError> {
    let plaintext = serde_json::to_vec(value).map_err(|e| {
        BackupError::new(BackupErrorKind::EncryptionFailed, "Failed to encrypt backup")
            .with_detail(format!("JSON serialize: {}", e))
    })?;

    let salt = generate_salt();
    let iv = generate_iv();
    let key = derive_key(password, &salt);
    let ciphertext = aes_encrypt(&key, &iv, &plaintext)?;

    Ok(BackupEnvelope {
        version: ENVELOPE_VERSION,
        encrypted: BASE64.encode(ciphertext),
        iv: BASE64.encode(iv),
        salt: BASE64.encode(salt),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Open an envelope and parse the plaintext back into `T`.
///
/// Wrong password and corrupted ciphertext both come back as
/// `AuthenticationFailed`; only the log can tell them apart.
pub fn decrypt_backup<T: DeserializeOwned>(
    envelope: &BackupEnvelope,
    password: &str,
) -> Result<T, BackupError> {
    if envelope.version != ENVELOPE_VERSION {
        return Err(BackupError::new(
            BackupErrorKind::UnsupportedVersion,
            format!("Unsupported backup version {}", envelope.version),
        ));
    }

    let salt = decode_field(&envelope.salt, "salt")?;
    let iv_bytes = decode_field(&envelope.iv, "iv")?;
    let ciphertext = decode_field(&envelope.encrypted, "encrypted")?;

    if iv_bytes.len() != IV_LEN {
        log::warn!("backup envelope IV length {} != {}", iv_bytes.len(), IV_LEN);
        return Err(BackupError::new(
            BackupErrorKind::AuthenticationFailed,
            "Incorrect password or corrupted backup file",
        ));
    }
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&iv_bytes);

    let key = derive_key(password, &salt);
    let plaintext = aes_decrypt(&key, &iv, &ciphertext)?;

    serde_json::from_slice(&plaintext).map_err(|e| {
        BackupError::new(BackupErrorKind::MalformedPayload, "Invalid backup contents")
            .with_detail(format!("JSON parse: {}", e))
    })
}

fn decode_field(b64: &str, field: &str) -> Result<Vec<u8>, BackupError> {
    BASE64.decode(b64).map_err(|e| {
        log::warn!("backup envelope field '{}' is not valid base64: {}", field, e);
        BackupError::new(
            BackupErrorKind::AuthenticationFailed,
            "Incorrect password or corrupted backup file",
        )
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Async wrappers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// PBKDF2 at 100k iterations takes long enough to stall an executor
// thread, so the async entry points run the sync core on the blocking
// pool.

pub async fn encrypt_backup_async<T>(value: T, password: String) -> Result<BackupEnvelope, BackupError>
where
    T: Serialize + Send + 'static,
{
    tokio::task::spawn_blocking(move || encrypt_backup(&value, &password))
        .await
        .map_err(|e| {
            BackupError::new(BackupErrorKind::EncryptionFailed, "Failed to encrypt backup")
                .with_detail(format!("task join: {}", e))
        })?
}

pub async fn decrypt_backup_async<T>(
    envelope: BackupEnvelope,
    password: String,
) -> Result<T, BackupError>
where
    T: DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || decrypt_backup(&envelope, &password))
        .await
        .map_err(|e| {
            BackupError::new(
                BackupErrorKind::AuthenticationFailed,
                "Incorrect password or corrupted backup file",
            )
            .with_detail(format!("task join: {}", e))
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::payload::{BackupAuthenticator, BackupPayload};
    use kevlify_otp::otp::Account;

    fn sample_payload() -> BackupPayload {
        let account = Account::new("GitHub", "JBSWY3DPEHPK3PXP").with_username("alice");
        BackupPayload::new(vec![BackupAuthenticator::from_account(&account)], vec![])
    }

    // ── Round trip ───────────────────────────────────────────────

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let payload = sample_payload();
        let envelope = encrypt_backup(&payload, "hunter2!").unwrap();
        let back: BackupPayload = decrypt_backup(&envelope, "hunter2!").unwrap();
        assert_eq!(back.authenticators.len(), 1);
        assert_eq!(back.authenticators[0].issuer, "GitHub");
    }

    #[test]
    fn envelope_has_expected_shape() {
        let envelope = encrypt_backup(&sample_payload(), "pw").unwrap();
        assert_eq!(envelope.version, ENVELOPE_VERSION);
        assert_eq!(BASE64.decode(&envelope.salt).unwrap().len(), SALT_LEN);
        assert_eq!(BASE64.decode(&envelope.iv).unwrap().len(), IV_LEN);
        assert!(!envelope.encrypted.is_empty());
    }

    #[test]
    fn envelope_json_field_names() {
        let envelope = encrypt_backup(&sample_payload(), "pw").unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        for field in ["version", "encrypted", "iv", "salt", "timestamp"] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
    }

    // ── Non-determinism ──────────────────────────────────────────

    #[test]
    fn each_encryption_is_unique() {
        let payload = sample_payload();
        let e1 = encrypt_backup(&payload, "pw").unwrap();
        let e2 = encrypt_backup(&payload, "pw").unwrap();
        assert_ne!(e1.salt, e2.salt);
        assert_ne!(e1.iv, e2.iv);
        assert_ne!(e1.encrypted, e2.encrypted);
    }

    // ── Failure paths ────────────────────────────────────────────

    #[test]
    fn wrong_password_fails() {
        let envelope = encrypt_backup(&sample_payload(), "correct").unwrap();
        let result: Result<BackupPayload, _> = decrypt_backup(&envelope, "wrong");
        assert_eq!(
            result.unwrap_err().kind,
            BackupErrorKind::AuthenticationFailed
        );
    }

    #[test]
    fn unsupported_version_rejected_before_crypto() {
        let mut envelope = encrypt_backup(&sample_payload(), "pw").unwrap();
        envelope.version = 2;
        let result: Result<BackupPayload, _> = decrypt_backup(&envelope, "pw");
        assert_eq!(result.unwrap_err().kind, BackupErrorKind::UnsupportedVersion);
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let envelope = encrypt_backup(&sample_payload(), "pw").unwrap();
        let mut bytes = BASE64.decode(&envelope.encrypted).unwrap();
        bytes[0] ^= 0x01;
        let tampered = BackupEnvelope {
            encrypted: BASE64.encode(bytes),
            ..envelope
        };
        let result: Result<BackupPayload, _> = decrypt_backup(&tampered, "pw");
        assert_eq!(
            result.unwrap_err().kind,
            BackupErrorKind::AuthenticationFailed
        );
    }

    #[test]
    fn garbage_base64_fails_authentication() {
        let mut envelope = encrypt_backup(&sample_payload(), "pw").unwrap();
        envelope.salt = "@@not-base64@@".into();
        let result: Result<BackupPayload, _> = decrypt_backup(&envelope, "pw");
        assert_eq!(
            result.unwrap_err().kind,
            BackupErrorKind::AuthenticationFailed
        );
    }

    #[test]
    fn wrong_iv_length_fails_authentication() {
        let mut envelope = encrypt_backup(&sample_payload(), "pw").unwrap();
        envelope.iv = BASE64.encode([0u8; 8]);
        let result: Result<BackupPayload, _> = decrypt_backup(&envelope, "pw");
        assert_eq!(
            result.unwrap_err().kind,
            BackupErrorKind::AuthenticationFailed
        );
    }

    #[test]
    fn non_payload_plaintext_is_malformed() {
        // Valid crypto around a plaintext that is not a BackupPayload.
        let envelope = encrypt_backup(&"just a string", "pw").unwrap();
        let result: Result<BackupPayload, _> = decrypt_backup(&envelope, "pw");
        assert_eq!(result.unwrap_err().kind, BackupErrorKind::MalformedPayload);
    }

    // ── Key derivation ───────────────────────────────────────────

    #[test]
    fn derive_key_deterministic() {
        let salt = [7u8; SALT_LEN];
        assert_eq!(derive_key("password", &salt), derive_key("password", &salt));
    }

    #[test]
    fn derive_key_varies_with_inputs() {
        let salt = [7u8; SALT_LEN];
        assert_ne!(derive_key("a", &salt), derive_key("b", &salt));
        assert_ne!(
            derive_key("a", &[1u8; SALT_LEN]),
            derive_key("a", &[2u8; SALT_LEN])
        );
    }

    // ── Async wrappers ───────────────────────────────────────────

    #[tokio::test]
    async fn async_wrappers_match_sync() {
        let payload = sample_payload();
        let envelope = encrypt_backup_async(payload.clone(), "pw".into())
            .await
            .unwrap();
        let back: BackupPayload = decrypt_backup_async(envelope, "pw".into()).await.unwrap();
        assert_eq!(back.authenticators[0].issuer, "GitHub");
    }

    #[tokio::test]
    async fn async_wrong_password_fails() {
        let envelope = encrypt_backup_async(sample_payload(), "right".into())
            .await
            .unwrap();
        let result: Result<BackupPayload, _> =
            decrypt_backup_async(envelope, "wrong".into()).await;
        assert_eq!(
            result.unwrap_err().kind,
            BackupErrorKind::AuthenticationFailed
        );
    }
}
