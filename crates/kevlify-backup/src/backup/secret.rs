//! Legacy per-secret string cipher and format sniffing.
//!
//! Before the structured envelope existed, individual secrets were
//! stored as `base64(salt ‖ IV ‖ ciphertext)` with fixed offsets
//! (16-byte salt, 12-byte IV). Same KDF and cipher as the envelope.
//! [`EncodedSecret`] sniffs which of the two shapes a stored string is
//! and gives callers one decrypt entry point; new writes always use the
//! envelope.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::backup::crypto::{
    aes_decrypt, aes_encrypt, derive_key, generate_iv, generate_salt, BackupEnvelope, IV_LEN,
    SALT_LEN,
};
use crate::backup::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Legacy string cipher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Encrypt a small string in the legacy concatenated format.
pub fn encrypt_string(plaintext: &str, password: &str) -> Result<String, BackupError> {
    let salt = generate_salt();
    let iv = generate_iv();
    let key = derive_key(password, &salt);
    let ciphertext = aes_encrypt(&key, &iv, plaintext.as_bytes())?;

    let mut combined = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len());
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&iv);
    combined.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(combined))
}

/// Decrypt a legacy-format string.
pub fn decrypt_string(encoded: &str, password: &str) -> Result<String, BackupError> {
    let combined = BASE64.decode(encoded).map_err(|e| {
        log::warn!("legacy secret is not valid base64: {}", e);
        auth_failed()
    })?;

    if combined.len() <= SALT_LEN + IV_LEN {
        log::warn!("legacy secret too short: {} bytes", combined.len());
        return Err(auth_failed());
    }

    let salt = &combined[..SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&combined[SALT_LEN..SALT_LEN + IV_LEN]);
    let ciphertext = &combined[SALT_LEN + IV_LEN..];

    let key = derive_key(password, salt);
    let plaintext = aes_decrypt(&key, &iv, ciphertext)?;

    String::from_utf8(plaintext).map_err(|e| {
        log::warn!("legacy secret plaintext is not UTF-8: {}", e);
        auth_failed()
    })
}

fn auth_failed() -> BackupError {
    BackupError::new(
        BackupErrorKind::AuthenticationFailed,
        "Decryption failed - incorrect password",
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Format sniffing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A stored ciphertext in either of the two on-disk shapes.
#[derive(Debug, Clone)]
pub enum EncodedSecret {
    /// Structured JSON envelope (canonical going forward).
    Envelope(BackupEnvelope),
    /// Raw `base64(salt ‖ IV ‖ ciphertext)` string.
    Legacy(String),
}

impl EncodedSecret {
    /// Classify a stored string. An envelope is JSON with the expected
    /// fields; anything else is treated as legacy and left for the
    /// cipher to accept or reject.
    pub fn detect(stored: &str) -> Self {
        let trimmed = stored.trim_start();
        if trimmed.starts_with('{') {
            if let Ok(envelope) = serde_json::from_str::<BackupEnvelope>(stored) {
                return Self::Envelope(envelope);
            }
        }
        Self::Legacy(stored.to_string())
    }

    /// Decrypt whichever shape this is back to the plaintext string.
    pub fn decrypt(&self, password: &str) -> Result<String, BackupError> {
        match self {
            Self::Envelope(envelope) => {
                crate::backup::crypto::decrypt_backup(envelope, password)
            }
            Self::Legacy(encoded) => decrypt_string(encoded, password),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::crypto::encrypt_backup;

    // ── Legacy cipher ────────────────────────────────────────────

    #[test]
    fn legacy_roundtrip() {
        let encoded = encrypt_string("JBSWY3DPEHPK3PXP", "pw").unwrap();
        assert_eq!(decrypt_string(&encoded, "pw").unwrap(), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn legacy_wrong_password_fails() {
        let encoded = encrypt_string("secret", "right").unwrap();
        let err = decrypt_string(&encoded, "wrong").unwrap_err();
        assert_eq!(err.kind, BackupErrorKind::AuthenticationFailed);
    }

    #[test]
    fn legacy_layout_is_salt_iv_ciphertext() {
        let encoded = encrypt_string("x", "pw").unwrap();
        let combined = BASE64.decode(&encoded).unwrap();
        // 1-byte plaintext + 16-byte GCM tag after the salt and IV.
        assert_eq!(combined.len(), SALT_LEN + IV_LEN + 1 + 16);
    }

    #[test]
    fn legacy_too_short_fails() {
        let short = BASE64.encode([0u8; SALT_LEN + IV_LEN]);
        let err = decrypt_string(&short, "pw").unwrap_err();
        assert_eq!(err.kind, BackupErrorKind::AuthenticationFailed);
    }

    #[test]
    fn legacy_bad_base64_fails() {
        let err = decrypt_string("@@definitely not base64@@", "pw").unwrap_err();
        assert_eq!(err.kind, BackupErrorKind::AuthenticationFailed);
    }

    #[test]
    fn legacy_each_encryption_unique() {
        let e1 = encrypt_string("same", "pw").unwrap();
        let e2 = encrypt_string("same", "pw").unwrap();
        assert_ne!(e1, e2);
    }

    // ── Sniffing ─────────────────────────────────────────────────

    #[test]
    fn detects_envelope() {
        let envelope = encrypt_backup(&"payload", "pw").unwrap();
        let stored = serde_json::to_string(&envelope).unwrap();
        assert!(matches!(
            EncodedSecret::detect(&stored),
            EncodedSecret::Envelope(_)
        ));
    }

    #[test]
    fn detects_legacy() {
        let stored = encrypt_string("payload", "pw").unwrap();
        assert!(matches!(
            EncodedSecret::detect(&stored),
            EncodedSecret::Legacy(_)
        ));
    }

    #[test]
    fn json_without_envelope_fields_is_legacy() {
        assert!(matches!(
            EncodedSecret::detect(r#"{"foo": 1}"#),
            EncodedSecret::Legacy(_)
        ));
    }

    #[test]
    fn decrypts_either_shape() {
        let envelope = encrypt_backup(&"from-envelope", "pw").unwrap();
        let stored_env = serde_json::to_string(&envelope).unwrap();
        let stored_legacy = encrypt_string("from-legacy", "pw").unwrap();

        assert_eq!(
            EncodedSecret::detect(&stored_env).decrypt("pw").unwrap(),
            "from-envelope"
        );
        assert_eq!(
            EncodedSecret::detect(&stored_legacy).decrypt("pw").unwrap(),
            "from-legacy"
        );
    }
}
