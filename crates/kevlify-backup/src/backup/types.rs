//! Error type for the backup engine.

use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What went wrong while producing or opening a backup.
///
/// `AuthenticationFailed` deliberately covers both wrong-password and
/// corrupted-ciphertext cases: GCM tag failure cannot tell them apart,
/// and the base64/length checks before it report the same kind so a
/// caller cannot probe envelope structure. Details go to the log only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupErrorKind {
    /// Serialisation or cipher failure while producing an envelope.
    EncryptionFailed,
    /// Envelope version this build does not understand.
    UnsupportedVersion,
    /// Wrong password or corrupted/truncated envelope data.
    AuthenticationFailed,
    /// Decryption succeeded but the plaintext is not a valid payload.
    MalformedPayload,
}

/// Structured backup error: kind + user-facing message + optional detail.
#[derive(Debug, Clone)]
pub struct BackupError {
    pub kind: BackupErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl BackupError {
    pub fn new(kind: BackupErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(d) => write!(f, "{} ({})", self.message, d),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BackupError {}

impl From<BackupError> for String {
    fn from(e: BackupError) -> String {
        e.to_string()
    }
}
