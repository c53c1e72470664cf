//! Wire envelopes and the client error type.

use std::fmt;

use serde::{Deserialize, Serialize};

use kevlify_backup::backup::BackupPayload;
use kevlify_otp::otp::{Account, Category};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Response envelopes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// The server wraps every resource in a keyed object rather than
// returning it bare.

#[derive(Debug, Deserialize)]
pub(crate) struct AccountsEnvelope {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountEnvelope {
    pub account: Account,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesEnvelope {
    pub categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryEnvelope {
    pub category: Category,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Backup import
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Body for `POST /backup/import`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportRequest<'a> {
    pub backup: &'a BackupPayload,
    pub replace_existing: bool,
}

/// What the server reports after a backup import.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportOutcome {
    /// Authenticators inserted.
    pub imported: u32,
    /// Categories present in the imported file.
    #[serde(default)]
    pub categories: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// Transport-level failure (connect, TLS, timeout).
    Http,
    /// The server answered with an error status and message.
    Api,
    /// A 2xx body that did not parse as the expected shape.
    Decode,
}

/// Structured client error: kind + message + optional HTTP status.
#[derive(Debug, Clone)]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "{} (HTTP {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::new(ClientErrorKind::Http, format!("Request failed: {}", e))
    }
}

impl From<ClientError> for String {
    fn from(e: ClientError) -> String {
        e.to_string()
    }
}
