//! Core types for the Kevlify OTP engine.

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Sentinel the server stores when it could not decrypt a secret at rest.
/// Treated as an undecodable secret, never as base-32 input.
pub const DECRYPT_FAILED_SENTINEL: &str = "ERROR_DECRYPTING";

/// Below this remaining fraction the code display switches to its
/// "about to expire" treatment. Visual signal only, not a gate.
pub const LOW_WATER_FRACTION: f64 = 0.2;

/// Code string shown when a secret cannot produce a code.
pub const ERROR_CODE: &str = "ERROR";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
///
/// Serialises as the wire's numeric code (`0` = SHA-1, `1` = SHA-256,
/// `2` = SHA-512), matching the server's `accounts.algorithm` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha512 => write!(f, "SHA512"),
        }
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Sha1),
            1 => Ok(Self::Sha256),
            2 => Ok(Self::Sha512),
            other => Err(format!("Unknown algorithm code: {}", other)),
        }
    }
}

impl From<Algorithm> for u8 {
    fn from(algo: Algorithm) -> u8 {
        match algo {
            Algorithm::Sha1 => 0,
            Algorithm::Sha256 => 1,
            Algorithm::Sha512 => 2,
        }
    }
}

impl Algorithm {
    /// Parse from a case-insensitive string.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SHA1" | "SHA-1" => Some(Self::Sha1),
            "SHA256" | "SHA-256" => Some(Self::Sha256),
            "SHA512" | "SHA-512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// URI-safe name for `otpauth://` parameters.
    pub fn uri_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP kind
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Counter-based, time-based, or Steam Guard.
///
/// Serialises as the wire's numeric code (`1` = HOTP, `2` = TOTP,
/// `4` = Steam), matching the server's `accounts.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OtpKind {
    Hotp,
    Totp,
    Steam,
}

impl Default for OtpKind {
    fn default() -> Self {
        Self::Totp
    }
}

impl fmt::Display for OtpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hotp => write!(f, "hotp"),
            Self::Totp => write!(f, "totp"),
            Self::Steam => write!(f, "steam"),
        }
    }
}

impl TryFrom<u8> for OtpKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Hotp),
            2 => Ok(Self::Totp),
            4 => Ok(Self::Steam),
            other => Err(format!("Unknown account type code: {}", other)),
        }
    }
}

impl From<OtpKind> for u8 {
    fn from(kind: OtpKind) -> u8 {
        match kind {
            OtpKind::Hotp => 1,
            OtpKind::Totp => 2,
            OtpKind::Steam => 4,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Account
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An OTP credential as the server returns it.
///
/// The engine reads this record immutably; in particular the HOTP
/// `counter` is read-only input — advancing and persisting it is a
/// server-side concern without a defined contract yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Server-assigned identifier.
    pub id: i64,
    /// Issuer (e.g. "GitHub", "Google").
    pub issuer: String,
    /// Account label shown under the issuer (e.g. "user@example.com").
    #[serde(default)]
    pub username: Option<String>,
    /// Base-32 secret, or the `ERROR_DECRYPTING` sentinel.
    #[serde(rename = "secret_encrypted")]
    pub secret: String,
    /// TOTP / HOTP / Steam.
    #[serde(rename = "type", default)]
    pub kind: OtpKind,
    /// HMAC hash algorithm.
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Number of digits in the generated code (6–8).
    #[serde(default = "default_digits")]
    pub digits: u8,
    /// Time period in seconds (TOTP/Steam).
    #[serde(default = "default_period")]
    pub period: u32,
    /// Counter value (HOTP).
    #[serde(default)]
    pub counter: u64,
    /// User-chosen icon URL or identifier.
    #[serde(default)]
    pub icon: Option<String>,
    /// Category this account belongs to.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Sort-order index.
    #[serde(default)]
    pub ranking: i32,
}

fn default_digits() -> u8 {
    6
}

fn default_period() -> u32 {
    30
}

impl Account {
    /// Create a minimal TOTP account with defaults.
    pub fn new(issuer: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: 0,
            issuer: issuer.into(),
            username: None,
            secret: secret.into(),
            kind: OtpKind::Totp,
            algorithm: Algorithm::default(),
            digits: 6,
            period: 30,
            counter: 0,
            icon: None,
            category_id: None,
            ranking: 0,
        }
    }

    /// Builder: set username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Builder: set algorithm.
    pub fn with_algorithm(mut self, algo: Algorithm) -> Self {
        self.algorithm = algo;
        self
    }

    /// Builder: set digit count.
    pub fn with_digits(mut self, digits: u8) -> Self {
        self.digits = digits;
        self
    }

    /// Builder: set time period.
    pub fn with_period(mut self, period: u32) -> Self {
        self.period = period;
        self
    }

    /// Builder: mark as HOTP.
    pub fn as_hotp(mut self, counter: u64) -> Self {
        self.kind = OtpKind::Hotp;
        self.counter = counter;
        self
    }

    /// Builder: mark as Steam Guard.
    pub fn as_steam(mut self) -> Self {
        self.kind = OtpKind::Steam;
        self
    }

    /// Builder: set category.
    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    /// Normalise the secret (uppercase, no spaces/dashes).
    pub fn normalised_secret(&self) -> String {
        self.secret.replace(' ', "").replace('-', "").to_uppercase()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Category
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A category for organising accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Server-assigned text identifier.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ranking: i32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Account draft (otpauth:// ingestion)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fields for a new account, as parsed from an `otpauth://` URI or an
/// add-account form. Serialises with the create-account wire names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDraft {
    pub issuer: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "secret_encrypted")]
    pub secret: String,
    #[serde(rename = "type", default)]
    pub kind: OtpKind,
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default = "default_digits")]
    pub digits: u8,
    #[serde(default = "default_period")]
    pub period: u32,
    #[serde(default)]
    pub counter: u64,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
}

impl AccountDraft {
    /// Draft with TOTP defaults.
    pub fn new(issuer: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            username: None,
            secret: secret.into(),
            kind: OtpKind::Totp,
            algorithm: Algorithm::default(),
            digits: 6,
            period: 30,
            counter: 0,
            icon: None,
            category_id: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated code
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated OTP code with the timing info the display needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpCode {
    /// The code string (e.g. "123456", or "BQV5W" for Steam).
    pub code: String,
    /// Seconds until the code expires (0 for HOTP).
    pub remaining_seconds: u32,
    /// Total period in seconds (0 for HOTP).
    pub period: u32,
    /// Remaining validity as a fraction: 1.0 at a fresh period boundary,
    /// approaching 0.0 just before expiry.
    pub remaining_fraction: f64,
    /// The time step (TOTP/Steam) or counter (HOTP) used.
    pub counter: u64,
}

impl OtpCode {
    /// Remaining validity as a percentage for a depleting progress bar.
    pub fn remaining_percent(&self) -> f64 {
        self.remaining_fraction * 100.0
    }

    /// Whether the code is in its "about to expire" window.
    pub fn is_low(&self) -> bool {
        self.remaining_fraction < LOW_WATER_FRACTION
    }

    /// Code with a space in the middle (e.g. "123 456").
    pub fn display(&self) -> String {
        if self.code.len() <= 4 {
            return self.code.clone();
        }
        let mid = self.code.len() / 2;
        format!("{} {}", &self.code[..mid], &self.code[mid..])
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What the display shows for one account: a valid code cycling every
/// second, or the `ERROR` sentinel for an unusable secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CodeState {
    Valid(OtpCode),
    Error,
}

impl CodeState {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// The string to render: the formatted code, or `ERROR`.
    pub fn display(&self) -> String {
        match self {
            Self::Valid(code) => code.display(),
            Self::Error => ERROR_CODE.to_string(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpErrorKind {
    InvalidSecret,
    InvalidUri,
    InvalidInput,
    Internal,
}

/// Crate-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpError {
    pub kind: OtpErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for OtpError {}

impl OtpError {
    pub fn new(kind: OtpErrorKind, msg: impl Into<String>) -> Self {
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

impl From<OtpError> for String {
    fn from(e: OtpError) -> String {
        e.to_string()
    }
}
