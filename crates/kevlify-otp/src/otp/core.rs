//! Code generation — RFC 4226 (HOTP), RFC 6238 (TOTP), and Steam Guard.
//!
//! Implements HMAC-based one-time passwords with SHA-1, SHA-256 and
//! SHA-512, time-step and remaining-validity calculation, and the
//! total `code_state_at` entry point that degrades undecodable secrets
//! to `CodeState::Error` instead of failing.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::otp::types::*;

/// Character set for Steam Guard codes.
const STEAM_ALPHABET: &[u8] = b"23456789BCDFGHJKMNPQRTVWXY";

/// Steam Guard codes are always 5 characters.
const STEAM_CODE_LEN: usize = 5;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HOTP code for raw key bytes and a counter value, zero-padded to
/// exactly `digits` characters.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8, algo: Algorithm) -> String {
    let value = truncate(&hmac_tag(key, &counter.to_be_bytes(), algo));
    // 10^10 exceeds the 31-bit truncation range, so for digits >= 10
    // the reduction is a no-op and the full value is kept.
    let code = match 10u32.checked_pow(u32::from(digits)) {
        Some(modulus) => value % modulus,
        None => value,
    };
    format!("{:0width$}", code, width = digits as usize)
}

/// Steam Guard code for raw key bytes and a counter value.
///
/// Steam repeatedly takes the truncation value modulo 26 and indexes
/// its own alphabet instead of reducing to decimal digits.
pub fn steam_raw(key: &[u8], counter: u64) -> String {
    let mut value = truncate(&hmac_tag(key, &counter.to_be_bytes(), Algorithm::Sha1));
    let radix = STEAM_ALPHABET.len() as u32;
    let mut code = String::with_capacity(STEAM_CODE_LEN);
    for _ in 0..STEAM_CODE_LEN {
        code.push(STEAM_ALPHABET[(value % radix) as usize] as char);
        value /= radix;
    }
    code
}

fn hmac_tag(key: &[u8], msg: &[u8], algo: Algorithm) -> Vec<u8> {
    fn tag<M: Mac + KeyInit>(key: &[u8], msg: &[u8]) -> Vec<u8> {
        // HMAC takes keys of any length.
        let mut mac = <M as Mac>::new_from_slice(key).expect("HMAC key");
        mac.update(msg);
        mac.finalize().into_bytes().to_vec()
    }
    match algo {
        Algorithm::Sha1 => tag::<Hmac<Sha1>>(key, msg),
        Algorithm::Sha256 => tag::<Hmac<Sha256>>(key, msg),
        Algorithm::Sha512 => tag::<Hmac<Sha512>>(key, msg),
    }
}

/// Dynamic truncation per RFC 4226 §5.3: a 31-bit value from the MAC.
fn truncate(tag: &[u8]) -> u32 {
    let offset = (tag[tag.len() - 1] & 0x0f) as usize;
    let mut word = [0u8; 4];
    word.copy_from_slice(&tag[offset..offset + 4]);
    u32::from_be_bytes(word) & 0x7fff_ffff
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HOTP / TOTP from base-32 secrets
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HOTP from a base-32 encoded secret.
pub fn generate_hotp(
    secret_b32: &str,
    counter: u64,
    digits: u8,
    algo: Algorithm,
) -> Result<String, OtpError> {
    let key = decode_secret(secret_b32)?;
    Ok(hotp_raw(&key, counter, digits, algo))
}

/// TOTP from a base-32 secret at the current time.
pub fn generate_totp(
    secret_b32: &str,
    digits: u8,
    period: u32,
    algo: Algorithm,
) -> Result<String, OtpError> {
    generate_totp_at(secret_b32, digits, period, algo, current_unix_time())
}

/// TOTP from a base-32 secret at an explicit unix timestamp.
pub fn generate_totp_at(
    secret_b32: &str,
    digits: u8,
    period: u32,
    algo: Algorithm,
    unix_seconds: u64,
) -> Result<String, OtpError> {
    generate_hotp(secret_b32, time_step_at(unix_seconds, period), digits, algo)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time-step helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Time-step counter for a unix timestamp.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds / u64::from(period)
}

/// Seconds until the current step expires (`period` exactly at a step
/// boundary, down to 1 just before the next).
pub fn seconds_remaining_at(unix_seconds: u64, period: u32) -> u32 {
    (u64::from(period) - unix_seconds % u64::from(period)) as u32
}

/// Remaining-validity fraction: 1.0 exactly at a period boundary,
/// approaching 0.0 just before the next one.
pub fn remaining_fraction_at(unix_seconds: u64, period: u32) -> f64 {
    f64::from(seconds_remaining_at(unix_seconds, period)) / f64::from(period)
}

/// Current unix timestamp in seconds.
pub fn current_unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  High-level: generate for an account
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate an `OtpCode` for an account at the current time.
pub fn generate_code(account: &Account) -> Result<OtpCode, OtpError> {
    generate_code_at(account, current_unix_time())
}

/// Generate an `OtpCode` at a specific unix timestamp.
///
/// For HOTP the account's stored `counter` is used as-is; this engine
/// never advances it.
pub fn generate_code_at(account: &Account, unix_seconds: u64) -> Result<OtpCode, OtpError> {
    // A 31-bit truncation value carries at most 9 decimal digits, so
    // anything beyond that cannot be honoured. Records arrive from the
    // wire unchecked.
    if !(1..=9).contains(&account.digits) {
        return Err(OtpError::new(
            OtpErrorKind::InvalidInput,
            "Digit count out of range",
        )
        .with_detail(format!("digits={}", account.digits)));
    }
    let key = decode_secret(&account.normalised_secret())?;
    match account.kind {
        OtpKind::Totp => {
            let step = time_step_at(unix_seconds, account.period);
            Ok(OtpCode {
                code: hotp_raw(&key, step, account.digits, account.algorithm),
                remaining_seconds: seconds_remaining_at(unix_seconds, account.period),
                period: account.period,
                remaining_fraction: remaining_fraction_at(unix_seconds, account.period),
                counter: step,
            })
        }
        OtpKind::Hotp => Ok(OtpCode {
            code: hotp_raw(&key, account.counter, account.digits, account.algorithm),
            remaining_seconds: 0,
            period: 0,
            remaining_fraction: 0.0,
            counter: account.counter,
        }),
        OtpKind::Steam => {
            let step = time_step_at(unix_seconds, account.period);
            Ok(OtpCode {
                code: steam_raw(&key, step),
                remaining_seconds: seconds_remaining_at(unix_seconds, account.period),
                period: account.period,
                remaining_fraction: remaining_fraction_at(unix_seconds, account.period),
                counter: step,
            })
        }
    }
}

/// Total version of `generate_code_at`: failures are logged and
/// collapsed into `CodeState::Error`, never propagated.
pub fn code_state_at(account: &Account, unix_seconds: u64) -> CodeState {
    match generate_code_at(account, unix_seconds) {
        Ok(code) => CodeState::Valid(code),
        Err(e) => {
            log::warn!("cannot generate code for '{}': {}", account.issuer, e);
            CodeState::Error
        }
    }
}

/// `code_state_at` with fresh wall-clock time.
pub fn code_state(account: &Account) -> CodeState {
    code_state_at(account, current_unix_time())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a base-32 secret, tolerating spaces, dashes and lowercase.
///
/// The server's `ERROR_DECRYPTING` sentinel and the empty string decode
/// to errors, not keys.
pub fn decode_secret(b32: &str) -> Result<Vec<u8>, OtpError> {
    if b32 == DECRYPT_FAILED_SENTINEL {
        return Err(OtpError::new(
            OtpErrorKind::InvalidSecret,
            "Secret could not be decrypted server-side",
        ));
    }

    // Strip separators and any existing padding, then re-pad.
    let cleaned: String = b32
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '='))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() {
        return Err(OtpError::new(OtpErrorKind::InvalidSecret, "Empty secret"));
    }

    let padded = match cleaned.len() % 8 {
        0 => cleaned.clone(),
        r => format!("{}{}", cleaned, "=".repeat(8 - r)),
    };
    base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &padded)
        .or_else(|| base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned))
        .ok_or_else(|| OtpError::new(OtpErrorKind::InvalidSecret, "Invalid base-32 secret"))
}

/// Encode raw bytes to base-32 (no padding, uppercase).
pub fn encode_secret(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, bytes)
}
