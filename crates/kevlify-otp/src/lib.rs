//! # Kevlify – OTP engine
//!
//! One-time-password core for the Kevlify authenticator client:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP generation with SHA-1, SHA-256, SHA-512
//! - **Steam Guard** – 5-character alphanumeric codes for Steam accounts
//! - **otpauth:// URIs** – Parsing & generation per the Google Authenticator key-URI format
//! - **Refresh loop** – One independent once-per-second task per displayed
//!   account, publishing `CodeState` until torn down
//!
//! Bad secrets never panic out of the engine: they degrade to the `ERROR`
//! code state and the refresh loop keeps running.

pub mod otp;
