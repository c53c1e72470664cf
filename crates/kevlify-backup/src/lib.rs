//! Kevlify backup engine.
//!
//! - **Payload**: plaintext backup document (authenticators + categories)
//! - **Envelope crypto**: password-based AES-256-GCM backup envelopes
//!   (PBKDF2-HMAC-SHA256, 100 000 iterations)
//! - **Legacy secrets**: the older base64(salt ‖ IV ‖ ciphertext) string
//!   cipher, plus format sniffing so both shapes decrypt transparently

pub mod backup;
