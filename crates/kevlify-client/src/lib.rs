//! Kevlify REST client.
//!
//! Typed async client for the accounts/categories/backup HTTP API.
//! Carries the session cookie on every call; it never touches crypto —
//! encrypted `.authpro` envelopes are produced and opened locally by
//! `kevlify-backup`, only the plaintext payload shape crosses the wire.

pub mod client;
