//! Backup crate: sub-modules.

pub mod types;
pub mod payload;
pub mod crypto;
pub mod secret;

// Re-export top-level items for convenience.
pub use types::*;
pub use payload::*;
pub use crypto::{
    decrypt_backup, decrypt_backup_async, derive_key, encrypt_backup, encrypt_backup_async,
    BackupEnvelope,
};
pub use secret::{decrypt_string, encrypt_string, EncodedSecret};
