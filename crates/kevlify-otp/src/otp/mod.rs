//! OTP crate: sub-modules.

pub mod types;
pub mod core;
pub mod uri;
pub mod refresh;

// Re-export top-level items for convenience.
pub use types::*;
pub use refresh::CodeTicker;
