//! Client crate: sub-modules.

pub mod types;
pub mod api;

// Re-export top-level items for convenience.
pub use api::ApiClient;
pub use types::*;
