//! Typed endpoint calls layered on [`ApiClient`](crate::ApiClient).

pub mod auth;
pub mod crypto;
pub mod language;

pub use auth::*;
pub use crypto::*;
pub use language::*;
