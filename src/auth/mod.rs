//! Authentication module
//!
//! Supports: static bearer tokens and login sessions
//!
//! The `Authenticator` applies credentials to outgoing catalog requests and
//! caches the session token obtained from a login endpoint so that one
//! login serves the whole process lifetime.

mod authenticator;
mod types;

pub use authenticator::{extract_pointer, Authenticator};
pub use types::{AuthConfig, CachedToken};

#[cfg(test)]
mod tests;
