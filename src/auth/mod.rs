//! Authentication module
//!
//! Supports: Bearer token, OAuth2 username-password, client credentials and
//! refresh token flows.
//!
//! The `Authenticator` applies the configured scheme to each request and
//! caches fetched access tokens until shortly before they expire.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken};
