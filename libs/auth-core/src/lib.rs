//! Platform authentication for Apiary services.
//!
//! This crate owns everything between an opaque bearer token and a resolved
//! tenant identity:
//!
//! - **Key resolution**: fetch and cache the issuer's published signing keys
//!   (`jwks`)
//! - **Token verification**: RS256 signature, audience, issuer and expiry
//!   checks (`token`)
//! - **Identity resolution**: map a verified principal to an internal
//!   account through the [`provider::AccountDirectory`] seam
//!
//! Only asymmetric RS256 tokens are accepted; there is no fallback to
//! symmetric algorithms. The [`provider::AuthProvider`] trait composes the
//! pieces behind one capability surface, with an OAuth-backed implementation
//! for real deployments and a static one for local development. Selection
//! happens once at startup via [`provider::from_config`], which refuses the
//! static variant in production.

pub mod claims;
pub mod error;
pub mod jwks;
pub mod profile;
pub mod provider;
pub mod token;

#[cfg(test)]
mod testkeys;

pub use claims::{AuthContext, Claims};
pub use error::{AuthError, Result};
pub use jwks::{Jwk, JwkSet, JwksClient, DEFAULT_CACHE_TTL};
pub use provider::{AccountDirectory, AccountRecord, AuthProvider, ProviderConfig};
pub use token::TokenVerifier;
