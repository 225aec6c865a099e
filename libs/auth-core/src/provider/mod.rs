//! Authentication provider variants.
//!
//! The provider is the one capability surface the gateway talks to: verify a
//! credential, resolve the identity behind it, look up the caller's email.
//! Which variant backs it is a startup-time decision made by [`from_config`];
//! nothing switches providers per request.

mod oauth;
mod static_;

pub use oauth::OAuthProvider;
pub use static_::StaticProvider;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::claims::AuthContext;
use crate::error::AuthError;

/// Account registry record as seen by identity resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: String,
    pub name: String,
    pub device_usernames: Vec<String>,
}

/// Lookup seam into the external account registry.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `Ok(None)` means no account owns the principal yet; that is the
    /// "first request before signup" state, not a failure. Only transport
    /// or registry faults surface as errors.
    async fn find_by_principal(
        &self,
        principal: &str,
    ) -> Result<Option<AccountRecord>, AuthError>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verify the credential and return the external principal it asserts.
    async fn authenticate(&self, token: &str) -> Result<String, AuthError>;

    /// Full pipeline: verify the credential, then resolve the internal
    /// identity. An unprovisioned principal yields a context with an empty
    /// account id.
    async fn validate(&self, token: &str) -> Result<AuthContext, AuthError>;

    /// Resolve the caller's email through the issuer's profile endpoint.
    /// Takes the original `Authorization` header value so the issuer sees
    /// the same credential the gateway did.
    async fn resolve_user_email(&self, authorization: &str) -> Result<String, AuthError>;
}

/// Startup-time provider selection.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OAuth {
        /// Issuer domain (`example.eu.auth0.com`) or full issuer URL; the
        /// issuer claim is matched against `https://{domain}/` exactly.
        domain: String,
        /// Expected audience, the platform's API identifier.
        audience: String,
        /// Key document cache lifetime.
        jwks_ttl: Duration,
    },
    /// Fixed identity, local development and tests only.
    Static {
        account_id: String,
        principal: String,
    },
}

/// Build the provider selected by configuration.
///
/// The static variant has no way to represent an unauthenticated caller, so
/// selecting it with `production = true` is a hard configuration error: the
/// process must refuse to start rather than serve with verification off.
pub fn from_config(
    config: &ProviderConfig,
    production: bool,
    directory: Arc<dyn AccountDirectory>,
) -> Result<Arc<dyn AuthProvider>, AuthError> {
    match config {
        ProviderConfig::OAuth {
            domain,
            audience,
            jwks_ttl,
        } => Ok(Arc::new(OAuthProvider::new(
            domain, audience, *jwks_ttl, directory,
        ))),
        ProviderConfig::Static { .. } if production => Err(AuthError::Config(
            "the static auth provider bypasses credential verification and cannot be selected in production"
                .into(),
        )),
        ProviderConfig::Static {
            account_id,
            principal,
        } => Ok(Arc::new(StaticProvider::new(account_id, principal))),
    }
}
