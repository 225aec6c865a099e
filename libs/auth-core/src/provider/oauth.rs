use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::claims::AuthContext;
use crate::error::AuthError;
use crate::jwks::JwksClient;
use crate::profile;
use crate::provider::{AccountDirectory, AuthProvider};
use crate::token::TokenVerifier;

/// OAuth-backed provider: token verification against the issuer's published
/// keys, then identity resolution through the account registry.
pub struct OAuthProvider {
    issuer: String,
    verifier: TokenVerifier,
    directory: Arc<dyn AccountDirectory>,
    http: reqwest::Client,
}

impl OAuthProvider {
    pub fn new(
        domain: &str,
        audience: &str,
        jwks_ttl: Duration,
        directory: Arc<dyn AccountDirectory>,
    ) -> Self {
        let issuer = issuer_url(domain);
        let http = reqwest::Client::new();
        let verifier = TokenVerifier::new(
            issuer.clone(),
            audience,
            JwksClient::with_http(http.clone(), jwks_ttl),
        );
        Self {
            issuer,
            verifier,
            directory,
            http,
        }
    }
}

/// Issuer URL for a configured domain. The trailing slash is part of the
/// issuer identity and is matched exactly during validation.
fn issuer_url(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        format!("{}/", domain.trim_end_matches('/'))
    } else {
        format!("https://{domain}/")
    }
}

#[async_trait]
impl AuthProvider for OAuthProvider {
    async fn authenticate(&self, token: &str) -> Result<String, AuthError> {
        Ok(self.verifier.verify(token).await?.sub)
    }

    async fn validate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = self.verifier.verify(token).await?;
        let account = self.directory.find_by_principal(&claims.sub).await?;
        Ok(match account {
            Some(account) => AuthContext {
                principal: claims.sub,
                account_id: account.id,
                name: account.name,
                device_usernames: account.device_usernames,
            },
            None => AuthContext {
                principal: claims.sub,
                ..AuthContext::default()
            },
        })
    }

    async fn resolve_user_email(&self, authorization: &str) -> Result<String, AuthError> {
        let profile = profile::fetch(&self.http, &self.issuer, authorization).await?;
        Ok(profile.email)
    }
}
