use async_trait::async_trait;

use crate::claims::AuthContext;
use crate::error::AuthError;
use crate::provider::AuthProvider;

/// Fixed identity for local development and tests.
///
/// Accepts any credential unconditionally and cannot represent an
/// unauthenticated caller; `provider::from_config` refuses to select it in
/// a production environment.
pub struct StaticProvider {
    account_id: String,
    principal: String,
}

impl StaticProvider {
    pub fn new(account_id: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            principal: principal.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticProvider {
    async fn authenticate(&self, _token: &str) -> Result<String, AuthError> {
        Ok(self.principal.clone())
    }

    async fn validate(&self, _token: &str) -> Result<AuthContext, AuthError> {
        Ok(AuthContext {
            principal: self.principal.clone(),
            account_id: self.account_id.clone(),
            name: "static local account".into(),
            device_usernames: vec![self.principal.clone()],
        })
    }

    async fn resolve_user_email(&self, _authorization: &str) -> Result<String, AuthError> {
        Ok("test@example.net".into())
    }
}
