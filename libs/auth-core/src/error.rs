use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication and identity-resolution failures.
///
/// `KeyNotFound` and `InvalidCredential` are the caller's problem: the token
/// they presented cannot be trusted and re-authenticating is the only fix.
/// `KeyFetch`, `Resolution` and `Profile` are upstream faults the gateway
/// surfaces as a bad-gateway condition.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no signing key matches key id {kid:?}")]
    KeyNotFound { kid: String },

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("account registry unavailable: {0}")]
    Resolution(String),

    #[error("failed to resolve user profile: {0}")]
    Profile(String),

    #[error("invalid auth configuration: {0}")]
    Config(String),
}
