use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use auth_core::AuthError;
use serde::Serialize;
use thiserror::Error;

use crate::clients::ClientError;

pub type AppResult<T> = Result<T, AppError>;

/// Gateway-level failures. Every variant renders the platform error body
/// `{"status_code", "message", "reason"?}` with the matching HTTP status.
///
/// Authentication failures are terminal for the request; the caller must
/// re-authenticate. Collaborator failures surface as a generic 502 with the
/// detail logged server-side only.
#[derive(Debug, Error)]
pub enum AppError {
    /// No usable credential on the request.
    #[error("missing or invalid credentials")]
    CredentialMissing { reason: String },

    /// The credential failed signature or claim verification.
    #[error("missing or invalid credentials")]
    CredentialInvalid { reason: String },

    /// Authenticated, but the principal has no account yet.
    #[error("account not registered")]
    NotRegistered,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A collaborator call failed; the message is the client-safe summary.
    #[error("{0}")]
    Upstream(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::CredentialMissing { .. }
            | AppError::CredentialInvalid { .. }
            | AppError::NotRegistered => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            AppError::CredentialMissing { reason } | AppError::CredentialInvalid { reason } => {
                Some(reason)
            }
            _ => None,
        }
    }

    /// 502 with a client-safe message; the upstream detail is logged, never
    /// echoed to the client.
    pub fn upstream(message: impl Into<String>, err: ClientError) -> Self {
        let message = message.into();
        tracing::error!(error = %err, %message, "collaborator call failed");
        AppError::Upstream(message)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status_code: u16,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let message = self.to_string();
        HttpResponse::build(status).json(ErrorBody {
            status_code: status.as_u16(),
            message: &message,
            reason: self.reason(),
        })
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredential(reason) => AppError::CredentialInvalid { reason },
            AuthError::KeyNotFound { kid } => AppError::CredentialInvalid {
                reason: format!("token signed with unknown key id {kid}"),
            },
            AuthError::KeyFetch(detail) => {
                tracing::error!(%detail, "signing key resolution failed");
                AppError::Upstream("failed to resolve signing keys".into())
            }
            AuthError::Resolution(detail) => {
                tracing::error!(%detail, "account resolution failed");
                AppError::Upstream("failed to resolve account".into())
            }
            AuthError::Profile(detail) => {
                tracing::error!(%detail, "userinfo lookup failed");
                AppError::Upstream("failed to resolve user profile".into())
            }
            AuthError::Config(detail) => AppError::Config(detail),
        }
    }
}
