use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::middleware::{Authenticated, Provisioned};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AccountInformations {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub usernames: Vec<String>,
}

/// The caller's own account.
pub async fn info(identity: Provisioned) -> HttpResponse {
    HttpResponse::Ok().json(AccountInformations {
        id: identity.account_id.clone(),
        usernames: identity.device_usernames.clone(),
    })
}

/// Provision an account for a first-time principal.
///
/// The one handler exempt from the provisioning guard: its whole purpose is
/// the authenticated-but-unprovisioned state. The account name and device
/// username come from the issuer's profile, not from the request body.
pub async fn create(
    identity: Authenticated,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    if identity.is_provisioned() {
        return Err(AppError::Conflict("account already created".into()));
    }

    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let email = state.provider.resolve_user_email(&authorization).await?;

    let account = state
        .registry
        .create_account(&email, vec![identity.principal.clone()], vec![email.clone()])
        .await
        .map_err(|e| AppError::upstream("failed to create account", e))?;

    info!(account_id = %account.id, "account provisioned");
    Ok(HttpResponse::Ok().json(AccountInformations {
        id: account.id,
        usernames: vec![email],
    }))
}
