use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::clients::{Device, SessionMetadata, SubscriptionRecord};
use crate::error::{AppError, AppResult};
use crate::middleware::Provisioned;
use crate::scope::NamespaceScope;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub connected: bool,
    pub created_at: i64,
    pub password: String,
    pub subscription_count: usize,
    pub human_status: &'static str,
}

/// Join a registry device with the live session and subscription state the
/// tenant owns.
fn device_view(
    device: Device,
    scope: &NamespaceScope<'_>,
    sessions: &[SessionMetadata],
    subscriptions: &[SubscriptionRecord],
) -> DeviceView {
    let session_ids: Vec<&str> = sessions
        .iter()
        .filter(|session| {
            scope.owns_session(&session.mount_point) && session.client_id == device.name
        })
        .map(|session| session.session_id.as_str())
        .collect();
    let connected = !session_ids.is_empty();
    let subscription_count = subscriptions
        .iter()
        .filter(|subscription| {
            scope.owns_pattern(&subscription.pattern)
                && session_ids.contains(&subscription.session_id.as_str())
        })
        .count();
    let human_status = if device.active {
        if connected {
            "online"
        } else {
            "offline"
        }
    } else {
        "disabled"
    };

    DeviceView {
        id: device.id,
        name: device.name,
        active: device.active,
        connected,
        created_at: device.created_at,
        password: device.password,
        subscription_count,
        human_status,
    }
}

pub async fn list(identity: Provisioned, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let scope = NamespaceScope::of(&identity);
    let devices = state
        .registry
        .list_devices(scope.account_id())
        .await
        .map_err(|e| AppError::upstream("failed to fetch device list", e))?;
    let sessions = state
        .sessions
        .list_sessions()
        .await
        .map_err(|e| AppError::upstream("failed to fetch connected session list", e))?;
    let subscriptions = state
        .sessions
        .list_subscriptions()
        .await
        .map_err(|e| AppError::upstream("failed to fetch subscription list", e))?;

    let out: Vec<DeviceView> = devices
        .into_iter()
        .map(|device| device_view(device, &scope, &sessions, &subscriptions))
        .collect();
    Ok(HttpResponse::Ok().json(out))
}

pub async fn get(
    identity: Provisioned,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let device_id = path.into_inner();
    let scope = NamespaceScope::of(&identity);
    let sessions = state
        .sessions
        .list_sessions()
        .await
        .map_err(|e| AppError::upstream("failed to fetch connected session list", e))?;
    let subscriptions = state
        .sessions
        .list_subscriptions()
        .await
        .map_err(|e| AppError::upstream("failed to fetch subscription list", e))?;
    let device = state
        .registry
        .get_device(scope.account_id(), &device_id)
        .await
        .map_err(|e| AppError::upstream("failed to fetch device", e))?
        .ok_or_else(|| AppError::NotFound("device not found".into()))?;

    Ok(HttpResponse::Ok().json(device_view(device, &scope, &sessions, &subscriptions)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateDeviceRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub active: bool,
}

pub async fn create(
    identity: Provisioned,
    state: web::Data<AppState>,
    body: web::Json<CreateDeviceRequest>,
) -> AppResult<HttpResponse> {
    if body.name.is_empty() {
        return Err(AppError::BadRequest("invalid device name provided".into()));
    }
    if body.password.is_empty() && body.active {
        return Err(AppError::BadRequest(
            "device password must be provided if active is set".into(),
        ));
    }

    let scope = NamespaceScope::of(&identity);
    let device = state
        .registry
        .create_device(scope.account_id(), &body.name, &body.password, body.active)
        .await
        .map_err(|e| AppError::upstream("failed to create device", e))?;

    Ok(HttpResponse::Ok().json(device_view(device, &scope, &[], &[])))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDeviceRequest {
    pub active: Option<bool>,
}

pub async fn update(
    identity: Provisioned,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateDeviceRequest>,
) -> AppResult<HttpResponse> {
    let device_id = path.into_inner();
    let scope = NamespaceScope::of(&identity);
    if let Some(active) = body.active {
        state
            .registry
            .set_device_active(scope.account_id(), &device_id, active)
            .await
            .map_err(|e| AppError::upstream("failed to update device", e))?;
    }
    Ok(HttpResponse::Ok().finish())
}

pub async fn delete(
    identity: Provisioned,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let device_id = path.into_inner();
    let scope = NamespaceScope::of(&identity);
    state
        .registry
        .delete_device(scope.account_id(), &device_id)
        .await
        .map_err(|e| AppError::upstream("failed to delete device", e))?;
    Ok(HttpResponse::Ok().finish())
}
