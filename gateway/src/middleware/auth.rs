//! Request authentication middleware.
//!
//! Extracts the bearer credential, validates it through the configured
//! provider, and attaches the resolved [`AuthContext`] to the request for
//! the handlers' extractors. The context is created here once and never
//! mutated afterwards.

use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpMessage, HttpRequest, ResponseError};
use auth_core::{AuthContext, AuthProvider};
use tracing::{debug, info, warn};

use crate::error::AppError;

pub struct AuthMiddleware {
    provider: Arc<dyn AuthProvider>,
}

impl AuthMiddleware {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self { provider }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            provider: self.provider.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    provider: Arc<dyn AuthProvider>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if req.path() == "/health" {
            return Box::pin(async move {
                service.call(req).await.map(|res| res.map_into_left_body())
            });
        }

        // The graphql-ws transport cannot carry an Authorization header from
        // a browser; those connections authenticate through their
        // connection_init payload instead (see graphql::connection_init).
        if is_graphql_ws_upgrade(req.request()) {
            debug!("bypassing header auth for websocket upgrade");
            return Box::pin(async move {
                service.call(req).await.map(|res| res.map_into_left_body())
            });
        }

        let provider = self.provider.clone();
        Box::pin(async move {
            let token = match bearer_token(req.request()) {
                Ok(token) => token,
                Err(err) => return Ok(reject(req, &err)),
            };
            let identity = match provider.validate(&token).await {
                Ok(identity) => identity,
                Err(err) => {
                    let err = AppError::from(err);
                    warn!(error = %err, "credential validation failed");
                    return Ok(reject(req, &err));
                }
            };
            info!(account_id = %identity.account_id, "authentication done");
            req.extensions_mut().insert(identity);
            service.call(req).await.map(|res| res.map_into_left_body())
        })
    }
}

fn reject<B>(req: ServiceRequest, err: &AppError) -> ServiceResponse<EitherBody<B>> {
    let response = err.error_response().map_into_right_body();
    req.into_response(response)
}

fn bearer_token(req: &HttpRequest) -> Result<String, AppError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::CredentialMissing {
            reason: "token is empty".into(),
        })?;
    let value = header.to_str().map_err(|_| AppError::CredentialMissing {
        reason: "authorization header is not valid UTF-8".into(),
    })?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::CredentialMissing {
            reason: "authorization header must use the Bearer scheme".into(),
        })?;
    if token.is_empty() {
        return Err(AppError::CredentialMissing {
            reason: "token is empty".into(),
        });
    }
    Ok(token.to_string())
}

fn is_graphql_ws_upgrade(req: &HttpRequest) -> bool {
    let upgrade = req
        .headers()
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    let graphql_ws = req
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .any(|protocol| protocol.trim() == "graphql-ws")
        })
        .unwrap_or(false);
    upgrade && graphql_ws
}

/// Identity attached by the middleware, for code that works with the raw
/// request (the GraphQL POST handler); handlers use the extractors in
/// `middleware::guards`.
pub fn identity_of(req: &HttpRequest) -> Option<AuthContext> {
    req.extensions().get::<AuthContext>().cloned()
}
