//! Identity extractors.
//!
//! Handlers receive the caller's identity as an explicit parameter instead of
//! reading ambient state, so the trust dependency is visible at every call
//! site. [`Provisioned`] additionally enforces that the account exists;
//! account creation is the one handler that takes [`Authenticated`] instead.

use std::future::{ready, Ready};
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use auth_core::AuthContext;

use crate::error::AppError;

/// Any caller the middleware has authenticated, provisioned or not.
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthContext);

impl Deref for Authenticated {
    type Target = AuthContext;

    fn deref(&self) -> &AuthContext {
        &self.0
    }
}

impl FromRequest for Authenticated {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthContext>()
                .cloned()
                .map(Authenticated)
                .ok_or(AppError::CredentialMissing {
                    reason: "request reached a handler without authentication".into(),
                }),
        )
    }
}

/// An authenticated caller whose account exists. Extraction fails with
/// 401 "account not registered" for valid-but-unprovisioned identities.
#[derive(Debug, Clone)]
pub struct Provisioned(pub AuthContext);

impl Deref for Provisioned {
    type Target = AuthContext;

    fn deref(&self) -> &AuthContext {
        &self.0
    }
}

impl FromRequest for Provisioned {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<AuthContext>().cloned();
        ready(match identity {
            Some(identity) if identity.is_provisioned() => Ok(Provisioned(identity)),
            Some(_) => Err(AppError::NotRegistered),
            None => Err(AppError::CredentialMissing {
                reason: "request reached a handler without authentication".into(),
            }),
        })
    }
}
