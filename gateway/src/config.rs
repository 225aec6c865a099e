use std::env;
use std::time::Duration;

use auth_core::provider::ProviderConfig;
use dotenvy::dotenv;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub account_registry_url: String,
    pub message_store_url: String,
    pub session_registry_url: String,
    pub event_store_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub provider: ProviderConfig,
    pub upstreams: UpstreamConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let environment = match env::var("APIARY_ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            Ok("development") | Err(_) => Environment::Development,
            Ok(other) => {
                return Err(AppError::Config(format!(
                    "unknown APIARY_ENVIRONMENT {other:?}"
                )))
            }
        };

        let provider = match env::var("AUTH_PROVIDER").as_deref() {
            Ok("oauth") | Err(_) => {
                let domain = env::var("AUTH_DOMAIN")
                    .map_err(|_| AppError::Config("AUTH_DOMAIN missing".into()))?;
                let audience = env::var("AUTH_AUDIENCE")
                    .map_err(|_| AppError::Config("AUTH_AUDIENCE missing".into()))?;
                let jwks_ttl = env::var("JWKS_CACHE_TTL_SECONDS")
                    .ok()
                    .and_then(|value| value.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(auth_core::DEFAULT_CACHE_TTL);
                ProviderConfig::OAuth {
                    domain,
                    audience,
                    jwks_ttl,
                }
            }
            Ok("static") => ProviderConfig::Static {
                account_id: env::var("STATIC_ACCOUNT_ID")
                    .unwrap_or_else(|_| "local-account".into()),
                principal: env::var("STATIC_PRINCIPAL").unwrap_or_else(|_| "local-user".into()),
            },
            Ok(other) => {
                return Err(AppError::Config(format!("unknown AUTH_PROVIDER {other:?}")))
            }
        };

        let message_store_url = env::var("MESSAGE_STORE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:50052".into());
        let upstreams = UpstreamConfig {
            account_registry_url: env::var("ACCOUNT_REGISTRY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:50051".into()),
            session_registry_url: env::var("SESSION_REGISTRY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:50053".into()),
            // The event store ships with the message store unless deployed
            // separately.
            event_store_url: env::var("EVENT_STORE_URL")
                .unwrap_or_else(|_| message_store_url.clone()),
            message_store_url,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(8080),
            environment,
            provider,
            upstreams,
        })
    }

    #[cfg(test)]
    pub(crate) fn test_defaults() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            environment: Environment::Development,
            provider: ProviderConfig::Static {
                account_id: "local-account".into(),
                principal: "local-user".into(),
            },
            upstreams: UpstreamConfig {
                account_registry_url: "http://127.0.0.1:50051".into(),
                message_store_url: "http://127.0.0.1:50052".into(),
                session_registry_url: "http://127.0.0.1:50053".into(),
                event_store_url: "http://127.0.0.1:50052".into(),
            },
        }
    }
}
