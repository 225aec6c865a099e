//! Collaborator service seams.
//!
//! The account registry, message store, session registry and event store are
//! external services; the gateway consumes them through these traits so that
//! handlers stay independent of the wire (and tests can record exactly which
//! owner/pattern each call carried). `grpc` holds the tonic-backed
//! implementations used in production.

pub mod grpc;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{service} unavailable: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub principals: Vec<String>,
    pub device_usernames: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub created_at: i64,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct TopicMetadata {
    pub name: String,
    pub message_count: u64,
    pub size_in_bytes: u64,
    pub guessed_content_type: String,
    pub last_record: Option<Record>,
}

#[derive(Debug, Clone, Default)]
pub struct Record {
    pub topic: String,
    pub payload: Vec<u8>,
    pub timestamp: i64,
    pub sender: String,
}

#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    pub session_id: String,
    pub client_id: String,
    pub mount_point: String,
    pub connected_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptionRecord {
    pub session_id: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Default)]
pub struct PlatformEvent {
    pub timestamp: i64,
    pub kind: String,
    pub service: String,
    pub attributes: HashMap<String, String>,
}

/// Ordered stream of tenant records or events. Dropping the stream cancels
/// the upstream call; that is how subscription teardown is observed.
pub type RecordStream = BoxStream<'static, Result<Record, ClientError>>;
pub type EventStream = BoxStream<'static, Result<PlatformEvent, ClientError>>;

#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// `Ok(None)` when no account owns the principal.
    async fn account_by_principal(&self, principal: &str)
        -> Result<Option<Account>, ClientError>;

    async fn create_account(
        &self,
        name: &str,
        principals: Vec<String>,
        device_usernames: Vec<String>,
    ) -> Result<Account, ClientError>;

    async fn list_devices(&self, owner: &str) -> Result<Vec<Device>, ClientError>;

    async fn get_device(&self, owner: &str, id: &str) -> Result<Option<Device>, ClientError>;

    async fn create_device(
        &self,
        owner: &str,
        name: &str,
        password: &str,
        active: bool,
    ) -> Result<Device, ClientError>;

    async fn delete_device(&self, owner: &str, id: &str) -> Result<(), ClientError>;

    async fn set_device_active(
        &self,
        owner: &str,
        id: &str,
        active: bool,
    ) -> Result<(), ClientError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn list_topics(&self, pattern: &str) -> Result<Vec<TopicMetadata>, ClientError>;

    /// Records matching `pattern` from `from_timestamp` (unix nanos) on, in
    /// store order.
    async fn fetch_records(
        &self,
        pattern: &str,
        from_timestamp: i64,
    ) -> Result<RecordStream, ClientError>;
}

#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<SessionMetadata>, ClientError>;

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, ClientError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Audit events for one tenant from `from_timestamp` (unix nanos) on,
    /// in emission order.
    async fn stream_events(
        &self,
        tenant: &str,
        from_timestamp: i64,
    ) -> Result<EventStream, ClientError>;
}

/// Bridges the account registry into auth-core's identity-resolution seam.
pub struct RegistryDirectory {
    registry: Arc<dyn AccountRegistry>,
}

impl RegistryDirectory {
    pub fn new(registry: Arc<dyn AccountRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl auth_core::AccountDirectory for RegistryDirectory {
    async fn find_by_principal(
        &self,
        principal: &str,
    ) -> Result<Option<auth_core::AccountRecord>, auth_core::AuthError> {
        self.registry
            .account_by_principal(principal)
            .await
            .map(|account| {
                account.map(|account| auth_core::AccountRecord {
                    id: account.id,
                    name: account.name,
                    device_usernames: account.device_usernames,
                })
            })
            .map_err(|e| auth_core::AuthError::Resolution(e.to_string()))
    }
}
