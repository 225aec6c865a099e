//! tonic-backed collaborator clients.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use tonic::transport::Channel;
use tonic::{Code, Status};

use crate::clients::{
    Account, AccountRegistry, ClientError, Device, EventStore, EventStream, MessageStore,
    PlatformEvent, Record, RecordStream, SessionMetadata, SessionRegistry, SubscriptionRecord,
    TopicMetadata,
};
use crate::error::AppError;
use crate::grpc::messages::event_store_client::EventStoreClient;
use crate::grpc::messages::message_store_client::MessageStoreClient;
use crate::grpc::registry::account_registry_client::AccountRegistryClient;
use crate::grpc::sessions::session_registry_client::SessionRegistryClient;
use crate::grpc::{messages, registry, sessions};

async fn connect(url: &str, service: &'static str) -> Result<Channel, AppError> {
    Channel::from_shared(url.to_string())
        .map_err(|e| AppError::StartServer(format!("invalid {service} url: {e}")))?
        .connect()
        .await
        .map_err(|e| AppError::StartServer(format!("failed to connect to {service}: {e}")))
}

fn upstream(service: &'static str, status: Status) -> ClientError {
    tracing::error!(
        service,
        code = ?status.code(),
        message = %status.message(),
        "collaborator rpc failed"
    );
    ClientError::Upstream {
        service,
        message: status.message().to_string(),
    }
}

pub struct GrpcAccountRegistry {
    client: AccountRegistryClient<Channel>,
}

impl GrpcAccountRegistry {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let channel = connect(url, "account registry").await?;
        Ok(Self {
            client: AccountRegistryClient::new(channel),
        })
    }
}

fn account_from_proto(account: registry::Account) -> Account {
    Account {
        id: account.id,
        name: account.name,
        principals: account.principals,
        device_usernames: account.device_usernames,
    }
}

fn device_from_proto(device: registry::Device) -> Device {
    Device {
        id: device.id,
        name: device.name,
        active: device.active,
        created_at: device.created_at,
        password: device.password,
    }
}

#[async_trait]
impl AccountRegistry for GrpcAccountRegistry {
    async fn account_by_principal(
        &self,
        principal: &str,
    ) -> Result<Option<Account>, ClientError> {
        let request = registry::GetAccountByPrincipalRequest {
            principal: principal.to_string(),
        };
        match self
            .client
            .clone()
            .get_account_by_principal(request)
            .await
        {
            Ok(response) => Ok(response.into_inner().account.map(account_from_proto)),
            Err(status) if status.code() == Code::NotFound => Ok(None),
            Err(status) => Err(upstream("account registry", status)),
        }
    }

    async fn create_account(
        &self,
        name: &str,
        principals: Vec<String>,
        device_usernames: Vec<String>,
    ) -> Result<Account, ClientError> {
        let request = registry::CreateAccountRequest {
            name: name.to_string(),
            principals,
            device_usernames,
        };
        let response = self
            .client
            .clone()
            .create_account(request)
            .await
            .map_err(|status| upstream("account registry", status))?;
        response
            .into_inner()
            .account
            .map(account_from_proto)
            .ok_or_else(|| ClientError::Upstream {
                service: "account registry",
                message: "create returned no account".into(),
            })
    }

    async fn list_devices(&self, owner: &str) -> Result<Vec<Device>, ClientError> {
        let request = registry::ListDevicesRequest {
            owner: owner.to_string(),
        };
        let response = self
            .client
            .clone()
            .list_devices(request)
            .await
            .map_err(|status| upstream("account registry", status))?;
        Ok(response
            .into_inner()
            .devices
            .into_iter()
            .map(device_from_proto)
            .collect())
    }

    async fn get_device(&self, owner: &str, id: &str) -> Result<Option<Device>, ClientError> {
        let request = registry::GetDeviceRequest {
            owner: owner.to_string(),
            id: id.to_string(),
        };
        match self.client.clone().get_device(request).await {
            Ok(response) => Ok(response.into_inner().device.map(device_from_proto)),
            Err(status) if status.code() == Code::NotFound => Ok(None),
            Err(status) => Err(upstream("account registry", status)),
        }
    }

    async fn create_device(
        &self,
        owner: &str,
        name: &str,
        password: &str,
        active: bool,
    ) -> Result<Device, ClientError> {
        let request = registry::CreateDeviceRequest {
            owner: owner.to_string(),
            name: name.to_string(),
            password: password.to_string(),
            active,
        };
        let response = self
            .client
            .clone()
            .create_device(request)
            .await
            .map_err(|status| upstream("account registry", status))?;
        response
            .into_inner()
            .device
            .map(device_from_proto)
            .ok_or_else(|| ClientError::Upstream {
                service: "account registry",
                message: "create returned no device".into(),
            })
    }

    async fn delete_device(&self, owner: &str, id: &str) -> Result<(), ClientError> {
        let request = registry::DeleteDeviceRequest {
            owner: owner.to_string(),
            id: id.to_string(),
        };
        self.client
            .clone()
            .delete_device(request)
            .await
            .map_err(|status| upstream("account registry", status))?;
        Ok(())
    }

    async fn set_device_active(
        &self,
        owner: &str,
        id: &str,
        active: bool,
    ) -> Result<(), ClientError> {
        let mut client = self.client.clone();
        if active {
            client
                .enable_device(registry::EnableDeviceRequest {
                    owner: owner.to_string(),
                    id: id.to_string(),
                })
                .await
                .map_err(|status| upstream("account registry", status))?;
        } else {
            client
                .disable_device(registry::DisableDeviceRequest {
                    owner: owner.to_string(),
                    id: id.to_string(),
                })
                .await
                .map_err(|status| upstream("account registry", status))?;
        }
        Ok(())
    }
}

pub struct GrpcMessageStore {
    client: MessageStoreClient<Channel>,
}

impl GrpcMessageStore {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let channel = connect(url, "message store").await?;
        Ok(Self {
            client: MessageStoreClient::new(channel),
        })
    }
}

fn record_from_proto(record: messages::Record) -> Record {
    Record {
        topic: String::from_utf8_lossy(&record.topic).into_owned(),
        payload: record.payload,
        timestamp: record.timestamp,
        sender: record.sender,
    }
}

fn topic_from_proto(topic: messages::TopicMetadata) -> TopicMetadata {
    TopicMetadata {
        name: String::from_utf8_lossy(&topic.name).into_owned(),
        message_count: topic.message_count,
        size_in_bytes: topic.size_in_bytes,
        guessed_content_type: topic.guessed_content_type,
        last_record: topic.last_record.map(record_from_proto),
    }
}

#[async_trait]
impl MessageStore for GrpcMessageStore {
    async fn list_topics(&self, pattern: &str) -> Result<Vec<TopicMetadata>, ClientError> {
        let request = messages::ListTopicsRequest {
            pattern: pattern.as_bytes().to_vec(),
        };
        let response = self
            .client
            .clone()
            .list_topics(request)
            .await
            .map_err(|status| upstream("message store", status))?;
        Ok(response
            .into_inner()
            .topic_metadatas
            .into_iter()
            .map(topic_from_proto)
            .collect())
    }

    async fn fetch_records(
        &self,
        pattern: &str,
        from_timestamp: i64,
    ) -> Result<RecordStream, ClientError> {
        let request = messages::GetTopicsRequest {
            pattern: pattern.as_bytes().to_vec(),
            from_timestamp,
        };
        let response = self
            .client
            .clone()
            .get_topics(request)
            .await
            .map_err(|status| upstream("message store", status))?;
        let stream = response
            .into_inner()
            .map_err(|status| upstream("message store", status))
            .map_ok(|batch| {
                futures_util::stream::iter(
                    batch.records.into_iter().map(record_from_proto).map(Ok),
                )
            })
            .try_flatten()
            .boxed();
        Ok(stream)
    }
}

pub struct GrpcSessionRegistry {
    client: SessionRegistryClient<Channel>,
}

impl GrpcSessionRegistry {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let channel = connect(url, "session registry").await?;
        Ok(Self {
            client: SessionRegistryClient::new(channel),
        })
    }
}

#[async_trait]
impl SessionRegistry for GrpcSessionRegistry {
    async fn list_sessions(&self) -> Result<Vec<SessionMetadata>, ClientError> {
        let response = self
            .client
            .clone()
            .list_session_metadatas(sessions::ListSessionMetadatasRequest {})
            .await
            .map_err(|status| upstream("session registry", status))?;
        Ok(response
            .into_inner()
            .session_metadatas
            .into_iter()
            .map(|session| SessionMetadata {
                session_id: session.session_id,
                client_id: session.client_id,
                mount_point: session.mount_point,
                connected_at: session.connected_at,
            })
            .collect())
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRecord>, ClientError> {
        let response = self
            .client
            .clone()
            .list_subscriptions(sessions::ListSubscriptionsRequest {})
            .await
            .map_err(|status| upstream("session registry", status))?;
        Ok(response
            .into_inner()
            .subscriptions
            .into_iter()
            .map(|subscription| SubscriptionRecord {
                session_id: subscription.session_id,
                pattern: String::from_utf8_lossy(&subscription.pattern).into_owned(),
            })
            .collect())
    }
}

pub struct GrpcEventStore {
    client: EventStoreClient<Channel>,
}

impl GrpcEventStore {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let channel = connect(url, "event store").await?;
        Ok(Self {
            client: EventStoreClient::new(channel),
        })
    }
}

fn event_from_proto(event: messages::Event) -> PlatformEvent {
    PlatformEvent {
        timestamp: event.timestamp,
        kind: event.kind,
        service: event.service,
        attributes: event
            .attributes
            .into_iter()
            .map(|attribute| (attribute.key, attribute.value))
            .collect(),
    }
}

#[async_trait]
impl EventStore for GrpcEventStore {
    async fn stream_events(
        &self,
        tenant: &str,
        from_timestamp: i64,
    ) -> Result<EventStream, ClientError> {
        let request = messages::GetEventsRequest {
            tenant: tenant.to_string(),
            from_timestamp,
        };
        let response = self
            .client
            .clone()
            .get_events(request)
            .await
            .map_err(|status| upstream("event store", status))?;
        let stream = response
            .into_inner()
            .map_err(|status| upstream("event store", status))
            .map_ok(|batch| {
                futures_util::stream::iter(batch.events.into_iter().map(event_from_proto).map(Ok))
            })
            .try_flatten()
            .boxed();
        Ok(stream)
    }
}
