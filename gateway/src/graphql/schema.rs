use async_graphql::{Context, Error, Object, Result, SimpleObject, Subscription};
use auth_core::AuthContext;
use futures_util::stream::Stream;
use futures_util::StreamExt;

use crate::clients::{PlatformEvent, SessionMetadata, TopicMetadata};
use crate::routes::parse_since;
use crate::scope::NamespaceScope;
use crate::state::AppState;

/// A user account.
#[derive(Debug, Clone, SimpleObject)]
pub struct AccountInfo {
    /// The id of the account; empty until the account is created.
    pub id: String,
    /// The account name.
    pub name: String,
}

/// A connected session.
#[derive(Debug, Clone, SimpleObject)]
pub struct SessionInfo {
    /// The unique id of the session.
    pub id: String,
    /// The application profile this session belongs to.
    pub application_profile_id: String,
    /// The application this session belongs to.
    pub application_id: String,
    /// The session's client id.
    pub client_id: String,
    /// The time this session logged in.
    pub connected_at: i64,
}

/// A message topic.
#[derive(Debug, Clone, SimpleObject)]
pub struct TopicInfo {
    pub id: String,
    pub name: String,
    pub message_count: u64,
    pub size_in_bytes: u64,
    pub guessed_content_type: String,
}

/// A platform audit event.
#[derive(Debug, Clone, SimpleObject)]
pub struct AuditEvent {
    pub timestamp: i64,
    pub kind: String,
    pub service: String,
    pub attributes: Vec<AuditEventAttribute>,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct AuditEventAttribute {
    pub key: String,
    pub value: String,
}

impl From<PlatformEvent> for AuditEvent {
    fn from(event: PlatformEvent) -> Self {
        let mut attributes: Vec<AuditEventAttribute> = event
            .attributes
            .into_iter()
            .map(|(key, value)| AuditEventAttribute { key, value })
            .collect();
        attributes.sort_by(|a, b| a.key.cmp(&b.key));
        AuditEvent {
            timestamp: event.timestamp,
            kind: event.kind,
            service: event.service,
            attributes,
        }
    }
}

fn session_info(scope: &NamespaceScope<'_>, session: SessionMetadata) -> SessionInfo {
    let (application_profile_id, id) = match session.session_id.split_once('/') {
        Some((profile, tail)) => (profile.to_string(), tail.to_string()),
        None => (String::new(), session.session_id.clone()),
    };
    SessionInfo {
        id,
        application_profile_id,
        application_id: scope.strip(&session.mount_point).to_string(),
        client_id: session.client_id,
        connected_at: session.connected_at,
    }
}

fn topic_info(scope: &NamespaceScope<'_>, topic: TopicMetadata) -> TopicInfo {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    let name = scope.strip(&topic.name).to_string();
    TopicInfo {
        id: STANDARD.encode(name.as_bytes()),
        name,
        message_count: topic.message_count,
        size_in_bytes: topic.size_in_bytes,
        guessed_content_type: topic.guessed_content_type,
    }
}

fn authenticated(ctx: &Context<'_>) -> Result<AuthContext> {
    ctx.data::<AuthContext>()
        .map(Clone::clone)
        .map_err(|_| Error::new("authentication required"))
}

fn provisioned(ctx: &Context<'_>) -> Result<AuthContext> {
    let identity = authenticated(ctx)?;
    if !identity.is_provisioned() {
        return Err(Error::new("account not registered"));
    }
    Ok(identity)
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The caller's account.
    async fn account(&self, ctx: &Context<'_>) -> Result<AccountInfo> {
        let identity = authenticated(ctx)?;
        Ok(AccountInfo {
            id: identity.account_id,
            name: identity.name,
        })
    }

    /// Sessions connected under the caller's account.
    async fn sessions(&self, ctx: &Context<'_>) -> Result<Vec<SessionInfo>> {
        let identity = provisioned(ctx)?;
        let state = ctx.data::<AppState>()?;
        let scope = NamespaceScope::of(&identity);

        let sessions = state.sessions.list_sessions().await.map_err(|e| {
            tracing::error!(error = %e, "session list failed");
            Error::new("failed to fetch connected session list")
        })?;
        Ok(sessions
            .into_iter()
            .filter(|session| scope.owns_session(&session.mount_point))
            .map(|session| session_info(&scope, session))
            .collect())
    }

    /// Topics under the caller's account, optionally narrowed by a pattern
    /// and pinned to one application.
    async fn topics(
        &self,
        ctx: &Context<'_>,
        pattern: Option<String>,
        application_id: Option<String>,
    ) -> Result<Vec<TopicInfo>> {
        let identity = provisioned(ctx)?;
        let state = ctx.data::<AppState>()?;
        let scope = NamespaceScope::of(&identity);

        let scoped = scope.topics(application_id.as_deref(), pattern.as_deref());
        let topics = state.messages.list_topics(&scoped).await.map_err(|e| {
            tracing::error!(error = %e, "topic list failed");
            Error::new("failed to fetch topic list")
        })?;
        Ok(topics
            .into_iter()
            .map(|topic| topic_info(&scope, topic))
            .collect())
    }
}

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Audit events for the caller's account, delivered in the order the
    /// upstream broker emitted them. Dropping the subscription drops the
    /// upstream stream.
    async fn events(
        &self,
        ctx: &Context<'_>,
        since: Option<String>,
    ) -> Result<impl Stream<Item = Result<AuditEvent>>> {
        let identity = provisioned(ctx)?;
        let state = ctx.data::<AppState>()?.clone();
        let from_timestamp = parse_since(since.as_deref().unwrap_or(""))
            .map_err(|_| Error::new("malformed since request parameter"))?;

        let stream = state
            .events
            .stream_events(&identity.account_id, from_timestamp)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "event subscription failed");
                Error::new("failed to subscribe to events")
            })?;

        Ok(stream.map(|item| {
            item.map(AuditEvent::from).map_err(|e| {
                tracing::error!(error = %e, "event stream failed");
                Error::new("event stream failed")
            })
        }))
    }
}
