use std::sync::Arc;

use auth_core::AuthProvider;

use crate::clients::{AccountRegistry, EventStore, MessageStore, SessionRegistry};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn AuthProvider>,
    pub registry: Arc<dyn AccountRegistry>,
    pub messages: Arc<dyn MessageStore>,
    pub sessions: Arc<dyn SessionRegistry>,
    pub events: Arc<dyn EventStore>,
}
