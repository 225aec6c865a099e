use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;

use apiary_gateway::clients::grpc::{
    GrpcAccountRegistry, GrpcEventStore, GrpcMessageStore, GrpcSessionRegistry,
};
use apiary_gateway::clients::RegistryDirectory;
use apiary_gateway::middleware::AuthMiddleware;
use apiary_gateway::state::AppState;
use apiary_gateway::{config, error, graphql, logging, routes};

#[actix_web::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let registry: Arc<GrpcAccountRegistry> =
        Arc::new(GrpcAccountRegistry::connect(&cfg.upstreams.account_registry_url).await?);
    let messages = Arc::new(GrpcMessageStore::connect(&cfg.upstreams.message_store_url).await?);
    let sessions =
        Arc::new(GrpcSessionRegistry::connect(&cfg.upstreams.session_registry_url).await?);
    let events = Arc::new(GrpcEventStore::connect(&cfg.upstreams.event_store_url).await?);
    info!("collaborator clients connected");

    let directory = Arc::new(RegistryDirectory::new(registry.clone()));
    let provider = auth_core::provider::from_config(
        &cfg.provider,
        cfg.environment.is_production(),
        directory,
    )
    .map_err(|e| error::AppError::Config(e.to_string()))?;

    let state = AppState {
        config: cfg.clone(),
        provider,
        registry,
        messages,
        sessions,
        events,
    };
    let schema = graphql::build_schema(state.clone());

    let bind_addr = format!("{}:{}", cfg.host, cfg.port);
    info!(%bind_addr, "starting apiary-gateway");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(schema.clone()))
            .app_data(routes::json_config())
            .wrap(AuthMiddleware::new(state.provider.clone()))
            .wrap(Cors::permissive())
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(e.to_string()))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(e.to_string()))
}
