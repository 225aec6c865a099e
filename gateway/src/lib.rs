//! Apiary gateway: the public REST/GraphQL edge of the messaging platform.
//!
//! Every inbound request is authenticated by the `middleware::auth` layer
//! using the provider from `auth-core`, and every downstream call is scoped
//! to the caller's namespace through [`scope::NamespaceScope`]. Tenant
//! isolation is a property of this crate's discipline: no handler passes a
//! caller-supplied account id downstream, ever.

pub mod clients;
pub mod config;
pub mod error;
pub mod graphql;
pub mod grpc;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod scope;
pub mod state;
