pub mod auth;
pub mod guards;

pub use auth::AuthMiddleware;
pub use guards::{Authenticated, Provisioned};
