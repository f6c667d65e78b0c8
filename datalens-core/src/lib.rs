pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthStateStream, Identity, IdentityProvider, LocalIdentityProvider};
pub use config::DatalensConfig;
pub use error::DatalensError;
