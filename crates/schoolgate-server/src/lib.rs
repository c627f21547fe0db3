//! schoolgate server — the HTTP surface over the session manager and the
//! request authorizer.

pub mod app;
pub mod config;
pub mod error;

pub use app::{AppState, router};
pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
