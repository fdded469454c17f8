// risegarden-api: Async Rust client for the Rise Gardens cloud (identity provider + garden API)

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use auth::{
    Credentials, DEFAULT_AUTH_URL, DEFAULT_TOKEN_MARGIN, MAX_TOKEN_LIFETIME, Token, TokenManager,
};
pub use client::{DEFAULT_API_BASE, MAX_BRIGHTNESS, RiseClient, validate_brightness};
pub use error::Error;
pub use models::{GardenSummary, RawDeviceState, TaskEntry, UserTasks};
pub use session::{Session, SessionConfig};
pub use transport::TransportConfig;
