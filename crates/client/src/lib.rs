//! Analysis service API client, shared by the controller and one-shot CLI
//! commands.
//!
//! Owns the service wire contract and the persisted login state. Nothing in
//! here retries or prints.

pub mod auth;
mod client;

pub use auth::{clear_auth, load_auth, save_auth, TOKEN_KEY, USER_KEY};
pub use client::{ApiClient, ApiError, HealthStatus, RegisterRequest, UploadFile};
