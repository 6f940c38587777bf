//! # Axum Helpers
//!
//! Shared building blocks for the HTTP services in this workspace.
//!
//! ## Modules
//!
//! - **[`server`]**: Server setup, health checks, graceful shutdown
//! - **[`http`]**: HTTP middleware (security headers, shared-secret check)
//! - **[`errors`]**: Structured `{error, detail?}` error responses

pub mod errors;
pub mod http;
pub mod server;

pub use server::{HealthResponse, create_app, health_router, shutdown_signal, with_common_layers};

pub use http::{API_KEY_HEADER, SharedSecret, require_api_key, security_headers};

pub use errors::{AppError, ErrorResponse};
