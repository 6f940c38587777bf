//! Server infrastructure module.
//!
//! - Common layers (tracing, security headers, JSON 404)
//! - Health endpoint
//! - Graceful shutdown
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_app, health_router, with_common_layers};
//! use core_config::{server::ServerConfig, app_info};
//!
//! let app = with_common_layers(api_routes.merge(health_router(app_info!())));
//! create_app(app, &ServerConfig::default()).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_app, with_common_layers};
pub use health::{HealthResponse, health_router};
pub use shutdown::shutdown_signal;
