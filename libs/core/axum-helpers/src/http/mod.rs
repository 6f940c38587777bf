//! HTTP middleware module.
//!
//! - Security headers on every response
//! - Optional shared-secret (`x-api-key`) check
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::http::{SharedSecret, require_api_key, security_headers};
//!
//! let app = Router::new()
//!     .layer(axum::middleware::from_fn_with_state(SharedSecret::new(key), require_api_key))
//!     .layer(axum::middleware::from_fn(security_headers));
//! ```

pub mod api_key;
pub mod security;

pub use api_key::{API_KEY_HEADER, SharedSecret, require_api_key};
pub use security::security_headers;
