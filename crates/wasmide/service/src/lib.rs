//! # wasmide-service
//!
//! HTTP front of the web IDE backend. Requests arrive already authenticated;
//! the caller id is read from the `x-user-id` header and every project
//! operation is scoped to it.
//!
//! - [`api`]: axum router, handlers and the caller extractor
//! - [`config`]: layered configuration (defaults, file, `WASMIDE_*` env)
//! - [`server`]: backend wiring and the serve loop

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use api::{create_router, AppState, CallerIdentity};
pub use config::ServiceConfig;
pub use error::{ApiError, ServiceError};
pub use server::Server;
