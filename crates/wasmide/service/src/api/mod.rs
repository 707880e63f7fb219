//! HTTP API

pub mod handlers;
pub mod identity;
pub mod router;
pub mod state;

pub use identity::{CallerIdentity, USER_ID_HEADER};
pub use router::create_router;
pub use state::AppState;
