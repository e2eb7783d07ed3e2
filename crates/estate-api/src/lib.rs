//! # Estate API
//!
//! REST endpoints, the server-rendered dashboard and the router that
//! ties them to the domain services.

pub mod dashboard;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
