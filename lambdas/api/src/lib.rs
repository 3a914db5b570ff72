//! HTTP API of the medicine delivery marketplace.

pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::build_router;
pub use state::AppState;
