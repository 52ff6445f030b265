//! HTTP boundary — REST + WebSocket surface over the analysis core.

pub mod routes;

pub use routes::{AppState, api_routes};
