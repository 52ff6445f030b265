//! Persistence layer — libSQL-backed storage for contacts and analyses.

pub mod libsql_backend;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{ClaimOutcome, Store};
