//! Real-time notifier — best-effort event fan-out to subscribers.

pub mod bus;
pub mod ws;

pub use bus::{AnalysisEvent, EventBus};
pub use ws::event_routes;
