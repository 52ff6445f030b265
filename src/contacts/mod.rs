//! VIP contact registry — relationship-based priority weights.

pub mod model;
pub mod registry;

pub use model::{RelationshipType, VipContact, VipStatus};
pub use registry::ContactRegistry;
