//! Ownership and promotion rules

mod promotion;
mod registry;

pub use promotion::PromotionOrder;
pub use registry::OwnershipRegistry;
