//! Inventory reconciliation

mod engine;
pub mod merge;

pub use engine::{InventoryView, ReconciledView, ReconciliationEngine};
