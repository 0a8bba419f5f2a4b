//! Domain model
//!
//! Tenants, teams, environments, change requests and the managed inventory.
//! Every entity carries its tenant id; nothing here is shared across tenants.

pub mod activity;
pub mod inventory;
pub mod request;
pub mod tenant;

pub use activity::{ActivityAction, ActivityEntry};
pub use inventory::{config_checksum, InventoryEntry, InventoryId, Provenance};
pub use request::*;
pub use tenant::*;
