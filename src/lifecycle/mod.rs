//! Change request lifecycle and bulk sync

mod engine;
pub mod sync;
pub mod validate;

pub use engine::RequestLifecycleEngine;
pub use sync::{SyncBatch, SyncSummary};
