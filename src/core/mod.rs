pub mod connection;
pub mod diff;
pub mod engine;
pub mod entry;
pub mod error;
pub mod ignore;
pub mod preview;
pub mod transfer;
pub mod walker;

pub use connection::SessionConnection;
pub use diff::compute_plan;
pub use engine::Synchronizer;
pub use entry::{sort_entries, FileEntry, PlanEntry, SyncDirection, TransferIntent};
pub use error::SyncError;
pub use ignore::IgnoreList;
pub use transfer::{plan_total_bytes, ProgressFn, TransferEngine, MAX_CONCURRENT_TRANSFERS};
pub use walker::{LocalWalker, RemoteWalker, TreeWalk};
