//! Deduplication and polling core.
//!
//! - [`spool`]: durable record of announced videos
//! - [`source`]: monitored sources and their staleness gate
//! - [`processor`]: the per-source poll-and-announce procedure
//! - [`autospool`]: the startup baseline pass
//! - [`context`]: the context object handed to the scheduler

pub mod autospool;
pub mod context;
pub mod processor;
pub mod source;
pub mod spool;

pub use autospool::AutospoolSummary;
pub use context::AppContext;
pub use processor::{CheckOutcome, FeedProcessor};
pub use source::{MonitoredSource, SourceSet};
pub use spool::{DedupStore, Spool};
