pub mod fetcher;
pub mod source;

pub use fetcher::{CacheStatus, Fetched, SnapshotFetcher};
pub use source::{HttpSource, SnapshotSource};
