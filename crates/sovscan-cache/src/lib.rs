// SQLite-based catalog mirror
// Keeps remote round-trips down and makes scans work offline

pub mod cache;

pub use cache::{CacheError, CatalogCache, SolutionEntry, TargetEntry};
