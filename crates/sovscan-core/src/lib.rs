// Core classification logic lives here - the brain of the operation
pub mod allowlist;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ignored;
pub mod inventory;
pub mod models;
pub mod score;
pub mod submissions;

pub use allowlist::SignatureAllowlist;
pub use catalog::{refresh_cache, CachedCatalog, CatalogLookup, RemoteCatalog};
pub use classifier::{Classifier, ScanCoordinator, ScanResult};
pub use config::Config;
pub use error::Error;
pub use ignored::IgnoredApps;
pub use inventory::{PackageInventory, StaticInventory};
pub use models::{ClassificationStatus, ClassifiedItem, InstalledPackage};
pub use score::{SovereigntyLevel, SovereigntyScore, StatusCounts};
pub use submissions::{cast_vote, AlternativeDraft, FeedbackDraft};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
