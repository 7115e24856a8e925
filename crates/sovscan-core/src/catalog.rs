// Catalog lookups the classifier runs against - remote, cache-first glue
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use sovscan_api::CatalogClient;
use sovscan_cache::{CatalogCache, SolutionEntry, TargetEntry};
use tracing::{debug, info, warn};

use crate::Result;

/// The two membership questions (plus one count) classification needs.
///
/// A trait so the classifier can be tested against a mock instead of a
/// live backend, and so cache-first wrapping is invisible to callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Is this package a catalogued FOSS solution?
    async fn is_solution(&self, package_id: &str) -> Result<bool>;

    /// Is this package a catalogued proprietary target?
    async fn is_proprietary(&self, package_id: &str) -> Result<bool>;

    /// How many alternatives does the catalog list for this target?
    async fn alternatives_count(&self, package_id: &str) -> Result<u32>;
}

/// Direct remote lookups, no cache involved.
pub struct RemoteCatalog {
    client: CatalogClient,
}

impl RemoteCatalog {
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl CatalogLookup for RemoteCatalog {
    async fn is_solution(&self, package_id: &str) -> Result<bool> {
        Ok(self.client.is_solution(package_id).await?)
    }

    async fn is_proprietary(&self, package_id: &str) -> Result<bool> {
        Ok(self.client.is_proprietary(package_id).await?)
    }

    async fn alternatives_count(&self, package_id: &str) -> Result<u32> {
        Ok(self.client.alternatives_count(package_id).await?)
    }
}

/// Cache-first catalog lookups.
///
/// While the local mirror is within its TTL it answers membership
/// questions authoritatively (the mirror is a complete snapshot, so
/// absence really means "not in the catalog"). Once stale, or when the
/// local database misbehaves, lookups fall through to the remote
/// catalog. Local-storage failures are never fatal: they degrade to a
/// cache miss.
pub struct CachedCatalog {
    cache: Arc<Mutex<CatalogCache>>,
    remote: Arc<dyn CatalogLookup>,
    ttl: Duration,
}

impl CachedCatalog {
    pub fn new(cache: Arc<Mutex<CatalogCache>>, remote: Arc<dyn CatalogLookup>) -> Self {
        Self {
            cache,
            remote,
            ttl: Duration::hours(24),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn lock_cache(&self) -> Option<MutexGuard<'_, CatalogCache>> {
        match self.cache.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("Catalog cache mutex poisoned, treating as cache miss");
                None
            }
        }
    }

    /// Answer from the mirror if it is fresh; None means "ask remote".
    fn cached_answer<T>(
        &self,
        lookup: impl FnOnce(&CatalogCache) -> sovscan_cache::cache::Result<T>,
    ) -> Option<T> {
        let guard = self.lock_cache()?;
        match guard.is_valid(self.ttl) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("Cache validity check failed: {}", e);
                return None;
            }
        }
        match lookup(&guard) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Cache lookup failed, falling back to remote: {}", e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl CatalogLookup for CachedCatalog {
    async fn is_solution(&self, package_id: &str) -> Result<bool> {
        if let Some(hit) = self.cached_answer(|c| c.is_solution_cached(package_id)) {
            debug!("Solution lookup for {} served from cache", package_id);
            return Ok(hit);
        }
        self.remote.is_solution(package_id).await
    }

    async fn is_proprietary(&self, package_id: &str) -> Result<bool> {
        if let Some(hit) = self.cached_answer(|c| c.is_target_cached(package_id)) {
            debug!("Target lookup for {} served from cache", package_id);
            return Ok(hit);
        }
        self.remote.is_proprietary(package_id).await
    }

    async fn alternatives_count(&self, package_id: &str) -> Result<u32> {
        if let Some(count) = self.cached_answer(|c| c.alternatives_count(package_id)) {
            // A fresh mirror without the row means the target has no entry
            return Ok(count.unwrap_or(0));
        }
        self.remote.alternatives_count(package_id).await
    }
}

/// Pull the full target and solution tables and swap them into the local
/// mirror. All-or-nothing: a failed fetch or a failed write propagates
/// and leaves the previous mirror untouched, so the caller can decide
/// between retrying and serving stale data.
pub async fn refresh_cache(client: &CatalogClient, cache: &Mutex<CatalogCache>) -> Result<()> {
    let targets = client.fetch_targets().await?;
    let solutions = client.fetch_solutions().await?;

    let target_entries: Vec<TargetEntry> = targets
        .iter()
        .map(|t| TargetEntry {
            package_id: t.package_id.clone(),
            display_name: t.display_name.clone(),
            alternatives_count: t.alternatives_count(),
        })
        .collect();
    let solution_entries: Vec<SolutionEntry> = solutions
        .iter()
        .map(|s| SolutionEntry {
            package_id: s.package_id.clone(),
            display_name: s.display_name.clone(),
        })
        .collect();

    let mut guard = cache
        .lock()
        .map_err(|_| crate::Error::Cache("catalog cache mutex poisoned".into()))?;
    guard.replace(&target_entries, &solution_entries)?;

    info!(
        "Catalog cache refreshed: {} targets, {} solutions",
        target_entries.len(),
        solution_entries.len()
    );
    Ok(())
}
