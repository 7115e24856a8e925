// The classification pipeline - turns a raw package list into a
// status-labeled, priority-sorted snapshot
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::allowlist::SignatureAllowlist;
use crate::catalog::CatalogLookup;
use crate::config::Config;
use crate::ignored::IgnoredApps;
use crate::inventory::PackageInventory;
use crate::models::{ClassificationStatus, ClassifiedItem, InstalledPackage};
use crate::score::SovereigntyScore;

/// Classifies installed packages via a layered decision procedure:
/// user override, installer fast path, signature allow-list, then
/// catalog lookups - cheapest signal first, short-circuiting on the
/// first match.
///
/// Classification is read-only and per-package independent, so the
/// whole batch fans out concurrently. Lookup failures degrade to a
/// negative answer; one package can never take the batch down with it.
pub struct Classifier {
    catalog: Arc<dyn CatalogLookup>,
    allowlist: SignatureAllowlist,
    foss_installers: Vec<String>,
}

impl Classifier {
    pub fn new(catalog: Arc<dyn CatalogLookup>) -> Self {
        Self {
            catalog,
            allowlist: SignatureAllowlist::builtin(),
            foss_installers: vec![
                "org.fdroid.fdroid".to_string(),
                "org.fdroid.basic".to_string(),
            ],
        }
    }

    /// Pick up trusted installers and user-vouched packages from config.
    pub fn from_config(catalog: Arc<dyn CatalogLookup>, config: &Config) -> Self {
        Self {
            catalog,
            allowlist: SignatureAllowlist::builtin()
                .with_extra_packages(config.scan.extra_allowlist.iter().cloned()),
            foss_installers: config.scan.foss_installers.clone(),
        }
    }

    pub fn with_allowlist(mut self, allowlist: SignatureAllowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn with_foss_installers(mut self, installers: Vec<String>) -> Self {
        self.foss_installers = installers;
        self
    }

    /// Classify a batch. Exactly one item per input package comes back,
    /// sorted by status priority (proprietary first), ties broken by
    /// label.
    pub async fn classify(
        &self,
        packages: &[InstalledPackage],
        ignored: &HashSet<String>,
    ) -> Vec<ClassifiedItem> {
        let lookups = packages.iter().map(|pkg| self.classify_one(pkg, ignored));
        let mut items = join_all(lookups).await;
        Self::sort_items(&mut items);
        items
    }

    /// Like [`classify`](Self::classify), but each package's lookup races
    /// a cancellation signal. Packages still in flight when the signal
    /// fires come back as `Pending` - the scan was superseded and its
    /// result is about to be thrown away anyway, so finishing the remote
    /// calls would only waste catalog quota.
    pub async fn classify_with_cancel(
        &self,
        packages: &[InstalledPackage],
        ignored: &HashSet<String>,
        cancel: watch::Receiver<bool>,
    ) -> Vec<ClassifiedItem> {
        let lookups = packages.iter().map(|pkg| {
            let mut cancel = cancel.clone();
            async move {
                // Only a real supersession signal cancels. A dropped
                // sender closes the channel with an Err; that scan was
                // never superseded, so its lookups run to completion.
                let superseded = async {
                    loop {
                        match cancel.changed().await {
                            Ok(()) if *cancel.borrow_and_update() => break,
                            Ok(()) => continue,
                            Err(_) => futures::future::pending::<()>().await,
                        }
                    }
                };
                tokio::select! {
                    item = self.classify_one(pkg, ignored) => item,
                    _ = superseded => {
                        debug!("Scan superseded, {} left pending", pkg.package_id);
                        ClassifiedItem::new(pkg, ClassificationStatus::Pending, 0)
                    }
                }
            }
        });
        let mut items = join_all(lookups).await;
        Self::sort_items(&mut items);
        items
    }

    /// The layered decision procedure for a single package. Infallible:
    /// every failure mode maps to some status.
    async fn classify_one(
        &self,
        package: &InstalledPackage,
        ignored: &HashSet<String>,
    ) -> ClassifiedItem {
        // 1. User override beats everything
        if ignored.contains(&package.package_id) {
            return ClassifiedItem::new(package, ClassificationStatus::Ignored, 0);
        }

        // 2. Fast filter: installed through a FOSS channel
        if let Some(installer) = &package.installer_id {
            if self.foss_installers.iter().any(|id| id == installer) {
                return ClassifiedItem::new(package, ClassificationStatus::Foss, 0);
            }
        }

        // 3. Local signature allow-list
        if self.allowlist.contains_package(&package.package_id) {
            return ClassifiedItem::new(package, ClassificationStatus::Foss, 0);
        }

        // 4. Known FOSS solution in the catalog
        match self.catalog.is_solution(&package.package_id).await {
            Ok(true) => return ClassifiedItem::new(package, ClassificationStatus::Foss, 0),
            Ok(false) => {}
            // Fail open: an outage must not fail the scan
            Err(e) => warn!("Solution lookup failed for {}: {}", package.package_id, e),
        }

        // 5. Known proprietary target, else Unknown
        match self.catalog.is_proprietary(&package.package_id).await {
            Ok(true) => {
                let count = match self.catalog.alternatives_count(&package.package_id).await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(
                            "Alternatives count failed for {}: {}",
                            package.package_id, e
                        );
                        0
                    }
                };
                ClassifiedItem::new(package, ClassificationStatus::Proprietary, count)
            }
            Ok(false) => ClassifiedItem::new(package, ClassificationStatus::Unknown, 0),
            Err(e) => {
                warn!("Target lookup failed for {}: {}", package.package_id, e);
                ClassifiedItem::new(package, ClassificationStatus::Unknown, 0)
            }
        }
    }

    fn sort_items(items: &mut [ClassifiedItem]) {
        // Stable sort: status priority first, label as the documented
        // secondary key
        items.sort_by(|a, b| a.status.cmp(&b.status).then_with(|| a.label.cmp(&b.label)));
    }
}

/// One finished scan, tagged with the generation that produced it.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub generation: u64,
    pub items: Vec<ClassifiedItem>,
    pub score: SovereigntyScore,
}

/// Serializes scan identity: starting a new scan supersedes the one in
/// flight. The superseded scan's remaining lookups are cancelled
/// cooperatively and its result is marked stale by generation, so it can
/// never race a fresh result into the consumer.
pub struct ScanCoordinator {
    classifier: Arc<Classifier>,
    generation: AtomicU64,
    cancel: Mutex<Option<watch::Sender<bool>>>,
}

impl ScanCoordinator {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self {
            classifier,
            generation: AtomicU64::new(0),
            cancel: Mutex::new(None),
        }
    }

    /// Run a full scan: snapshot the ignore-set, enumerate packages,
    /// classify, aggregate. Infallible for the same reason the
    /// classifier is.
    pub async fn scan(
        &self,
        inventory: &dyn PackageInventory,
        ignored: &IgnoredApps,
    ) -> ScanResult {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (tx, rx) = watch::channel(false);
        if let Ok(mut guard) = self.cancel.lock() {
            if let Some(previous) = guard.replace(tx) {
                let _ = previous.send(true);
            }
        }

        // Snapshot at scan start; later edits affect the next scan
        let ignored_set = ignored.snapshot();
        let packages = inventory.installed_packages().await;
        debug!(
            "Scan {} starting over {} packages ({} ignored)",
            generation,
            packages.len(),
            ignored_set.len()
        );

        let items = self
            .classifier
            .classify_with_cancel(&packages, &ignored_set, rx)
            .await;
        let score = SovereigntyScore::from_items(&items);

        ScanResult {
            generation,
            items,
            score,
        }
    }

    /// Whether this result is from the most recently started scan.
    /// Consumers drop stale results instead of rendering them.
    pub fn is_current(&self, result: &ScanResult) -> bool {
        result.generation == self.generation.load(Ordering::SeqCst)
    }
}
