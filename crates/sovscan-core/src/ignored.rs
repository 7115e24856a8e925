use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// User overrides: packages the classifier must leave alone.
///
/// A small key-set persisted as JSON in the platform data directory.
/// Entries are created and deleted only by explicit user action
/// ("ignore" / "restore") and survive app restarts. The classifier never
/// reads this directly; it takes a [`snapshot`](Self::snapshot) at scan
/// start and works from that.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IgnoredApps {
    packages: HashSet<String>,
}

impl IgnoredApps {
    /// Empty in-memory set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default on-disk location; empty set if the file
    /// doesn't exist yet.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(Self::store_path()?)
    }

    pub fn load_from(path: PathBuf) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let store: IgnoredApps = serde_json::from_str(&contents)?;
            Ok(store)
        } else {
            Ok(Self::new())
        }
    }

    /// Persist to the default on-disk location.
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(Self::store_path()?)
    }

    pub fn save_to(&self, path: PathBuf) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Mark a package as ignored. Returns false if it already was.
    pub fn ignore(&mut self, package_id: impl Into<String>) -> bool {
        self.packages.insert(package_id.into())
    }

    /// Un-ignore a package. Returns false if it wasn't ignored.
    pub fn restore(&mut self, package_id: &str) -> bool {
        self.packages.remove(package_id)
    }

    pub fn is_ignored(&self, package_id: &str) -> bool {
        self.packages.contains(package_id)
    }

    /// Current set of ignored package ids, cloned so a running scan keeps
    /// a consistent view even if the user edits the set mid-scan.
    pub fn snapshot(&self) -> HashSet<String> {
        self.packages.clone()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// XDG data dir on Unix-like systems, AppData on Windows
    fn store_path() -> crate::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::Config("Could not find data directory".into()))?
            .join("sovscan");

        Ok(data_dir.join("ignored.json"))
    }
}
