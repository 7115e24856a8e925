use crate::models::InstalledPackage;

/// Seam to the OS package manager.
///
/// The real implementation lives in the embedding application (JNI on
/// Android, a test double everywhere else). Implementations must absorb
/// per-call OS failures into an empty list / `None` - the classifier is
/// not the place to handle platform exceptions.
#[async_trait::async_trait]
pub trait PackageInventory: Send + Sync {
    /// Installed packages, deduplicated by package id (the OS enforces
    /// uniqueness). Empty on enumeration failure.
    async fn installed_packages(&self) -> Vec<InstalledPackage>;

    /// Installer attribution for one package, when the OS knows it.
    async fn installer_of(&self, package_id: &str) -> Option<String>;
}

/// Fixed in-memory inventory. Backs tests, and useful for embedders that
/// already hold a package list and just want it classified.
pub struct StaticInventory {
    packages: Vec<InstalledPackage>,
}

impl StaticInventory {
    pub fn new(packages: Vec<InstalledPackage>) -> Self {
        Self { packages }
    }
}

#[async_trait::async_trait]
impl PackageInventory for StaticInventory {
    async fn installed_packages(&self) -> Vec<InstalledPackage> {
        self.packages.clone()
    }

    async fn installer_of(&self, package_id: &str) -> Option<String> {
        self.packages
            .iter()
            .find(|p| p.package_id == package_id)
            .and_then(|p| p.installer_id.clone())
    }
}
