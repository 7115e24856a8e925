use serde::{Deserialize, Serialize};

/// An installed app as reported by the OS package manager.
///
/// Rebuilt fresh on every scan and discarded once classified; nothing
/// here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// OS-enforced unique package identifier (reverse-DNS style)
    pub package_id: String,
    /// Human-readable app name
    pub label: String,
    /// Package id of whatever installed this app, when the OS knows it
    pub installer_id: Option<String>,
    /// Opaque icon reference for the presentation layer
    pub icon: Option<String>,
}

impl InstalledPackage {
    pub fn new(package_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            label: label.into(),
            installer_id: None,
            icon: None,
        }
    }

    pub fn with_installer(mut self, installer_id: impl Into<String>) -> Self {
        self.installer_id = Some(installer_id.into());
        self
    }
}

/// Where an app stands, sovereignty-wise.
///
/// Variant order doubles as display priority: proprietary apps sort
/// first (they are what the user came to fix), ignored apps last.
/// `Ord` therefore derives straight from declaration order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassificationStatus {
    /// Known closed-source app with (possibly zero) catalogued alternatives
    Proprietary,
    /// Nothing known about this app
    Unknown,
    /// Classification not finished (scan superseded mid-flight)
    Pending,
    /// Verifiably free and open source
    Foss,
    /// User told us to stop bothering them about this one
    Ignored,
}

impl ClassificationStatus {
    /// Numeric sort priority, ascending = shown first.
    pub fn priority(&self) -> u8 {
        match self {
            ClassificationStatus::Proprietary => 1,
            ClassificationStatus::Unknown => 2,
            ClassificationStatus::Pending => 3,
            ClassificationStatus::Foss => 4,
            ClassificationStatus::Ignored => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClassificationStatus::Proprietary => "Proprietary",
            ClassificationStatus::Unknown => "Unknown",
            ClassificationStatus::Pending => "Pending",
            ClassificationStatus::Foss => "FOSS",
            ClassificationStatus::Ignored => "Ignored",
        }
    }
}

impl std::fmt::Display for ClassificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One classified app - the unit the whole pipeline produces.
///
/// Immutable once built; the next scan supersedes it rather than
/// mutating it. Invariant: `alternatives_count > 0` only for
/// `Proprietary` items, enforced by the constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedItem {
    pub package_id: String,
    pub label: String,
    pub status: ClassificationStatus,
    pub installer_id: Option<String>,
    pub icon: Option<String>,
    pub alternatives_count: u32,
}

impl ClassifiedItem {
    pub fn new(
        package: &InstalledPackage,
        status: ClassificationStatus,
        alternatives_count: u32,
    ) -> Self {
        // Alternatives only make sense for proprietary apps
        let alternatives_count = match status {
            ClassificationStatus::Proprietary => alternatives_count,
            _ => 0,
        };

        Self {
            package_id: package.package_id.clone(),
            label: package.label.clone(),
            status,
            installer_id: package.installer_id.clone(),
            icon: package.icon.clone(),
            alternatives_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_matches_display_priority() {
        use ClassificationStatus::*;
        let mut statuses = vec![Ignored, Foss, Proprietary, Pending, Unknown];
        statuses.sort();
        assert_eq!(statuses, vec![Proprietary, Unknown, Pending, Foss, Ignored]);
        assert_eq!(Proprietary.priority(), 1);
        assert_eq!(Ignored.priority(), 5);
    }

    #[test]
    fn alternatives_count_is_zeroed_for_non_proprietary() {
        let pkg = InstalledPackage::new("org.mozilla.firefox", "Firefox");

        let foss = ClassifiedItem::new(&pkg, ClassificationStatus::Foss, 7);
        assert_eq!(foss.alternatives_count, 0);

        let ignored = ClassifiedItem::new(&pkg, ClassificationStatus::Ignored, 7);
        assert_eq!(ignored.alternatives_count, 0);

        let prop = ClassifiedItem::new(&pkg, ClassificationStatus::Proprietary, 7);
        assert_eq!(prop.alternatives_count, 7);
    }

    #[test]
    fn item_carries_package_fields_through() {
        let pkg = InstalledPackage::new("com.whatsapp", "WhatsApp")
            .with_installer("com.android.vending");
        let item = ClassifiedItem::new(&pkg, ClassificationStatus::Proprietary, 3);

        assert_eq!(item.package_id, "com.whatsapp");
        assert_eq!(item.label, "WhatsApp");
        assert_eq!(item.installer_id.as_deref(), Some("com.android.vending"));
    }
}
