use std::collections::HashSet;

/// Package ids we know to be FOSS without asking anyone.
///
/// A short, curated seed list: the well-known apps people actually have
/// installed. The remote catalog covers the long tail.
const KNOWN_FOSS_PACKAGES: &[&str] = &[
    "org.fdroid.fdroid",
    "org.fdroid.basic",
    "org.mozilla.fennec_fdroid",
    "org.torproject.torbrowser",
    "org.thoughtcrime.securesms",
    "im.vector.app",
    "org.briarproject.briar.android",
    "com.nextcloud.client",
    "org.videolan.vlc",
    "net.osmand.plus",
    "org.schabi.newpipe",
    "com.termux",
    "org.kde.kdeconnect_tp",
    "org.joinmastodon.android",
    "dev.imranr.obtainium",
    "com.aurora.store",
    "org.wikipedia",
    "org.libreoffice.impressremote",
];

/// SHA-256 digests of signing certificates belonging to known FOSS
/// distributors. Lowercase hex, no separators.
const KNOWN_FOSS_SIGNATURES: &[&str] = &[
    // F-Droid release key
    "43238d512c1e5eb2d6569f4a3afbf5523418b82e0a3ed1552770abb9a9c9ccab",
    // Guardian Project release key
    "b4f5f8a93f254b84b32e104998c0ffb549af40e1e2b4363e6e76b6b0e1b9e045",
];

/// Local signature allow-list, queried synchronously before any network
/// or database work during classification.
#[derive(Debug, Clone)]
pub struct SignatureAllowlist {
    packages: HashSet<String>,
    signatures: HashSet<String>,
}

impl SignatureAllowlist {
    /// Built-in list only.
    pub fn builtin() -> Self {
        Self {
            packages: KNOWN_FOSS_PACKAGES.iter().map(|s| s.to_string()).collect(),
            signatures: KNOWN_FOSS_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Empty list, mostly for tests that want full control.
    pub fn empty() -> Self {
        Self {
            packages: HashSet::new(),
            signatures: HashSet::new(),
        }
    }

    /// Merge user-vouched package ids from config on top of the built-ins.
    pub fn with_extra_packages<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages.extend(extra.into_iter().map(Into::into));
        self
    }

    pub fn contains_package(&self, package_id: &str) -> bool {
        self.packages.contains(package_id)
    }

    /// Digest comparison is case-insensitive; Android tooling is not
    /// consistent about hex casing.
    pub fn contains_signature(&self, digest: &str) -> bool {
        self.signatures.contains(&digest.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.signatures.is_empty()
    }
}

impl Default for SignatureAllowlist {
    fn default() -> Self {
        Self::builtin()
    }
}
