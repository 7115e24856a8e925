use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
///
/// Loaded from a TOML file under the platform config directory; missing
/// fields fall back to serde defaults so old config files keep working.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

impl Config {
    /// Load config from the default location, or defaults if none exists.
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// XDG config dir on Unix-like systems, AppData on Windows
    fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::Config("Could not find config directory".into()))?
            .join("sovscan");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the hosted catalog backend
    #[serde(default = "default_catalog_url")]
    pub url: String,

    /// Anon API key for unauthenticated reads
    #[serde(default)]
    pub anon_key: String,
}

fn default_catalog_url() -> String {
    "https://catalog.sovscan.org".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            anon_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in hours
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u64,

    /// Where the SQLite mirror lives; defaults next to the config file
    #[serde(default)]
    pub db_path: Option<String>,

    /// Serve the cache even when stale (no network, or user preference)
    #[serde(default)]
    pub offline_mode: bool,
}

fn default_cache_ttl() -> u64 {
    24 // catalog membership moves slowly, a day is plenty fresh
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_cache_ttl(),
            db_path: None,
            offline_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Installer package ids trusted as FOSS distribution channels.
    /// Anything installed by one of these is FOSS, no lookup needed.
    #[serde(default = "default_foss_installers")]
    pub foss_installers: Vec<String>,

    /// Extra package ids the user vouches for, merged into the built-in
    /// signature allow-list
    #[serde(default)]
    pub extra_allowlist: Vec<String>,
}

fn default_foss_installers() -> Vec<String> {
    vec![
        "org.fdroid.fdroid".to_string(),
        "org.fdroid.basic".to_string(),
    ]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            foss_installers: default_foss_installers(),
            extra_allowlist: Vec::new(),
        }
    }
}
