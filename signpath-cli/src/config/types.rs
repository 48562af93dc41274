use serde::Deserialize;
use signpath_core::ProgressConfig;
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSignpathConfig {
    #[serde(default)]
    pub store: RawStoreConfig,

    #[serde(default)]
    pub progress: RawProgressConfig,

    #[serde(default)]
    pub catalog: RawCatalogConfig,
}

/// `[store]` section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStoreConfig {
    /// Local database file
    pub path: Option<PathBuf>,

    /// Remote Turso database URL; takes precedence over `path`
    pub url: Option<String>,

    /// Token for the remote database
    pub auth_token: Option<String>,
}

/// `[progress]` section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProgressConfig {
    pub perfect_threshold: Option<f64>,
    pub max_conflict_retries: Option<u32>,
    pub default_daily_goal: Option<u32>,
    pub recent_completion_window: Option<usize>,
}

/// `[catalog]` section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCatalogConfig {
    pub path: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone)]
pub struct SignpathConfig {
    pub store: StoreConfig,
    pub progress: ProgressConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Local { path: PathBuf },
    Remote { url: String, auth_token: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

impl Default for SignpathConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::Local {
                path: signpath_paths::default_database_path(),
            },
            progress: ProgressConfig::default(),
            catalog: CatalogConfig {
                path: signpath_paths::default_catalog_path(),
            },
        }
    }
}
