use super::types::{
    CatalogConfig, RawCatalogConfig, RawProgressConfig, RawSignpathConfig, RawStoreConfig,
    SignpathConfig, StoreConfig,
};
use anyhow::{Context, Result, bail};
use signpath_core::ProgressConfig;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<SignpathConfig> {
        Self::load_layers(Some(&Self::user_config_path()), &Self::project_config_path())
    }

    /// Load from explicit layer paths. Missing files are skipped.
    pub fn load_layers(user_path: Option<&Path>, project_path: &Path) -> Result<SignpathConfig> {
        let mut raw = RawSignpathConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(user_path)?);
        }

        // Layer 2: Project config
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(project_path)?);
        }

        Self::finalize(raw)
    }

    fn read_raw(path: &Path) -> Result<RawSignpathConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Get user config path (~/.config/signpath/config.toml)
    pub fn user_config_path() -> PathBuf {
        signpath_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with SIGNPATH_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("SIGNPATH_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".signpath/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawSignpathConfig, overlay: RawSignpathConfig) -> RawSignpathConfig {
        RawSignpathConfig {
            store: RawStoreConfig {
                path: overlay.store.path.or(base.store.path),
                url: overlay.store.url.or(base.store.url),
                auth_token: overlay.store.auth_token.or(base.store.auth_token),
            },
            progress: RawProgressConfig {
                perfect_threshold: overlay
                    .progress
                    .perfect_threshold
                    .or(base.progress.perfect_threshold),
                max_conflict_retries: overlay
                    .progress
                    .max_conflict_retries
                    .or(base.progress.max_conflict_retries),
                default_daily_goal: overlay
                    .progress
                    .default_daily_goal
                    .or(base.progress.default_daily_goal),
                recent_completion_window: overlay
                    .progress
                    .recent_completion_window
                    .or(base.progress.recent_completion_window),
            },
            catalog: RawCatalogConfig {
                path: overlay.catalog.path.or(base.catalog.path),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawSignpathConfig) -> Result<SignpathConfig> {
        let defaults = SignpathConfig::default();

        let store = match (raw.store.url, raw.store.auth_token) {
            (Some(url), Some(auth_token)) => StoreConfig::Remote { url, auth_token },
            (Some(url), None) => bail!("store.url {url} is set but store.auth_token is missing"),
            (None, _) => match raw.store.path {
                Some(path) => StoreConfig::Local { path },
                None => defaults.store,
            },
        };

        let base = ProgressConfig::default();
        let progress = ProgressConfig {
            perfect_threshold: raw
                .progress
                .perfect_threshold
                .unwrap_or(base.perfect_threshold),
            max_conflict_retries: raw
                .progress
                .max_conflict_retries
                .unwrap_or(base.max_conflict_retries),
            default_daily_goal: raw
                .progress
                .default_daily_goal
                .unwrap_or(base.default_daily_goal),
            recent_completion_window: raw
                .progress
                .recent_completion_window
                .unwrap_or(base.recent_completion_window),
        };
        if !(0.0..=1.0).contains(&progress.perfect_threshold) {
            bail!(
                "progress.perfect_threshold must be between 0 and 1, got {}",
                progress.perfect_threshold
            );
        }

        let catalog = CatalogConfig {
            path: raw.catalog.path.unwrap_or(defaults.catalog.path),
        };

        Ok(SignpathConfig {
            store,
            progress,
            catalog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");

        let config = ConfigLoader::load_layers(Some(&missing), &missing).unwrap();

        assert_eq!(config.progress, ProgressConfig::default());
        assert_eq!(config.store, SignpathConfig::default().store);
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            r#"
[store]
path = "/var/lib/signpath/user.db"

[progress]
max_conflict_retries = 5
default_daily_goal = 2
"#,
        );
        let project = write(
            &temp_dir,
            "project.toml",
            r#"
[progress]
default_daily_goal = 7

[catalog]
path = "lessons.toml"
"#,
        );

        let config = ConfigLoader::load_layers(Some(&user), &project).unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Local {
                path: PathBuf::from("/var/lib/signpath/user.db")
            }
        );
        assert_eq!(config.progress.max_conflict_retries, 5);
        assert_eq!(config.progress.default_daily_goal, 7);
        assert_eq!(config.catalog.path, PathBuf::from("lessons.toml"));
    }

    #[test]
    fn test_remote_store_requires_token() {
        let temp_dir = TempDir::new().unwrap();
        let project = write(
            &temp_dir,
            "project.toml",
            "[store]\nurl = \"libsql://db.example.turso.io\"\n",
        );

        let err = ConfigLoader::load_layers(None, &project).unwrap_err();

        assert!(err.to_string().contains("auth_token"));
    }

    #[test]
    fn test_remote_store_wins_over_path() {
        let temp_dir = TempDir::new().unwrap();
        let project = write(
            &temp_dir,
            "project.toml",
            r#"
[store]
path = "local.db"
url = "libsql://db.example.turso.io"
auth_token = "t"
"#,
        );

        let config = ConfigLoader::load_layers(None, &project).unwrap();

        assert!(matches!(config.store, StoreConfig::Remote { .. }));
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let project = write(
            &temp_dir,
            "project.toml",
            "[progress]\nperfect_threshold = 1.5\n",
        );

        assert!(ConfigLoader::load_layers(None, &project).is_err());
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let project = write(&temp_dir, "project.toml", "[progress\n");

        assert!(ConfigLoader::load_layers(None, &project).is_err());
    }

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base = RawSignpathConfig {
            catalog: RawCatalogConfig {
                path: Some(PathBuf::from("base.toml")),
            },
            ..Default::default()
        };

        let merged = ConfigLoader::merge_raw(base, RawSignpathConfig::default());

        assert_eq!(merged.catalog.path, Some(PathBuf::from("base.toml")));
    }

    #[test]
    #[serial]
    fn test_project_config_path_env_override() {
        let temp_dir = TempDir::new().unwrap();
        // SAFETY: serialized with every other test touching this variable.
        unsafe { std::env::set_var("SIGNPATH_PROJECT_CONFIG_DIR", temp_dir.path()) };

        let path = ConfigLoader::project_config_path();

        unsafe { std::env::remove_var("SIGNPATH_PROJECT_CONFIG_DIR") };
        assert_eq!(path, temp_dir.path().join("config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_default() {
        unsafe { std::env::remove_var("SIGNPATH_PROJECT_CONFIG_DIR") };

        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".signpath/config.toml")
        );
    }
}
