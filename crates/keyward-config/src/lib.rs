use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use keyward_core::secret::{CostMode, HashCost};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const APP_DIR: &str = "keyward";
const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable that selects the hashing mode, overriding the config file.
pub const HASH_MODE_ENV: &str = "KEYWARD_HASH_MODE";

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub hashing: HashingConfig,
}

#[derive(Debug, Clone, Default)]
pub struct HashingConfig {
    pub mode: CostMode,
    pub cost: Option<HashCost>,
}

impl AppConfig {
    /// The cost every secret-setting event should hash with.
    pub fn hash_cost(&self) -> HashCost {
        match (self.hashing.mode, self.hashing.cost) {
            (CostMode::Production, Some(cost)) => cost,
            (mode, _) => mode.cost(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("config file permissions too permissive: {0}")]
    InsecurePermissions(PathBuf),
    #[error("invalid hashing mode: {0:?} (expected \"production\" or \"fast-test\")")]
    InvalidHashMode(String),
    #[error("invalid hashing cost value: {0}")]
    InvalidCost(u32),
    #[error("hashing cost {0} cannot be combined with fast-test mode")]
    CostWithFastTest(u32),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    hashing: Option<HashingFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HashingFile {
    mode: Option<CostMode>,
    cost: Option<u32>,
}

/// Loads the config file (if any) and applies the `KEYWARD_HASH_MODE` override.
pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let config = load_file(config_path)?;
    let config = apply_mode_override(config, env::var(HASH_MODE_ENV).ok())?;
    if config.hashing.mode == CostMode::FastTest {
        warn!("secret hashing uses the minimal fast-test cost");
    }
    debug!(
        mode = %config.hashing.mode,
        cost = config.hash_cost().get(),
        "hashing configured"
    );
    Ok(config)
}

fn load_file(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    match load_at_path(&path, required)? {
        Some(config) => Ok(config),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(path));
            }
            Ok(path)
        }
        None => {
            let base = if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
                let path = PathBuf::from(dir);
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidConfigPath(path));
                }
                path
            } else {
                let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
                home.join(".config")
            };
            Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
        }
    }
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    ensure_permissions(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(parsed: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(hashing) = parsed.hashing {
        if let Some(mode) = hashing.mode {
            config.hashing.mode = mode;
        }
        if let Some(cost) = hashing.cost {
            if config.hashing.mode == CostMode::FastTest {
                return Err(ConfigError::CostWithFastTest(cost));
            }
            let cost = HashCost::new(cost).map_err(|_| ConfigError::InvalidCost(cost))?;
            config.hashing.cost = Some(cost);
        }
    }

    Ok(config)
}

/// Applies an environment-selected mode. Switching to fast-test drops any configured
/// production cost.
fn apply_mode_override(mut config: AppConfig, value: Option<String>) -> Result<AppConfig> {
    let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
        return Ok(config);
    };
    let mode = value
        .parse::<CostMode>()
        .map_err(|_| ConfigError::InvalidHashMode(value.trim().to_string()))?;
    if mode == CostMode::FastTest {
        config.hashing.cost = None;
    }
    config.hashing.mode = mode;
    Ok(config)
}

#[cfg(unix)]
fn ensure_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(ConfigError::InsecurePermissions(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        apply_mode_override, load_at_path, merge_config, AppConfig, ConfigError, ConfigFile,
        HashingFile,
    };
    use keyward_core::secret::{CostMode, DEFAULT_COST, MIN_COST};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn restrict_permissions(path: &Path) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path).expect("metadata").permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).expect("chmod");
        }
    }

    #[test]
    fn default_config_uses_production_cost() {
        let config = AppConfig::default();
        assert_eq!(config.hashing.mode, CostMode::Production);
        assert_eq!(config.hash_cost().get(), DEFAULT_COST);
    }

    #[test]
    fn merge_config_applies_values() {
        let parsed = ConfigFile {
            hashing: Some(HashingFile {
                mode: Some(CostMode::Production),
                cost: Some(10),
            }),
        };
        let merged = merge_config(parsed).expect("merge");
        assert_eq!(merged.hash_cost().get(), 10);
    }

    #[test]
    fn merge_config_rejects_cost_out_of_range() {
        let parsed = ConfigFile {
            hashing: Some(HashingFile {
                mode: None,
                cost: Some(2),
            }),
        };
        let err = merge_config(parsed).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCost(2)));
    }

    #[test]
    fn merge_config_rejects_cost_with_fast_test() {
        let parsed = ConfigFile {
            hashing: Some(HashingFile {
                mode: Some(CostMode::FastTest),
                cost: Some(12),
            }),
        };
        let err = merge_config(parsed).unwrap_err();
        assert!(matches!(err, ConfigError::CostWithFastTest(12)));
    }

    #[test]
    fn env_override_selects_fast_test() {
        let parsed = ConfigFile {
            hashing: Some(HashingFile {
                mode: None,
                cost: Some(11),
            }),
        };
        let config = merge_config(parsed).expect("merge");
        let config =
            apply_mode_override(config, Some("fast-test".to_string())).expect("override");
        assert_eq!(config.hashing.mode, CostMode::FastTest);
        assert_eq!(config.hash_cost().get(), MIN_COST);
    }

    #[test]
    fn env_override_ignores_empty_and_rejects_unknown() {
        let config = apply_mode_override(AppConfig::default(), Some("  ".to_string()))
            .expect("empty ignored");
        assert_eq!(config.hashing.mode, CostMode::Production);

        let err = apply_mode_override(AppConfig::default(), Some("turbo".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHashMode(ref value) if value == "turbo"));
    }

    #[test]
    fn load_at_path_requires_file_when_requested() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("config.toml");
        let err = load_at_path(&missing, true).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("config file not found"));
    }

    #[test]
    fn load_at_path_parses_toml() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[hashing]\nmode = \"fast-test\"\n").expect("write config");
        restrict_permissions(&path);

        let config = load_at_path(&path, true).expect("load").expect("config");
        assert_eq!(config.hashing.mode, CostMode::FastTest);
        assert_eq!(config.hash_cost().get(), MIN_COST);
    }

    #[test]
    fn load_at_path_rejects_unknown_keys() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[hashing]\nrounds = 4\n").expect("write config");
        restrict_permissions(&path);

        let err = load_at_path(&path, true).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn load_at_path_rejects_world_readable_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[hashing]\nmode = \"production\"\n").expect("write config");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

        let err = load_at_path(&path, true).unwrap_err();
        assert!(matches!(err, ConfigError::InsecurePermissions(_)));
    }
}
