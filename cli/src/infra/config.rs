//! Infrastructure implementation of the `ConfigStore` port.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "CLONEKEEPER_CONFIG";

/// Prefix of the per-field environment overrides.
const ENV_PREFIX: &str = "CLONEKEEPER_";

/// Platform settings that may be overridden from the environment.
///
/// Each field maps to `CLONEKEEPER_<FIELD>`:
///   - `CLONEKEEPER_HOST`
///   - `CLONEKEEPER_PORT`
///   - `CLONEKEEPER_INSECURE`
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    host: Option<String>,
    port: Option<u16>,
    insecure: Option<bool>,
}

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
#[derive(Debug, Default)]
pub struct YamlConfigStore {
    /// Explicit `--config` path; wins over the environment and the default.
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    fn apply_env(config: &mut AppConfig) -> Result<()> {
        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX)
            .from_env()
            .with_context(|| format!("invalid {ENV_PREFIX}* environment override"))?;
        if let Some(host) = overrides.host {
            config.platform.host = host;
        }
        if let Some(port) = overrides.port {
            config.platform.port = port;
        }
        if let Some(insecure) = overrides.insecure {
            config.platform.insecure = insecure;
        }
        Ok(())
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<AppConfig> {
        let path = self.path()?;
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            AppConfig::default()
        };
        Self::apply_env(&mut config)?;
        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".clonekeeper").join("config.yaml"))
    }
}
