use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, ConfigError, Environment, File};
use log::debug;
use serde::Deserialize;

use crate::repository::RepositoryConfig;

pub const CONFIG_FILE_NAME: &str = "pomcheck.toml";

/// Settings from `pomcheck.toml` next to the root descriptor and `POMCHECK_*` variables.
/// Command line flags are applied on top of this by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PomcheckConfig {
    pub local_repository: Option<PathBuf>,
    pub repository: RepositoryConfig,
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
}

impl PomcheckConfig {
    pub fn load(root_dir: &Path) -> anyhow::Result<Self> {
        let file = root_dir.join(CONFIG_FILE_NAME);
        debug!("Loading configuration, file {}", file.display());
        let raw_config = RawConfig::load(Some(file), None)?;

        Ok(Self {
            local_repository: raw_config.local.repository,
            repository: RepositoryConfig {
                url: raw_config.repository.url.unwrap_or_default(),
                username: raw_config.repository.username.unwrap_or_default(),
                password: raw_config.repository.password.unwrap_or_default(),
                repository_id: raw_config.repository.id,
                enabled: raw_config.repository.enabled.unwrap_or(true),
            },
            concurrency: raw_config.check.concurrency,
            timeout: raw_config.check.timeout.map(Duration::from_secs),
        })
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    repository: RawRepositoryConfig,
    #[serde(default)]
    local: LocalConfig,
    #[serde(default)]
    check: CheckConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawRepositoryConfig {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    id: Option<String>,
    enabled: Option<bool>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct LocalConfig {
    repository: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct CheckConfig {
    concurrency: Option<usize>,
    /// Seconds.
    timeout: Option<u64>,
}

impl RawConfig {
    fn load(
        file: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix("POMCHECK")
                    .separator("_")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
