use std::{env, path::PathBuf, sync::atomic::AtomicU64, time::Duration};

use crate::{
    cache::LocalRepository,
    check::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT},
    model::pom::DESCRIPTOR_FILE_NAME,
    repository::RepositoryConfig,
    Pomcheck,
};

#[derive(Default)]
pub struct PomcheckBuilder {
    root_descriptor: Option<PathBuf>,
    local_repository: Option<PathBuf>,
    repository: Option<RepositoryConfig>,
    concurrency: Option<usize>,
    timeout: Option<Duration>,
    process_plugins: bool,
}

impl PomcheckBuilder {
    /// Root module descriptor, or the directory holding it.
    ///
    /// Defaults to `pom.xml` in the current directory.
    pub fn root_descriptor(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_descriptor = Some(path.into());
        self
    }

    /// Location of the local artifact repository.
    ///
    /// Defaults to `$HOME/.m2/repository`.
    pub fn local_repository(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_repository = Some(path.into());
        self
    }

    pub fn repository(mut self, config: RepositoryConfig) -> Self {
        self.repository = Some(config);
        self
    }

    /// Maximum number of remote checks running at the same time.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Time limit of a single remote request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Also collect the build plugins of every module.
    pub fn process_plugins(mut self, process_plugins: bool) -> Self {
        self.process_plugins = process_plugins;
        self
    }

    pub fn try_build(self) -> anyhow::Result<Pomcheck> {
        let Self {
            root_descriptor,
            local_repository,
            repository,
            concurrency,
            timeout,
            process_plugins,
        } = self;

        let root_descriptor = match root_descriptor {
            Some(path) if path.is_dir() => path.join(DESCRIPTOR_FILE_NAME),
            Some(path) => path,
            None => env::current_dir()?.join(DESCRIPTOR_FILE_NAME),
        };

        let local = match local_repository {
            Some(location) => LocalRepository::new(location)?,
            None => LocalRepository::from_home()?,
        };

        Ok(Pomcheck {
            root_descriptor,
            local,
            repository: repository.unwrap_or_else(|| RepositoryConfig {
                enabled: true,
                ..Default::default()
            }),
            concurrency: concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            process_plugins,
            generation: AtomicU64::new(0),
        })
    }
}
