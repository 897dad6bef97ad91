use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use log::info;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::LocalRepository,
    check::{AvailabilityChecker, CheckError, CheckSummary},
    coordinates::CoordinateSet,
    model::{DependencySnapshot, StatusUpdate},
    repository::{HttpRepository, RepositoryConfig, RepositoryConnection},
    resolver::PomModelResolver,
    scanner::{ModuleGraphScanner, ScanOutcome},
    upload::{upload_missing, UploadSummary},
};

mod builder;

pub use builder::PomcheckBuilder;

pub struct Pomcheck {
    root_descriptor: PathBuf,
    local: LocalRepository,
    repository: RepositoryConfig,
    concurrency: usize,
    timeout: Duration,
    process_plugins: bool,
    generation: AtomicU64,
}

impl Pomcheck {
    pub fn builder() -> PomcheckBuilder {
        PomcheckBuilder::default()
    }

    pub fn root_descriptor(&self) -> &Path {
        &self.root_descriptor
    }

    pub fn local_repository(&self) -> &LocalRepository {
        &self.local
    }

    pub fn repository(&self) -> &RepositoryConfig {
        &self.repository
    }

    /// Finds every module descriptor reachable from the root descriptor
    pub fn scan(&self) -> ScanOutcome {
        ModuleGraphScanner::new(PomModelResolver).scan(&self.root_descriptor)
    }

    /// Collects the distinct dependency coordinates of the scanned modules
    pub fn collect(&self, scan: &ScanOutcome) -> CoordinateSet {
        CoordinateSet::collect(&PomModelResolver, &scan.descriptors, self.process_plugins)
    }

    /// Scans the project and returns a fresh snapshot of its dependencies.
    ///
    /// Every call returns a snapshot with a higher version than the previous one.
    pub fn snapshot(&self) -> DependencySnapshot {
        let scan = self.scan();
        info!(
            "Found {} module descriptor(s) under {}",
            scan.descriptors.len(),
            self.root_descriptor.display()
        );
        let coordinates = self.collect(&scan);
        let version = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        coordinates.into_snapshot(version, &self.local)
    }

    /// Checks the snapshot against the configured remote repository
    pub async fn check(
        &self,
        snapshot: &mut DependencySnapshot,
        cancel: &CancellationToken,
        events: Option<UnboundedSender<StatusUpdate>>,
    ) -> anyhow::Result<CheckSummary> {
        let connection = HttpRepository::new(self.repository.clone(), self.timeout)?;
        self.check_with(connection, snapshot, cancel, events).await
    }

    pub async fn check_with<C: RepositoryConnection>(
        &self,
        connection: C,
        snapshot: &mut DependencySnapshot,
        cancel: &CancellationToken,
        events: Option<UnboundedSender<StatusUpdate>>,
    ) -> anyhow::Result<CheckSummary> {
        let mut checker = AvailabilityChecker::new(connection)
            .concurrency(self.concurrency)
            .timeout(self.timeout);
        if let Some(events) = events {
            checker = checker.events(events);
        }
        Ok(checker
            .check(snapshot.records_mut(), &self.repository, cancel)
            .await?)
    }

    /// Uploads the selected records of a checked snapshot that are missing remotely
    pub async fn upload(
        &self,
        snapshot: &mut DependencySnapshot,
        dry_run: bool,
    ) -> anyhow::Result<UploadSummary> {
        let connection = HttpRepository::new(self.repository.clone(), self.timeout)?;
        self.upload_with(&connection, snapshot, dry_run).await
    }

    pub async fn upload_with<C: RepositoryConnection>(
        &self,
        connection: &C,
        snapshot: &mut DependencySnapshot,
        dry_run: bool,
    ) -> anyhow::Result<UploadSummary> {
        if !self.repository.is_valid() {
            return Err(CheckError::ConfigInvalid.into());
        }
        Ok(upload_missing(snapshot, connection, &self.local, dry_run).await)
    }
}
