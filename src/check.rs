use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    sync::Arc,
    time::Duration,
};

use log::{debug, error, info, trace, warn};
use thiserror::Error;
use tokio::{
    sync::{mpsc::UnboundedSender, Semaphore},
    task::JoinSet,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    model::{DependencyRecord, StatusUpdate},
    repository::{RemoteError, RepositoryConfig, RepositoryConnection},
};

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Remote repository configuration is invalid: url, username and password are required")]
    ConfigInvalid,
}

/// Outcome counts of one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    pub exists: usize,
    pub missing: usize,
    pub errored: usize,
}

impl CheckSummary {
    pub fn total(&self) -> usize {
        self.exists + self.missing + self.errored
    }
}

impl Display for CheckSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} exist, {} missing, {} failed",
            self.exists, self.missing, self.errored
        )
    }
}

/// Checks which records exist in the remote repository.
///
/// Each record is checked by its own task, at most `concurrency` at a time, and every check is
/// bounded by `timeout`. Tasks only see a copy of their coordinate; the results are written
/// back to the record they were spawned for, and published as [`StatusUpdate`]s when a listener
/// is attached.
pub struct AvailabilityChecker<C> {
    connection: Arc<C>,
    concurrency: usize,
    timeout: Duration,
    events: Option<UnboundedSender<StatusUpdate>>,
}

impl<C: RepositoryConnection> AvailabilityChecker<C> {
    pub fn new(connection: C) -> Self {
        Self::from_shared(Arc::new(connection))
    }

    pub fn from_shared(connection: Arc<C>) -> Self {
        AvailabilityChecker {
            connection,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            events: None,
        }
    }

    /// Values below 1 are treated as 1.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn events(mut self, events: UnboundedSender<StatusUpdate>) -> Self {
        self.events = Some(events);
        self
    }

    /// Checks every record, overwriting whatever status it had.
    ///
    /// Fails only when `config` is invalid, before any record is touched. Once `cancel` fires no
    /// new check starts; checks already running finish and records never started keep their
    /// previous status.
    pub async fn check(
        &self,
        records: &mut [DependencyRecord],
        config: &RepositoryConfig,
        cancel: &CancellationToken,
    ) -> Result<CheckSummary, CheckError> {
        if !config.is_valid() {
            return Err(CheckError::ConfigInvalid);
        }
        let mut summary = CheckSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }

        info!(
            "Checking {} coordinate(s) against {} ({} at a time)",
            records.len(),
            config.base_url(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut in_flight = BTreeSet::new();
        let mut next = 0;

        loop {
            tokio::select! {
                biased;

                Some(joined) = tasks.join_next() => match joined {
                    Ok((index, result)) => {
                        in_flight.remove(&index);
                        self.complete(records, index, result, &mut summary);
                    }
                    Err(err) => error!("Availability check task failed: {}", err),
                },

                permit = semaphore.clone().acquire_owned(),
                    if next < records.len() && !cancel.is_cancelled() =>
                {
                    let Ok(permit) = permit else {
                        break;
                    };
                    if cancel.is_cancelled() {
                        drop(permit);
                        continue;
                    }
                    let index = next;
                    next += 1;

                    let record = &mut records[index];
                    record.begin_check();
                    self.publish(index, record);
                    in_flight.insert(index);

                    let connection = Arc::clone(&self.connection);
                    let coordinate = record.coordinate().clone();
                    let timeout = self.timeout;
                    tasks.spawn(async move {
                        let _permit = permit;
                        trace!("Checking {}", coordinate);
                        let result = time::timeout(timeout, connection.exists(&coordinate))
                            .await
                            .unwrap_or(Err(RemoteError::Timeout(timeout)));
                        (index, result)
                    });
                }

                _ = cancel.cancelled(), if next < records.len() && !cancel.is_cancelled() => {
                    debug!(
                        "Cancellation requested, waiting for {} running check(s)",
                        in_flight.len()
                    );
                }

                else => break,
            }
        }

        if next < records.len() {
            warn!(
                "Check cancelled, {} coordinate(s) were not checked",
                records.len() - next
            );
        }

        // A task that died without reporting must not leave its record in `Checking`.
        for index in in_flight {
            let record = &mut records[index];
            record.fail_check("check aborted before it reported a result".to_string(), None);
            summary.errored += 1;
            self.publish(index, record);
        }

        info!("Check finished: {}", summary);
        Ok(summary)
    }

    fn complete(
        &self,
        records: &mut [DependencyRecord],
        index: usize,
        result: Result<bool, RemoteError>,
        summary: &mut CheckSummary,
    ) {
        let record = &mut records[index];
        match result {
            Ok(exists) => {
                debug!(
                    "{} {}",
                    record.coordinate(),
                    if exists { "exists" } else { "is missing" }
                );
                record.finish_check(exists);
                if exists {
                    summary.exists += 1;
                } else {
                    summary.missing += 1;
                }
            }
            Err(err) => {
                warn!("Could not check {}: {}", record.coordinate(), err);
                record.fail_check(err.to_string(), Some(format!("{err:?}")));
                summary.errored += 1;
            }
        }
        self.publish(index, record);
    }

    fn publish(&self, index: usize, record: &DependencyRecord) {
        if let Some(events) = &self.events {
            if events.send(StatusUpdate::from_record(index, record)).is_err() {
                trace!("Status listener is gone");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use crate::model::{CheckStatus, Coordinate, DependencySnapshot};
    use pretty_assertions::assert_eq;
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };
    use tokio::sync::mpsc;

    #[derive(Clone, Copy, Debug)]
    pub(crate) enum Behavior {
        Exists,
        Missing,
        Fail,
        Hang,
    }

    /// In-memory repository. Coordinates without a behavior are missing.
    #[derive(Default)]
    pub(crate) struct FakeRepository {
        pub behaviors: HashMap<Coordinate, Behavior>,
        pub delay: Duration,
        pub calls: AtomicUsize,
        pub running: AtomicUsize,
        pub max_running: AtomicUsize,
        pub uploads: Mutex<Vec<(Coordinate, Vec<u8>)>>,
    }

    impl FakeRepository {
        pub fn with(behaviors: &[(&Coordinate, Behavior)]) -> Self {
            FakeRepository {
                behaviors: behaviors
                    .iter()
                    .map(|(c, b)| ((*c).clone(), *b))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl RepositoryConnection for FakeRepository {
        async fn exists(&self, coordinate: &Coordinate) -> Result<bool, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            let behavior = self
                .behaviors
                .get(coordinate)
                .copied()
                .unwrap_or(Behavior::Missing);
            if let Behavior::Hang = behavior {
                time::sleep(Duration::from_secs(3600)).await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            match behavior {
                Behavior::Exists => Ok(true),
                Behavior::Missing | Behavior::Hang => Ok(false),
                Behavior::Fail => Err(RemoteError::UnexpectedStatus {
                    status: 503,
                    url: coordinate.to_url_path(),
                }),
            }
        }

        async fn upload(
            &self,
            coordinate: &Coordinate,
            bytes: Vec<u8>,
        ) -> Result<String, RemoteError> {
            match self.behaviors.get(coordinate) {
                Some(Behavior::Fail) => Err(RemoteError::UnexpectedStatus {
                    status: 500,
                    url: coordinate.to_url_path(),
                }),
                _ => {
                    self.uploads
                        .lock()
                        .unwrap()
                        .push((coordinate.clone(), bytes));
                    Ok(format!("https://repo.test/{}", coordinate.to_url_path()))
                }
            }
        }
    }

    pub(crate) fn config() -> RepositoryConfig {
        RepositoryConfig {
            url: "https://repo.test".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
            repository_id: None,
            enabled: true,
        }
    }

    fn records(coordinates: &[&Coordinate]) -> Vec<DependencyRecord> {
        coordinates
            .iter()
            .map(|c| DependencyRecord::new((*c).clone()))
            .collect()
    }

    fn coordinate(artifact: &str) -> Coordinate {
        Coordinate::new("org.test", artifact, "1.0")
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let checker = AvailabilityChecker::new(FakeRepository::default());
        let summary = checker
            .check(&mut [], &config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary, CheckSummary::default());
        assert_eq!(checker.connection.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_config_fails_before_any_check() {
        let x = coordinate("x");
        let checker = AvailabilityChecker::new(FakeRepository::default());
        let mut records = records(&[&x]);
        let config = RepositoryConfig {
            password: "".to_string(),
            ..config()
        };

        let result = checker
            .check(&mut records, &config, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(CheckError::ConfigInvalid)));
        assert_eq!(records[0].status(), CheckStatus::Unknown);
        assert_eq!(checker.connection.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn outcomes_are_attributed_to_their_own_record() {
        let (a, b, c) = (coordinate("a"), coordinate("b"), coordinate("c"));
        let repository = FakeRepository::with(&[(&a, Behavior::Exists), (&c, Behavior::Fail)]);
        let checker = AvailabilityChecker::new(repository);
        let mut records = records(&[&a, &b, &c]);

        let summary = checker
            .check(&mut records, &config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            summary,
            CheckSummary {
                exists: 1,
                missing: 1,
                errored: 1
            }
        );
        assert_eq!(records[0].status(), CheckStatus::Exists);
        assert!(records[0].exists_in_remote());
        assert_eq!(records[1].status(), CheckStatus::Missing);
        assert_eq!(records[2].status(), CheckStatus::Error);
        assert!(records[2].error_message().unwrap().contains("503"));
        assert!(records[2].error_trace().is_some());
    }

    #[tokio::test]
    async fn timeout_is_an_error_for_that_record_only() {
        let (x, y) = (coordinate("x"), coordinate("y"));
        let repository = FakeRepository::with(&[(&x, Behavior::Hang), (&y, Behavior::Exists)]);
        let checker = AvailabilityChecker::new(repository).timeout(Duration::from_millis(100));
        let mut records = records(&[&x, &y]);

        let summary = checker
            .check(&mut records, &config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.errored, 1);
        assert_eq!(summary.exists, 1);
        assert_eq!(records[0].status(), CheckStatus::Error);
        assert!(records[0].error_message().unwrap().contains("No response"));
        assert_eq!(records[1].status(), CheckStatus::Exists);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let coordinates: Vec<Coordinate> = (0..6).map(|i| coordinate(&format!("m{i}"))).collect();
        let repository = FakeRepository {
            delay: Duration::from_millis(30),
            ..Default::default()
        };
        let checker = AvailabilityChecker::new(repository).concurrency(2);
        let mut records = records(&coordinates.iter().collect::<Vec<_>>());

        let summary = checker
            .check(&mut records, &config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.missing, 6);
        assert_eq!(checker.connection.calls.load(Ordering::SeqCst), 6);
        assert!(checker.connection.max_running.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancelled_batch_starts_nothing() {
        let (a, b) = (coordinate("a"), coordinate("b"));
        let checker = AvailabilityChecker::new(FakeRepository::default());
        let mut records = records(&[&a, &b]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = checker.check(&mut records, &config(), &cancel).await.unwrap();

        assert_eq!(summary.total(), 0);
        assert_eq!(checker.connection.calls.load(Ordering::SeqCst), 0);
        assert!(records.iter().all(|r| r.status() == CheckStatus::Unknown));
    }

    #[tokio::test]
    async fn cancellation_mid_batch_keeps_finished_records() {
        let coordinates: Vec<Coordinate> = (0..5).map(|i| coordinate(&format!("m{i}"))).collect();
        let repository = FakeRepository {
            behaviors: coordinates.iter().map(|c| (c.clone(), Behavior::Exists)).collect(),
            delay: Duration::from_millis(50),
            ..Default::default()
        };
        let checker = AvailabilityChecker::new(repository).concurrency(1);
        let mut records = records(&coordinates.iter().collect::<Vec<_>>());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(75)).await;
            trigger.cancel();
        });
        let summary = checker.check(&mut records, &config(), &cancel).await.unwrap();

        let started = checker.connection.calls.load(Ordering::SeqCst);
        assert!(started < coordinates.len());
        assert_eq!(summary.exists, started);
        assert!(records[..started].iter().all(|r| r.status() == CheckStatus::Exists));
        assert!(records[started..].iter().all(|r| r.status() == CheckStatus::Unknown));
    }

    #[tokio::test]
    async fn rerun_overwrites_previous_status() {
        let a = coordinate("a");
        let mut records = records(&[&a]);

        let failing = AvailabilityChecker::new(FakeRepository::with(&[(&a, Behavior::Fail)]));
        failing
            .check(&mut records, &config(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(records[0].status(), CheckStatus::Error);

        let healthy = AvailabilityChecker::new(FakeRepository::with(&[(&a, Behavior::Exists)]));
        healthy
            .check(&mut records, &config(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(records[0].status(), CheckStatus::Exists);
        assert_eq!(records[0].error_message(), None);
    }

    #[tokio::test]
    async fn listener_snapshot_follows_updates() {
        let (a, b) = (coordinate("a"), coordinate("b"));
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let repository = FakeRepository::with(&[(&a, Behavior::Exists)]);
        let checker = AvailabilityChecker::new(repository).events(sender);
        let mut records = records(&[&a, &b]);
        let mut view = DependencySnapshot::new(1, records.clone());

        checker
            .check(&mut records, &config(), &CancellationToken::new())
            .await
            .unwrap();
        drop(checker);

        let mut seen = Vec::new();
        while let Some(update) = receiver.recv().await {
            assert!(view.apply(&update));
            seen.push((update.index, update.status));
        }

        assert_eq!(seen.len(), 4);
        for index in [0, 1] {
            let statuses: Vec<_> = seen
                .iter()
                .filter(|(i, _)| *i == index)
                .map(|(_, s)| *s)
                .collect();
            assert_eq!(statuses[0], CheckStatus::Checking);
            assert!(statuses[1].is_finished());
        }
        assert_eq!(view.records(), &records[..]);
    }

    #[tokio::test]
    async fn listener_snapshot_clears_trace_on_rerun() {
        let a = coordinate("a");
        let mut records = records(&[&a]);
        let mut view = DependencySnapshot::new(1, records.clone());

        for behavior in [Behavior::Fail, Behavior::Exists] {
            let (sender, mut receiver) = mpsc::unbounded_channel();
            let checker =
                AvailabilityChecker::new(FakeRepository::with(&[(&a, behavior)])).events(sender);
            checker
                .check(&mut records, &config(), &CancellationToken::new())
                .await
                .unwrap();
            drop(checker);
            while let Some(update) = receiver.recv().await {
                assert!(view.apply(&update));
            }
            assert_eq!(view.records(), &records[..]);
        }

        assert_eq!(view.records()[0].status(), CheckStatus::Exists);
        assert_eq!(view.records()[0].error_trace(), None);
    }
}
