use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Remote availability of a single coordinate.
///
/// `Unknown -> Checking -> {Exists, Missing, Error}`. A new check restarts at `Checking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    #[default]
    Unknown,
    Checking,
    Exists,
    Missing,
    Error,
}

impl CheckStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, CheckStatus::Exists | CheckStatus::Missing | CheckStatus::Error)
    }
}

impl Display for CheckStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Unknown => f.write_str("UNKNOWN"),
            CheckStatus::Checking => f.write_str("CHECKING"),
            CheckStatus::Exists => f.write_str("EXISTS"),
            CheckStatus::Missing => f.write_str("MISSING"),
            CheckStatus::Error => f.write_str("ERROR"),
        }
    }
}

/// A discovered coordinate together with what is known about its availability.
///
/// `status` and the error fields are owned by the availability checker. Consumers read them
/// and may toggle `selected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    coordinate: Coordinate,
    pub local_path: Option<PathBuf>,
    pub selected: bool,
    pub upload_url: Option<String>,
    exists_in_remote: bool,
    status: CheckStatus,
    error_message: Option<String>,
    error_trace: Option<String>,
}

impl DependencyRecord {
    pub fn new(coordinate: Coordinate) -> Self {
        DependencyRecord {
            coordinate,
            local_path: None,
            selected: true,
            upload_url: None,
            exists_in_remote: false,
            status: CheckStatus::Unknown,
            error_message: None,
            error_trace: None,
        }
    }

    pub fn with_local_path(mut self, path: PathBuf) -> Self {
        self.local_path = Some(path);
        self
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn exists_in_remote(&self) -> bool {
        self.exists_in_remote
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn error_trace(&self) -> Option<&str> {
        self.error_trace.as_deref()
    }

    pub(crate) fn begin_check(&mut self) {
        self.status = CheckStatus::Checking;
        self.exists_in_remote = false;
        self.error_message = None;
        self.error_trace = None;
    }

    pub(crate) fn finish_check(&mut self, exists: bool) {
        self.exists_in_remote = exists;
        self.status = if exists {
            CheckStatus::Exists
        } else {
            CheckStatus::Missing
        };
    }

    pub(crate) fn fail_check(&mut self, message: String, trace: Option<String>) {
        self.exists_in_remote = false;
        self.status = CheckStatus::Error;
        self.error_message = Some(message);
        self.error_trace = trace;
    }

    /// Upload failures don't change the remote status, only the message.
    pub(crate) fn fail_upload(&mut self, message: String) {
        self.error_message = Some(message);
    }
}

/// Immutable status change emitted by the checker for a record at `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub index: usize,
    pub coordinate: Coordinate,
    pub status: CheckStatus,
    pub exists_in_remote: bool,
    pub error_message: Option<String>,
    pub error_trace: Option<String>,
}

impl StatusUpdate {
    pub(crate) fn from_record(index: usize, record: &DependencyRecord) -> Self {
        StatusUpdate {
            index,
            coordinate: record.coordinate.clone(),
            status: record.status,
            exists_in_remote: record.exists_in_remote,
            error_message: record.error_message.clone(),
            error_trace: record.error_trace.clone(),
        }
    }
}

/// The records of one scan, in order of first discovery.
///
/// Every scan produces a new snapshot with a higher `version`; nothing holds a global list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySnapshot {
    version: u64,
    records: Vec<DependencyRecord>,
}

impl DependencySnapshot {
    pub fn new(version: u64, records: Vec<DependencyRecord>) -> Self {
        DependencySnapshot { version, records }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn records(&self) -> &[DependencyRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [DependencyRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Applies an update produced by the checker for this snapshot.
    ///
    /// Returns `false` when the update doesn't belong here (unknown index or another coordinate).
    pub fn apply(&mut self, update: &StatusUpdate) -> bool {
        match self.records.get_mut(update.index) {
            Some(record) if record.coordinate == update.coordinate => {
                record.status = update.status;
                record.exists_in_remote = update.exists_in_remote;
                record.error_message = update.error_message.clone();
                record.error_trace = update.error_trace.clone();
                true
            }
            _ => false,
        }
    }
}
