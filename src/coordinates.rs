use indexmap::IndexSet;
use log::{debug, info, warn};

use crate::{
    cache::LocalRepository,
    model::{Coordinate, DependencyRecord, DependencySnapshot},
    resolver::ModelResolver,
    scanner::{ModuleDescriptorRef, ScanWarning},
};

/// Distinct dependency coordinates of a set of modules, in order of first declaration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoordinateSet {
    coordinates: IndexSet<Coordinate>,
    warnings: Vec<ScanWarning>,
}

impl CoordinateSet {
    /// Resolves every descriptor and gathers the coordinates it declares.
    /// Descriptors that cannot be resolved are skipped and reported in [`CoordinateSet::warnings`].
    pub fn collect<'a, R: ModelResolver>(
        resolver: &R,
        descriptors: impl IntoIterator<Item = &'a ModuleDescriptorRef>,
        process_plugins: bool,
    ) -> CoordinateSet {
        let mut set = CoordinateSet::default();
        for descriptor in descriptors {
            match resolver.resolve(descriptor.as_path(), process_plugins) {
                Ok(Some(model)) => {
                    let before = set.len();
                    set.extend(model.dependencies);
                    debug!(
                        "{} added {} new coordinate(s)",
                        model.coordinate,
                        set.len() - before
                    );
                }
                Ok(None) => set.skip(descriptor, "no effective model could be built".to_string()),
                Err(err) => set.skip(descriptor, format!("{err:#}")),
            }
        }
        info!("Collected {} distinct coordinate(s)", set.len());
        set
    }

    fn skip(&mut self, descriptor: &ModuleDescriptorRef, reason: String) {
        let warning = ScanWarning::Resolution {
            descriptor: descriptor.as_path().to_path_buf(),
            reason,
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
        self.coordinates.iter()
    }

    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// One fresh record per coordinate. `local_path` is only set when the artifact is present in
    /// the local repository; [`LocalRepository::actual_or_expected_path`] gives the expected one.
    pub fn into_snapshot(self, version: u64, local: &LocalRepository) -> DependencySnapshot {
        let records = self
            .coordinates
            .into_iter()
            .map(|coordinate| {
                let path = local.expected_path(&coordinate);
                let record = DependencyRecord::new(coordinate);
                if path.is_file() {
                    record.with_local_path(path)
                } else {
                    record
                }
            })
            .collect();
        DependencySnapshot::new(version, records)
    }
}

impl Extend<Coordinate> for CoordinateSet {
    fn extend<T: IntoIterator<Item = Coordinate>>(&mut self, iter: T) {
        self.coordinates.extend(iter)
    }
}

impl FromIterator<Coordinate> for CoordinateSet {
    fn from_iter<T: IntoIterator<Item = Coordinate>>(iter: T) -> Self {
        CoordinateSet {
            coordinates: iter.into_iter().collect(),
            warnings: Vec::new(),
        }
    }
}
