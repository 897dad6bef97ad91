use std::path::{Path, PathBuf};

use home::home_dir;
use log::trace;
use thiserror::Error;

use crate::model::{Coordinate, DependencyRecord};

const DEFAULT_LOCAL_REPOSITORY: &str = ".m2/repository";

/// The local artifact cache, laid out as `<group segments>/<artifact>/<version>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    location: PathBuf,
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Local repository location {location} is not a directory")]
    BadLocation { location: String },
    #[error("Could not find the home directory, define $HOME or configure the local repository")]
    NoHome,
}

impl LocalRepository {
    /// A location that doesn't exist yet is accepted, it simply holds no artifacts.
    pub fn new(location: PathBuf) -> Result<LocalRepository, CacheError> {
        if location.exists() && !location.is_dir() {
            return Err(CacheError::BadLocation {
                location: location.to_str().unwrap_or("").to_string(),
            });
        }
        Ok(LocalRepository { location })
    }

    /// `$HOME/.m2/repository`
    pub fn from_home() -> Result<LocalRepository, CacheError> {
        Self::new(default_location().ok_or(CacheError::NoHome)?)
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn expected_path(&self, coordinate: &Coordinate) -> PathBuf {
        expected_path(coordinate, &self.location)
    }

    /// The record's own path if a file is there, otherwise where the artifact would be.
    pub fn actual_or_expected_path(&self, record: &DependencyRecord) -> PathBuf {
        match &record.local_path {
            Some(path) if path.is_file() => path.clone(),
            _ => self.expected_path(record.coordinate()),
        }
    }

    /// Stats the filesystem only. The record's check status is left alone.
    pub fn local_file_exists(&self, record: &DependencyRecord) -> bool {
        let path = self.actual_or_expected_path(record);
        let exists = path.is_file();
        trace!("Local file {} exists: {}", path.display(), exists);
        exists
    }
}

pub fn default_location() -> Option<PathBuf> {
    home_dir().map(|home| home.join(DEFAULT_LOCAL_REPOSITORY))
}

/// Path `coordinate` would occupy under `repo_root`. Pure, no I/O.
pub fn expected_path(coordinate: &Coordinate, repo_root: &Path) -> PathBuf {
    repo_root.join(coordinate.to_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn expected_path_follows_layout() {
        let coordinate = Coordinate::new("org.foo", "bar", "1.0");
        assert_eq!(
            expected_path(&coordinate, Path::new("/repo")),
            PathBuf::from("/repo/org/foo/bar/1.0/bar-1.0.jar")
        );
    }

    #[test]
    fn expected_path_is_stable() {
        let coordinate = Coordinate::new("com.example.deep.group", "lib", "3.2.1");
        let root = Path::new("/var/cache/m2");
        assert_eq!(
            expected_path(&coordinate, root),
            expected_path(&coordinate, root)
        );
    }

    #[test]
    fn version_change_only_touches_version_segments() {
        let root = Path::new("/repo");
        let old = expected_path(&Coordinate::new("org.foo", "bar", "1.0"), root);
        let new = expected_path(&Coordinate::new("org.foo", "bar", "2.0"), root);

        assert_eq!(old.parent().unwrap().parent(), new.parent().unwrap().parent());
        assert_eq!(new, PathBuf::from("/repo/org/foo/bar/2.0/bar-2.0.jar"));
    }

    #[test]
    fn pom_packaging_uses_pom_extension() {
        let coordinate = Coordinate::new("org.foo", "parent", "7").with_packaging("pom");
        let path = expected_path(&coordinate, Path::new("/repo"));
        assert_eq!(path, PathBuf::from("/repo/org/foo/parent/7/parent-7.pom"));
    }

    #[test]
    fn other_packaging_is_the_extension() {
        let coordinate = Coordinate::new("org.foo", "app", "1").with_packaging("war");
        assert!(expected_path(&coordinate, Path::new("/r"))
            .to_string_lossy()
            .ends_with("app-1.war"));
    }

    #[test]
    fn local_presence() {
        let dir = tempfile::tempdir().unwrap();
        let repository = LocalRepository::new(dir.path().to_path_buf()).unwrap();
        let coordinate = Coordinate::new("org.foo", "bar", "1.0");
        let record = DependencyRecord::new(coordinate.clone());

        assert!(!repository.local_file_exists(&record));
        assert_eq!(
            repository.actual_or_expected_path(&record),
            dir.path().join("org/foo/bar/1.0/bar-1.0.jar")
        );

        let path = repository.expected_path(&coordinate);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"jar").unwrap();
        assert!(repository.local_file_exists(&record));
    }

    #[test]
    fn actual_path_wins_over_expected() {
        let dir = tempfile::tempdir().unwrap();
        let repository = LocalRepository::new(dir.path().join("m2")).unwrap();
        let elsewhere = dir.path().join("bar.jar");
        fs::write(&elsewhere, b"jar").unwrap();

        let record = DependencyRecord::new(Coordinate::new("org.foo", "bar", "1.0"))
            .with_local_path(elsewhere.clone());
        assert_eq!(repository.actual_or_expected_path(&record), elsewhere);
        assert!(repository.local_file_exists(&record));
    }

    #[test]
    fn file_is_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"").unwrap();
        assert!(matches!(
            LocalRepository::new(file),
            Err(CacheError::BadLocation { .. })
        ));
    }
}
