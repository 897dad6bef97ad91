use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
    str::FromStr,
    sync::OnceLock,
};

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::model::ParseError;

pub const DEFAULT_PACKAGING: &str = "jar";
pub const POM_PACKAGING: &str = "pom";

/// Identifies an artifact by group, artifact, version and packaging.
///
/// Fields are private so a coordinate can't change once it is used as a set or map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Coordinate {
    group: String,
    artifact: String,
    version: String,
    packaging: String,
}

impl Coordinate {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Coordinate {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
            packaging: DEFAULT_PACKAGING.to_string(),
        }
    }

    /// Returns a copy of this coordinate with another packaging.
    /// A blank packaging falls back to `jar`.
    pub fn with_packaging(&self, packaging: impl Into<String>) -> Self {
        let packaging = packaging.into();
        let packaging = if packaging.trim().is_empty() {
            DEFAULT_PACKAGING.to_string()
        } else {
            packaging
        };
        Coordinate {
            packaging,
            ..self.clone()
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn packaging(&self) -> &str {
        &self.packaging
    }

    /// `group:artifact:version`
    pub fn gav(&self) -> String {
        format!("{}:{}:{}", self.group, self.artifact, self.version)
    }

    /// File name of the artifact inside its version directory.
    /// The packaging doubles as the extension, so `pom` packaging yields
    /// `<artifact>-<version>.pom`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.artifact, self.version, self.packaging)
    }

    /// Repository layout path relative to a repository root,
    /// `org/foo/bar/1.0/bar-1.0.jar` for `org.foo:bar:1.0:jar`.
    pub fn to_path(&self) -> PathBuf {
        let mut result = PathBuf::new();
        for segment in self.group.split('.') {
            result.push(segment);
        }
        result.push(&self.artifact);
        result.push(&self.version);
        result.push(self.file_name());
        result
    }

    /// Same layout as [`Coordinate::to_path`] but always `/` separated, for URLs.
    pub fn to_url_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.file_name()
        )
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group, self.artifact, self.version, self.packaging
        )
    }
}

impl FromStr for Coordinate {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(
                r"^(?P<group>[^:\s]+):(?P<artifact>[^:\s]+):(?P<version>[^:\s]+)(?::(?P<packaging>[^:\s]+))?$",
            )
            .unwrap()
        });
        let captures = re
            .captures(value.trim())
            .ok_or_else(|| ParseError::InvalidCoordinate(value.to_string()))?;

        let coordinate = Coordinate::new(
            &captures["group"],
            &captures["artifact"],
            &captures["version"],
        );
        Ok(match captures.name("packaging") {
            Some(packaging) => coordinate.with_packaging(packaging.as_str()),
            None => coordinate,
        })
    }
}
