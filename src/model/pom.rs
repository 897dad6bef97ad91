use std::{collections::BTreeMap, path::Path};

use log::{debug, error};
use serde::Deserialize;

use crate::model::ParseError;

pub const DESCRIPTOR_FILE_NAME: &str = "pom.xml";

/// A `pom.xml` as written on disk, before inheritance and interpolation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub modules: Modules,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub dependency_management: DependencyManagement,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub build: Build,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub relative_path: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Modules {
    #[serde(default)]
    pub module: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct DependencyManagement {
    #[serde(default)]
    pub dependencies: Dependencies,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub dependency: Vec<DeclaredDependency>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredDependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Build {
    #[serde(default)]
    pub plugins: Plugins,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Plugins {
    #[serde(default)]
    pub plugin: Vec<DeclaredPlugin>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredPlugin {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

impl Pom {
    pub fn from_file(path: &Path) -> Result<Pom, ParseError> {
        debug!("Attempting to read descriptor from {}", path.display());
        let contents = std::fs::read_to_string(path)?;

        let pom = Pom::from_xml_str(&contents);
        match &pom {
            Ok(pom) if pom.artifact_id.is_none() => {
                return Err(ParseError::MissingElement(
                    "artifactId".to_string(),
                    path.display().to_string(),
                ))
            }
            Err(err) => error!(
                "Could not build a valid descriptor from {} due to err {err}",
                path.display()
            ),
            _ => {}
        }
        pom
    }

    pub fn from_xml_str(data: &str) -> Result<Pom, ParseError> {
        Ok(quick_xml::de::from_str(data)?)
    }

    /// Group declared here or inherited from the parent reference.
    pub fn group_or_parent_group(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    pub fn version_or_parent_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn parse_aggregator() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <project xmlns="http://maven.apache.org/POM/4.0.0">
              <modelVersion>4.0.0</modelVersion>
              <groupId>org.acme</groupId>
              <artifactId>acme-parent</artifactId>
              <version>1.2.0</version>
              <packaging>pom</packaging>
              <modules>
                <module>core</module>
                <module>app</module>
              </modules>
              <properties>
                <guava.version>33.0-jre</guava.version>
              </properties>
              <dependencyManagement>
                <dependencies>
                  <dependency>
                    <groupId>com.google.guava</groupId>
                    <artifactId>guava</artifactId>
                    <version>${guava.version}</version>
                  </dependency>
                </dependencies>
              </dependencyManagement>
            </project>"#;
        let pom = Pom::from_xml_str(xml).unwrap();

        assert_eq!(pom.artifact_id.as_deref(), Some("acme-parent"));
        assert_eq!(pom.packaging.as_deref(), Some("pom"));
        assert_eq!(pom.modules.module, vec!["core", "app"]);
        assert_eq!(
            pom.properties.get("guava.version").map(String::as_str),
            Some("33.0-jre")
        );
        assert_eq!(
            pom.dependency_management.dependencies.dependency,
            vec![DeclaredDependency {
                group_id: Some("com.google.guava".to_string()),
                artifact_id: Some("guava".to_string()),
                version: Some("${guava.version}".to_string()),
                kind: None,
                scope: None,
            }]
        );
        assert!(pom.dependencies.dependency.is_empty());
    }

    #[test]
    fn parse_child_with_parent_and_plugins() {
        let xml = r#"
            <project>
              <parent>
                <groupId>org.acme</groupId>
                <artifactId>acme-parent</artifactId>
                <version>1.2.0</version>
              </parent>
              <artifactId>acme-core</artifactId>
              <dependencies>
                <dependency>
                  <groupId>org.slf4j</groupId>
                  <artifactId>slf4j-api</artifactId>
                  <version>2.0.9</version>
                </dependency>
                <dependency>
                  <groupId>org.acme</groupId>
                  <artifactId>acme-bom</artifactId>
                  <version>1.0</version>
                  <type>pom</type>
                  <scope>import</scope>
                </dependency>
              </dependencies>
              <build>
                <plugins>
                  <plugin>
                    <artifactId>maven-surefire-plugin</artifactId>
                    <version>3.2.2</version>
                  </plugin>
                </plugins>
              </build>
            </project>"#;
        let pom = Pom::from_xml_str(xml).unwrap();

        assert_eq!(pom.group_id, None);
        assert_eq!(pom.group_or_parent_group(), Some("org.acme"));
        assert_eq!(pom.version_or_parent_version(), Some("1.2.0"));
        assert_eq!(pom.dependencies.dependency.len(), 2);
        assert_eq!(pom.dependencies.dependency[1].kind.as_deref(), Some("pom"));
        assert_eq!(pom.dependencies.dependency[1].scope.as_deref(), Some("import"));
        assert_eq!(
            pom.build.plugins.plugin,
            vec![DeclaredPlugin {
                group_id: None,
                artifact_id: Some("maven-surefire-plugin".to_string()),
                version: Some("3.2.2".to_string()),
            }]
        );
    }

    #[test]
    fn parse_broken_xml() {
        assert!(Pom::from_xml_str("<project><artifactId>x</project>").is_err());
    }

    #[test]
    fn missing_artifact_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pom.xml");
        std::fs::write(&path, "<project><groupId>org.acme</groupId></project>").unwrap();
        assert!(matches!(
            Pom::from_file(&path),
            Err(ParseError::MissingElement(element, _)) if element == "artifactId"
        ));
    }
}
