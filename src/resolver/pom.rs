use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use log::{debug, trace, warn};
use regex_lite::{Captures, Regex};

use crate::model::{
    coordinate::DEFAULT_PACKAGING,
    pom::{DeclaredDependency, ParentRef, Pom, DESCRIPTOR_FILE_NAME},
    Coordinate,
};

use super::{EffectiveModel, ModelResolver};

const DEFAULT_PARENT_PATH: &str = "../pom.xml";
const DEFAULT_PLUGIN_GROUP: &str = "org.apache.maven.plugins";
const IMPORT_SCOPE: &str = "import";
const MAX_PARENT_DEPTH: usize = 32;
const MAX_INTERPOLATION_PASSES: usize = 10;

/// Builds effective models from `pom.xml` files on disk.
///
/// Parents are followed through `relativePath` (default `../pom.xml`) as long as the file found
/// there is the declared parent. Parents that only live in a repository are not fetched: their
/// coordinates still provide the inherited group and version, but nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct PomModelResolver;

impl ModelResolver for PomModelResolver {
    fn resolve(
        &self,
        descriptor: &Path,
        process_plugins: bool,
    ) -> anyhow::Result<Option<EffectiveModel>> {
        if !descriptor.is_file() {
            debug!("Descriptor {} does not exist", descriptor.display());
            return Ok(None);
        }
        let pom = Pom::from_file(descriptor)
            .with_context(|| format!("Could not read descriptor {}", descriptor.display()))?;
        let lineage = load_lineage(descriptor, pom);
        trace!(
            "Resolved {} local parent(s) for {}",
            lineage.len() - 1,
            descriptor.display()
        );
        build_model(&lineage, process_plugins)
            .with_context(|| format!("Could not build effective model of {}", descriptor.display()))
            .map(Some)
    }
}

/// The descriptor followed by its parents found on disk, nearest first.
fn load_lineage(descriptor: &Path, pom: Pom) -> Vec<Pom> {
    let mut visited = HashSet::new();
    let mut current = descriptor
        .canonicalize()
        .unwrap_or_else(|_| descriptor.to_path_buf());
    visited.insert(current.clone());

    let mut lineage = vec![pom];
    while lineage.len() <= MAX_PARENT_DEPTH {
        let Some(parent_ref) = lineage.last().and_then(|pom| pom.parent.clone()) else {
            break;
        };
        let Some(parent_path) = parent_descriptor_path(&current, &parent_ref) else {
            break;
        };
        let Ok(parent_path) = parent_path.canonicalize() else {
            debug!("No local parent at {}", parent_path.display());
            break;
        };
        if !visited.insert(parent_path.clone()) {
            warn!("Parent cycle detected at {}", parent_path.display());
            break;
        }
        let parent = match Pom::from_file(&parent_path) {
            Ok(parent) => parent,
            Err(err) => {
                debug!("Ignoring parent {}: {}", parent_path.display(), err);
                break;
            }
        };
        if !is_declared_parent(&parent, &parent_ref) {
            debug!(
                "{} is not the declared parent {:?}",
                parent_path.display(),
                parent_ref.artifact_id
            );
            break;
        }
        current = parent_path;
        lineage.push(parent);
    }
    lineage
}

fn parent_descriptor_path(child: &Path, parent: &ParentRef) -> Option<PathBuf> {
    let relative = parent
        .relative_path
        .as_deref()
        .map(str::trim)
        .unwrap_or(DEFAULT_PARENT_PATH);
    // An empty <relativePath/> disables the lookup.
    if relative.is_empty() {
        return None;
    }
    let path = child.parent()?.join(relative);
    if path.is_dir() {
        Some(path.join(DESCRIPTOR_FILE_NAME))
    } else {
        Some(path)
    }
}

fn is_declared_parent(candidate: &Pom, declared: &ParentRef) -> bool {
    let same_artifact = candidate.artifact_id.as_deref().map(str::trim)
        == declared.artifact_id.as_deref().map(str::trim);
    let same_group = match declared.group_id.as_deref() {
        Some(group) => candidate.group_or_parent_group().map(str::trim) == Some(group.trim()),
        None => true,
    };
    same_artifact && same_group
}

fn build_model(lineage: &[Pom], process_plugins: bool) -> anyhow::Result<EffectiveModel> {
    let pom = &lineage[0];

    let group = pom
        .group_or_parent_group()
        .ok_or_else(|| anyhow!("groupId is neither declared nor inherited"))?;
    let artifact = pom
        .artifact_id
        .as_deref()
        .ok_or_else(|| anyhow!("artifactId is not declared"))?;
    let version = pom
        .version_or_parent_version()
        .ok_or_else(|| anyhow!("version is neither declared nor inherited"))?;
    let packaging = pom.packaging.as_deref().unwrap_or(DEFAULT_PACKAGING);

    let properties = collect_properties(lineage, group, artifact, version, packaging);
    let expand = |value: &str| interpolate(value.trim(), &properties);

    let coordinate = Coordinate::new(expand(group), expand(artifact), expand(version))
        .with_packaging(expand(packaging));

    // Root-most ancestor first so that nearer declarations win.
    let mut managed: IndexMap<(String, String, String), String> = IndexMap::new();
    for ancestor in lineage.iter().rev() {
        for dependency in &ancestor.dependency_management.dependencies.dependency {
            if dependency.scope.as_deref().map(str::trim) == Some(IMPORT_SCOPE) {
                trace!("Not following imported bom {:?}", dependency.artifact_id);
                continue;
            }
            let (Some(key), Some(version)) =
                (dependency_key(dependency, &expand), dependency.version.as_deref())
            else {
                continue;
            };
            managed.insert(key, expand(version));
        }
    }

    let mut declared: IndexMap<(String, String, String), &DeclaredDependency> = IndexMap::new();
    for ancestor in lineage.iter().rev() {
        for dependency in &ancestor.dependencies.dependency {
            match dependency_key(dependency, &expand) {
                Some(key) => {
                    declared.insert(key, dependency);
                }
                None => warn!(
                    "Skipping a dependency of {} without groupId or artifactId",
                    coordinate
                ),
            }
        }
    }

    let mut dependencies = Vec::with_capacity(declared.len());
    for ((group, artifact, kind), dependency) in &declared {
        let version = dependency
            .version
            .as_deref()
            .map(&expand)
            .or_else(|| managed.get(&(group.clone(), artifact.clone(), kind.clone())).cloned());
        match version {
            Some(version) if is_resolved(&version) => dependencies.push(
                Coordinate::new(group.as_str(), artifact.as_str(), version)
                    .with_packaging(kind.as_str()),
            ),
            _ => warn!(
                "Skipping {}:{} declared by {}: version could not be resolved",
                group, artifact, coordinate
            ),
        }
    }

    if process_plugins {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for ancestor in lineage {
            for plugin in &ancestor.build.plugins.plugin {
                let Some(artifact) = plugin.artifact_id.as_deref().map(&expand) else {
                    continue;
                };
                let group = plugin
                    .group_id
                    .as_deref()
                    .map(&expand)
                    .unwrap_or_else(|| DEFAULT_PLUGIN_GROUP.to_string());
                if !seen.insert((group.clone(), artifact.clone())) {
                    continue;
                }
                match plugin.version.as_deref().map(&expand) {
                    Some(version) if is_resolved(&version) => {
                        let plugin = Coordinate::new(group, artifact, version);
                        if !dependencies.contains(&plugin) {
                            dependencies.push(plugin);
                        }
                    }
                    _ => debug!("Skipping plugin {}:{} without a version", group, artifact),
                }
            }
        }
    }

    Ok(EffectiveModel {
        coordinate,
        modules: pom
            .modules
            .module
            .iter()
            .map(|module| module.trim().to_string())
            .filter(|module| !module.is_empty())
            .collect(),
        dependencies,
    })
}

fn collect_properties(
    lineage: &[Pom],
    group: &str,
    artifact: &str,
    version: &str,
    packaging: &str,
) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    for ancestor in lineage.iter().rev() {
        for (key, value) in &ancestor.properties {
            properties.insert(key.clone(), value.trim().to_string());
        }
    }

    for prefix in ["project", "pom"] {
        properties.insert(format!("{prefix}.groupId"), group.trim().to_string());
        properties.insert(format!("{prefix}.artifactId"), artifact.trim().to_string());
        properties.insert(format!("{prefix}.version"), version.trim().to_string());
        properties.insert(format!("{prefix}.packaging"), packaging.trim().to_string());
        if let Some(parent) = &lineage[0].parent {
            let fields = [
                ("groupId", &parent.group_id),
                ("artifactId", &parent.artifact_id),
                ("version", &parent.version),
            ];
            for (name, value) in fields {
                if let Some(value) = value {
                    properties.insert(format!("{prefix}.parent.{name}"), value.trim().to_string());
                }
            }
        }
    }
    properties
}

fn dependency_key(
    dependency: &DeclaredDependency,
    expand: &impl Fn(&str) -> String,
) -> Option<(String, String, String)> {
    let group = expand(dependency.group_id.as_deref()?);
    let artifact = expand(dependency.artifact_id.as_deref()?);
    let kind = dependency
        .kind
        .as_deref()
        .map(expand)
        .filter(|kind| !kind.is_empty())
        .unwrap_or_else(|| DEFAULT_PACKAGING.to_string());
    Some((group, artifact, kind))
}

fn is_resolved(value: &str) -> bool {
    !value.is_empty() && !value.contains("${")
}

/// Replaces `${name}` references, following references inside property values.
/// Unknown references are left as they are.
fn interpolate(value: &str, properties: &BTreeMap<String, String>) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

    let mut current = value.to_string();
    for _ in 0..MAX_INTERPOLATION_PASSES {
        if !current.contains("${") {
            break;
        }
        let next = re
            .replace_all(&current, |captures: &Captures<'_>| {
                properties
                    .get(captures[1].trim())
                    .cloned()
                    .unwrap_or_else(|| captures[0].to_string())
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}
