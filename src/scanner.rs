use std::{
    fmt::{Display, Formatter},
    io,
    path::{Path, PathBuf},
};

use indexmap::IndexSet;
use log::{debug, info, trace, warn};

use crate::{model::pom::DESCRIPTOR_FILE_NAME, resolver::ModelResolver};

/// Canonical location of a module descriptor.
///
/// Two declarations reaching the same file through different relative paths compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleDescriptorRef(PathBuf);

impl ModuleDescriptorRef {
    pub fn canonicalize(path: &Path) -> io::Result<Self> {
        Ok(ModuleDescriptorRef(path.canonicalize()?))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn directory(&self) -> Option<&Path> {
        self.0.parent()
    }
}

impl Display for ModuleDescriptorRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Non-fatal problems found while scanning or collecting coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanWarning {
    /// A declared sub-module has no descriptor file.
    MissingModule {
        parent: PathBuf,
        module: String,
        expected: PathBuf,
    },
    /// No effective model could be built for a descriptor.
    Resolution { descriptor: PathBuf, reason: String },
}

impl Display for ScanWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanWarning::MissingModule {
                parent,
                module,
                expected,
            } => write!(
                f,
                "module `{}` declared in {} has no descriptor at {}",
                module,
                parent.display(),
                expected.display()
            ),
            ScanWarning::Resolution { descriptor, reason } => {
                write!(f, "skipped {}: {}", descriptor.display(), reason)
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Every descriptor found, root first, in order of first discovery.
    pub descriptors: IndexSet<ModuleDescriptorRef>,
    pub warnings: Vec<ScanWarning>,
}

/// Walks a module tree from its root descriptor.
///
/// The walk uses an explicit stack, so deep trees don't grow the call stack. The visited set is
/// the only cycle guard: a descriptor reached twice (a diamond, or a cycle) is expanded once.
pub struct ModuleGraphScanner<R> {
    resolver: R,
}

impl<R: ModelResolver> ModuleGraphScanner<R> {
    pub fn new(resolver: R) -> Self {
        ModuleGraphScanner { resolver }
    }

    pub fn scan(&self, root: &Path) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        let root = match ModuleDescriptorRef::canonicalize(root) {
            Ok(root) => root,
            Err(err) => {
                warn!("Cannot open root descriptor {}: {}", root.display(), err);
                outcome.warnings.push(ScanWarning::Resolution {
                    descriptor: root.to_path_buf(),
                    reason: err.to_string(),
                });
                return outcome;
            }
        };

        info!("Scanning modules from {}", root);
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if outcome.descriptors.contains(&current) {
                trace!("{} already visited", current);
                continue;
            }
            outcome.descriptors.insert(current.clone());

            let Some(directory) = current.directory() else {
                self.skip(&mut outcome, &current, "descriptor has no parent directory".to_string());
                continue;
            };

            let model = match self.resolver.resolve(current.as_path(), false) {
                Ok(Some(model)) => model,
                Ok(None) => {
                    let reason = "no effective model could be built".to_string();
                    self.skip(&mut outcome, &current, reason);
                    continue;
                }
                Err(err) => {
                    self.skip(&mut outcome, &current, format!("{err:#}"));
                    continue;
                }
            };
            debug!(
                "{} ({}) declares {} module(s)",
                current,
                model.coordinate,
                model.modules.len()
            );

            // Reversed so that modules pop in declaration order.
            for module in model.modules.iter().rev() {
                let candidate = directory.join(module).join(DESCRIPTOR_FILE_NAME);
                let canonical = if candidate.is_file() {
                    ModuleDescriptorRef::canonicalize(&candidate).ok()
                } else {
                    None
                };
                match canonical {
                    Some(descriptor) => stack.push(descriptor),
                    None => {
                        let warning = ScanWarning::MissingModule {
                            parent: current.as_path().to_path_buf(),
                            module: module.clone(),
                            expected: candidate,
                        };
                        warn!("{}", warning);
                        outcome.warnings.push(warning);
                    }
                }
            }
        }

        info!(
            "Found {} module descriptor(s) with {} warning(s)",
            outcome.descriptors.len(),
            outcome.warnings.len()
        );
        outcome
    }

    fn skip(&self, outcome: &mut ScanOutcome, descriptor: &ModuleDescriptorRef, reason: String) {
        let warning = ScanWarning::Resolution {
            descriptor: descriptor.as_path().to_path_buf(),
            reason,
        };
        warn!("{}", warning);
        outcome.warnings.push(warning);
    }
}
