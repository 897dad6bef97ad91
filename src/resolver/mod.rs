mod pom;

use std::path::Path;

use crate::model::Coordinate;

pub use pom::PomModelResolver;

/// Builds the effective model of a module descriptor.
pub trait ModelResolver {
    /// `Ok(None)` means no model can be built for `descriptor`; callers skip the node the same
    /// way they do for an error.
    fn resolve(
        &self,
        descriptor: &Path,
        process_plugins: bool,
    ) -> anyhow::Result<Option<EffectiveModel>>;
}

impl<R: ModelResolver + ?Sized> ModelResolver for &R {
    fn resolve(
        &self,
        descriptor: &Path,
        process_plugins: bool,
    ) -> anyhow::Result<Option<EffectiveModel>> {
        (**self).resolve(descriptor, process_plugins)
    }
}

/// A descriptor after inheritance and property resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveModel {
    pub coordinate: Coordinate,
    /// Sub-module names exactly as declared, relative to the descriptor's directory.
    pub modules: Vec<String>,
    pub dependencies: Vec<Coordinate>,
}
