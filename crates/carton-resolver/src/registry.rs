//! The collaborators the resolver consumes: version listing and manifest
//! fetching, plus a map-backed in-memory implementation.

use std::collections::BTreeMap;

use futures_util::future::{self, BoxFuture, FutureExt};
use futures_util::stream::{self, BoxStream, StreamExt};

use carton_core::dependency::{DependencyIdentifier, PinnedDependency};
use carton_core::manifest::Manifest;
use carton_core::version::SemanticVersion;
use carton_util::errors::CartonResult;

/// A source of packages: lists the versions published for an identifier and
/// produces the manifest a dependency declares at an exact version.
///
/// Listings are re-executed on every subscription; nothing here caches.
/// Callers wanting memoization wrap the registry themselves.
pub trait Registry: Send + Sync {
    /// Every version currently available for `identifier`. Finite; order
    /// carries no meaning. An empty stream means the dependency cannot be
    /// resolved at all.
    fn available_versions(
        &self,
        identifier: &DependencyIdentifier,
    ) -> BoxStream<'static, CartonResult<SemanticVersion>>;

    /// The manifest `pin` declares, or `None` when that release declares
    /// no dependencies of its own. An error here is a hard failure, not a
    /// missing manifest.
    fn manifest_for(
        &self,
        pin: &PinnedDependency,
    ) -> BoxFuture<'static, CartonResult<Option<Manifest>>>;
}

/// A map-backed registry for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    versions: BTreeMap<DependencyIdentifier, Vec<SemanticVersion>>,
    manifests: BTreeMap<PinnedDependency, Manifest>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a release: the version becomes listable and, when
    /// `manifest` is given, its dependencies become fetchable.
    pub fn publish(
        &mut self,
        identifier: DependencyIdentifier,
        version: SemanticVersion,
        manifest: Option<Manifest>,
    ) {
        self.versions
            .entry(identifier.clone())
            .or_default()
            .push(version);
        if let Some(manifest) = manifest {
            self.manifests
                .insert(PinnedDependency::new(identifier, version), manifest);
        }
    }
}

impl Registry for InMemoryRegistry {
    fn available_versions(
        &self,
        identifier: &DependencyIdentifier,
    ) -> BoxStream<'static, CartonResult<SemanticVersion>> {
        let versions = self.versions.get(identifier).cloned().unwrap_or_default();
        stream::iter(versions.into_iter().map(Ok)).boxed()
    }

    fn manifest_for(
        &self,
        pin: &PinnedDependency,
    ) -> BoxFuture<'static, CartonResult<Option<Manifest>>> {
        future::ready(Ok(self.manifests.get(pin).cloned())).boxed()
    }
}
