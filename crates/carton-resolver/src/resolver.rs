//! The recursive resolution search.
//!
//! Resolution walks the transitive dependency tree of a manifest. For each
//! set of declarations it enumerates, through the permutation stream, every
//! way of choosing one candidate version per dependency; each choice
//! extends a branch-local copy of the candidate graph through
//! conflict-checked insertion, and each inserted node recurses into its own
//! manifest. A branch dies silently on conflict; surviving graphs flow out
//! lazily, so the first valid graph ends the search and dropping the stream
//! cancels everything still in flight.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};

use carton_core::dependency::{DependencyIdentifier, DependencyRequest, PinnedDependency};
use carton_core::manifest::Manifest;
use carton_util::errors::{CartonError, CartonResult};

use crate::graph::{DependencyGraph, DependencyNode};
use crate::permute::permutations;
use crate::registry::Registry;

/// Resolve one concrete version for every transitive dependency of
/// `manifest`, honoring each declared version range wherever it appears.
///
/// Candidate versions are enumerated newest-first and the first valid
/// assignment wins, which biases every dependency toward its highest
/// acceptable version. Returns one pin per resolved dependency, ordered by
/// identifier.
///
/// Fails with [`CartonError::NoSolution`] when every combination of
/// available versions violates some constraint, and with the underlying
/// registry error when listing or fetching itself fails.
pub async fn resolve(
    manifest: &Manifest,
    registry: Arc<dyn Registry>,
) -> CartonResult<Vec<PinnedDependency>> {
    let mut graphs = explore(
        registry,
        manifest.clone(),
        DependencyGraph::new(),
        None,
        BTreeSet::new(),
    );

    match graphs.try_next().await? {
        Some(graph) => {
            let pins = graph.pinned();
            tracing::debug!("resolved {} dependencies", pins.len());
            Ok(pins)
        }
        None => Err(CartonError::NoSolution),
    }
}

/// Candidate graphs for `manifest`, layered on top of `base`, as a lazy
/// stream.
///
/// `parent` is the node whose manifest this is (`None` at the top level).
/// `expanding` holds the identifiers currently being expanded along this
/// branch; it is how dependency cycles get cut.
fn explore(
    registry: Arc<dyn Registry>,
    manifest: Manifest,
    base: DependencyGraph,
    parent: Option<DependencyIdentifier>,
    expanding: BTreeSet<DependencyIdentifier>,
) -> BoxStream<'static, CartonResult<DependencyGraph>> {
    let candidate_streams: Vec<_> = manifest
        .dependencies()
        .iter()
        .map(|request| candidates(Arc::clone(&registry), request.clone()))
        .collect();

    permutations(candidate_streams)
        .map(move |tuple| match tuple {
            Err(error) => stream::once(future::ready(Err(error))).boxed(),
            Ok(nodes) => {
                let mut branch = base.clone();
                match branch.insert_all(&nodes, parent.as_ref()) {
                    Err(conflict) => {
                        tracing::trace!("pruning branch: {}", conflict);
                        stream::empty().boxed()
                    }
                    Ok(canonical) => expand_all(
                        Arc::clone(&registry),
                        branch,
                        canonical,
                        expanding.clone(),
                    ),
                }
            }
        })
        .flatten()
        .boxed()
}

/// Candidate nodes for one declaration: every available version the
/// declared range accepts, newest first, paired with that range.
fn candidates(
    registry: Arc<dyn Registry>,
    request: DependencyRequest,
) -> BoxStream<'static, CartonResult<DependencyNode>> {
    stream::once(async move {
        let mut versions: Vec<_> = registry
            .available_versions(&request.identifier)
            .try_collect()
            .await?;
        versions.sort_unstable();
        versions.reverse();
        versions.retain(|version| request.specifier.satisfied_by(version));

        Ok::<_, CartonError>(stream::iter(versions.into_iter().map(move |version| {
            CartonResult::Ok(DependencyNode::new(
                request.identifier.clone(),
                version,
                request.specifier.clone(),
            ))
        })))
    })
    .try_flatten()
    .boxed()
}

/// Thread every node of a freshly inserted tuple through its own
/// expansion, feeding each graph one node produces into the next node's
/// expansion.
fn expand_all(
    registry: Arc<dyn Registry>,
    graph: DependencyGraph,
    nodes: Vec<DependencyNode>,
    expanding: BTreeSet<DependencyIdentifier>,
) -> BoxStream<'static, CartonResult<DependencyGraph>> {
    let mut graphs: BoxStream<'static, CartonResult<DependencyGraph>> =
        stream::once(future::ready(Ok(graph))).boxed();

    for node in nodes {
        let registry = Arc::clone(&registry);
        let expanding = expanding.clone();
        graphs = graphs
            .map(move |graph| match graph {
                Err(error) => stream::once(future::ready(Err(error))).boxed(),
                Ok(graph) => expand(
                    Arc::clone(&registry),
                    graph,
                    node.clone(),
                    expanding.clone(),
                ),
            })
            .flatten()
            .boxed();
    }
    graphs
}

/// Sub-graphs obtained by recursing into one node's own manifest.
///
/// An identifier already being expanded along this branch means the
/// dependency tree loops back on itself; no assignment can satisfy that,
/// so the branch is cut exactly like a constraint conflict.
fn expand(
    registry: Arc<dyn Registry>,
    graph: DependencyGraph,
    node: DependencyNode,
    expanding: BTreeSet<DependencyIdentifier>,
) -> BoxStream<'static, CartonResult<DependencyGraph>> {
    if expanding.contains(&node.identifier) {
        tracing::trace!("pruning branch: {} depends on itself", node.identifier);
        return stream::empty().boxed();
    }

    let fetch = {
        let registry = Arc::clone(&registry);
        let pin = node.pinned();
        async move { registry.manifest_for(&pin).await }
    };

    stream::once(fetch)
        .map(move |fetched| match fetched {
            Err(error) => stream::once(future::ready(Err(error))).boxed(),
            Ok(None) => stream::once(future::ready(Ok(graph.clone()))).boxed(),
            Ok(Some(child)) => {
                let mut expanding = expanding.clone();
                expanding.insert(node.identifier.clone());
                explore(
                    Arc::clone(&registry),
                    child,
                    graph.clone(),
                    Some(node.identifier.clone()),
                    expanding,
                )
            }
        })
        .flatten()
        .boxed()
}

#[cfg(test)]
mod tests {
    use carton_core::version::{SemanticVersion, VersionSpec};

    use crate::registry::InMemoryRegistry;

    use super::*;

    fn id(name: &str) -> DependencyIdentifier {
        DependencyIdentifier::new(name).unwrap()
    }

    fn v(major: u64, minor: u64, patch: u64) -> SemanticVersion {
        SemanticVersion::new(major, minor, patch)
    }

    #[tokio::test]
    async fn candidates_are_filtered_and_newest_first() {
        let mut registry = InMemoryRegistry::new();
        registry.publish(id("a/x"), v(1, 0, 0), None);
        registry.publish(id("a/x"), v(2, 0, 0), None);
        registry.publish(id("a/x"), v(1, 2, 0), None);
        registry.publish(id("a/x"), v(1, 1, 0), None);

        let request =
            DependencyRequest::new(id("a/x"), VersionSpec::CompatibleWith(v(1, 1, 0)));
        let nodes: Vec<_> = candidates(Arc::new(registry), request)
            .try_collect()
            .await
            .unwrap();

        let versions: Vec<_> = nodes.iter().map(|n| n.version).collect();
        assert_eq!(versions, vec![v(1, 2, 0), v(1, 1, 0)]);
        assert!(nodes
            .iter()
            .all(|n| n.specifier == VersionSpec::CompatibleWith(v(1, 1, 0))));
    }

    #[tokio::test]
    async fn expand_cuts_cycles() {
        let mut registry = InMemoryRegistry::new();
        registry.publish(id("a/x"), v(1, 0, 0), None);

        let node = DependencyNode::new(id("a/x"), v(1, 0, 0), VersionSpec::Any);
        let mut expanding = BTreeSet::new();
        expanding.insert(id("a/x"));

        let graphs: Vec<_> = expand(
            Arc::new(registry),
            DependencyGraph::new(),
            node,
            expanding,
        )
        .collect()
        .await;
        assert!(graphs.is_empty());
    }

    #[tokio::test]
    async fn expand_of_a_leaf_passes_the_graph_through() {
        let mut registry = InMemoryRegistry::new();
        registry.publish(id("a/x"), v(1, 0, 0), None);

        let node = DependencyNode::new(id("a/x"), v(1, 0, 0), VersionSpec::Any);
        let mut graph = DependencyGraph::new();
        graph.insert(node.clone(), None).unwrap();

        let graphs: Vec<_> = expand(Arc::new(registry), graph.clone(), node, BTreeSet::new())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(graphs, vec![graph]);
    }
}
