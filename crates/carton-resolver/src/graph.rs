//! Candidate dependency graphs and the conflict-checked insertion rule.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use thiserror::Error;

use carton_core::dependency::{DependencyIdentifier, PinnedDependency};
use carton_core::version::{SemanticVersion, VersionSpec};

/// One candidate appearance of a dependency in a graph under construction.
///
/// Identity is the identifier alone: the proposed version is fixed for the
/// current search branch, while the specifier keeps narrowing as more
/// declarations naming the same identifier are discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub identifier: DependencyIdentifier,
    pub version: SemanticVersion,
    pub specifier: VersionSpec,
}

impl DependencyNode {
    pub fn new(
        identifier: DependencyIdentifier,
        version: SemanticVersion,
        specifier: VersionSpec,
    ) -> Self {
        Self {
            identifier,
            version,
            specifier,
        }
    }

    /// This node as a concrete (identifier, version) pin.
    pub fn pinned(&self) -> PinnedDependency {
        PinnedDependency::new(self.identifier.clone(), self.version)
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.identifier, self.version, self.specifier)
    }
}

/// Why an insertion was rejected.
///
/// Local to one search branch: the caller discards the branch and the
/// conflict is never reported further out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    /// Two declarations place ranges on the same identifier that share no
    /// version.
    #[error("requirements {existing} and {proposed} on {identifier} are mutually exclusive")]
    DisjointSpecifiers {
        identifier: DependencyIdentifier,
        existing: VersionSpec,
        proposed: VersionSpec,
    },

    /// The version this branch already committed to falls outside the
    /// narrowed range.
    #[error("{identifier} is pinned at {version}, which does not satisfy {specifier}")]
    PinnedVersionExcluded {
        identifier: DependencyIdentifier,
        version: SemanticVersion,
        specifier: VersionSpec,
    },
}

/// A candidate dependency graph for one search branch.
///
/// Nodes are keyed by identifier, so an identifier is present at most once;
/// a second insertion with the same identifier merges into the existing
/// node instead of duplicating it. Cloning the graph yields the
/// independent value copy each branch extends; a branch abandons its copy
/// the moment an insertion fails.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, ()>,
    /// Lookup from identifier to node index.
    index: BTreeMap<DependencyIdentifier, NodeIndex>,
    roots: BTreeSet<DependencyIdentifier>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a proposed node, merging with any node already carrying the
    /// same identifier.
    ///
    /// On a merge the two specifiers are intersected, and the version the
    /// branch already committed to is checked against the narrowed range;
    /// either step failing rejects the insertion. The returned node is the
    /// canonical one for the identifier in this branch. On success the edge
    /// from `dependency_of` is recorded, or root membership when there is
    /// no parent.
    pub fn insert(
        &mut self,
        node: DependencyNode,
        dependency_of: Option<&DependencyIdentifier>,
    ) -> Result<DependencyNode, Conflict> {
        let idx = match self.index.get(&node.identifier) {
            Some(&existing_idx) => {
                let existing = &self.graph[existing_idx];
                let narrowed = existing.specifier.intersect(&node.specifier).ok_or_else(|| {
                    Conflict::DisjointSpecifiers {
                        identifier: node.identifier.clone(),
                        existing: existing.specifier.clone(),
                        proposed: node.specifier.clone(),
                    }
                })?;
                if !narrowed.satisfied_by(&existing.version) {
                    return Err(Conflict::PinnedVersionExcluded {
                        identifier: node.identifier.clone(),
                        version: existing.version,
                        specifier: narrowed,
                    });
                }
                self.graph[existing_idx].specifier = narrowed;
                existing_idx
            }
            None => {
                let idx = self.graph.add_node(node.clone());
                self.index.insert(node.identifier, idx);
                idx
            }
        };

        match dependency_of {
            Some(parent) => {
                if let Some(&parent_idx) = self.index.get(parent) {
                    if !self.graph.edges(parent_idx).any(|e| e.target() == idx) {
                        self.graph.add_edge(parent_idx, idx, ());
                    }
                }
            }
            None => {
                self.roots.insert(self.graph[idx].identifier.clone());
            }
        }

        Ok(self.graph[idx].clone())
    }

    /// Fold insertion over a tuple of proposed nodes, stopping at the
    /// first conflict.
    pub fn insert_all(
        &mut self,
        nodes: &[DependencyNode],
        dependency_of: Option<&DependencyIdentifier>,
    ) -> Result<Vec<DependencyNode>, Conflict> {
        nodes
            .iter()
            .map(|node| self.insert(node.clone(), dependency_of))
            .collect()
    }

    /// Look up the canonical node for an identifier.
    pub fn node(&self, identifier: &DependencyIdentifier) -> Option<&DependencyNode> {
        self.index.get(identifier).map(|&idx| &self.graph[idx])
    }

    /// Identifiers with no dependent.
    pub fn roots(&self) -> &BTreeSet<DependencyIdentifier> {
        &self.roots
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, identifier: &DependencyIdentifier) -> Vec<&DependencyNode> {
        match self.index.get(identifier) {
            Some(&idx) => self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| &self.graph[e.target()])
                .collect(),
            None => Vec::new(),
        }
    }

    /// All nodes, ordered by identifier.
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.index.values().map(|&idx| &self.graph[idx])
    }

    /// Every node as a concrete (identifier, version) pin, ordered by
    /// identifier.
    pub fn pinned(&self) -> Vec<PinnedDependency> {
        self.nodes().map(DependencyNode::pinned).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn edge_pairs(&self) -> BTreeSet<(&DependencyIdentifier, &DependencyIdentifier)> {
        self.graph
            .edge_references()
            .map(|e| {
                (
                    &self.graph[e.source()].identifier,
                    &self.graph[e.target()].identifier,
                )
            })
            .collect()
    }
}

impl PartialEq for DependencyGraph {
    /// Graphs compare by shape: same root set and same depends-on edges,
    /// with nodes identified by identifier alone. Insertion order is
    /// irrelevant.
    fn eq(&self, other: &Self) -> bool {
        self.roots == other.roots && self.edge_pairs() == other.edge_pairs()
    }
}

impl Eq for DependencyGraph {}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> DependencyIdentifier {
        DependencyIdentifier::new(name).unwrap()
    }

    fn v(major: u64, minor: u64, patch: u64) -> SemanticVersion {
        SemanticVersion::new(major, minor, patch)
    }

    fn make_node(name: &str, version: SemanticVersion, spec: VersionSpec) -> DependencyNode {
        DependencyNode::new(id(name), version, spec)
    }

    #[test]
    fn insert_new_node_as_root() {
        let mut g = DependencyGraph::new();
        let node = make_node("a/x", v(1, 0, 0), VersionSpec::Any);
        let canonical = g.insert(node.clone(), None).unwrap();
        assert_eq!(canonical, node);
        assert_eq!(canonical.to_string(), "a/x@1.0.0 (*)");
        assert_eq!(g.len(), 1);
        assert!(g.roots().contains(&id("a/x")));
    }

    #[test]
    fn insert_records_edge_to_parent() {
        let mut g = DependencyGraph::new();
        g.insert(make_node("a/x", v(1, 0, 0), VersionSpec::Any), None)
            .unwrap();
        g.insert(
            make_node("a/y", v(2, 0, 0), VersionSpec::Any),
            Some(&id("a/x")),
        )
        .unwrap();

        let deps = g.dependencies_of(&id("a/x"));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].identifier, id("a/y"));
        assert!(!g.roots().contains(&id("a/y")));
    }

    #[test]
    fn same_identifier_never_duplicates() {
        let mut g = DependencyGraph::new();
        g.insert(
            make_node("a/x", v(1, 5, 0), VersionSpec::AtLeast(v(1, 0, 0))),
            None,
        )
        .unwrap();
        g.insert(
            make_node("a/x", v(1, 5, 0), VersionSpec::CompatibleWith(v(1, 2, 0))),
            None,
        )
        .unwrap();

        assert_eq!(g.len(), 1);
    }

    #[test]
    fn merge_narrows_the_specifier() {
        let mut g = DependencyGraph::new();
        g.insert(
            make_node("a/x", v(1, 5, 0), VersionSpec::AtLeast(v(1, 0, 0))),
            None,
        )
        .unwrap();
        let canonical = g
            .insert(
                make_node("a/x", v(1, 5, 0), VersionSpec::CompatibleWith(v(1, 2, 0))),
                None,
            )
            .unwrap();

        // Canonical node keeps the committed version, with the narrowed range.
        assert_eq!(canonical.version, v(1, 5, 0));
        assert_eq!(canonical.specifier, VersionSpec::CompatibleWith(v(1, 2, 0)));
        assert_eq!(
            g.node(&id("a/x")).unwrap().specifier,
            VersionSpec::CompatibleWith(v(1, 2, 0))
        );
    }

    #[test]
    fn disjoint_specifiers_conflict() {
        let mut g = DependencyGraph::new();
        g.insert(
            make_node("a/x", v(1, 0, 0), VersionSpec::Exactly(v(1, 0, 0))),
            None,
        )
        .unwrap();
        let err = g
            .insert(
                make_node("a/x", v(2, 0, 0), VersionSpec::Exactly(v(2, 0, 0))),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Conflict::DisjointSpecifiers { .. }));
    }

    #[test]
    fn committed_version_outside_narrowed_range_conflicts() {
        let mut g = DependencyGraph::new();
        // Commit to 1.0.0 under a loose range...
        g.insert(
            make_node("a/x", v(1, 0, 0), VersionSpec::AtLeast(v(1, 0, 0))),
            None,
        )
        .unwrap();
        // ...then learn a constraint the committed version cannot meet,
        // even though the two ranges themselves overlap.
        let err = g
            .insert(
                make_node("a/x", v(1, 5, 0), VersionSpec::AtLeast(v(1, 5, 0))),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Conflict::PinnedVersionExcluded { .. }));
    }

    #[test]
    fn insert_all_stops_at_first_conflict() {
        let mut g = DependencyGraph::new();
        g.insert(
            make_node("a/x", v(1, 0, 0), VersionSpec::Exactly(v(1, 0, 0))),
            None,
        )
        .unwrap();

        let result = g.insert_all(
            &[
                make_node("a/y", v(1, 0, 0), VersionSpec::Any),
                make_node("a/x", v(2, 0, 0), VersionSpec::Exactly(v(2, 0, 0))),
            ],
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn clones_are_independent_branches() {
        let mut base = DependencyGraph::new();
        base.insert(make_node("a/x", v(1, 0, 0), VersionSpec::Any), None)
            .unwrap();

        let mut branch = base.clone();
        branch
            .insert(
                make_node("a/y", v(1, 0, 0), VersionSpec::Any),
                Some(&id("a/x")),
            )
            .unwrap();

        assert_eq!(base.len(), 1);
        assert_eq!(branch.len(), 2);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let mut g1 = DependencyGraph::new();
        g1.insert(make_node("a/x", v(1, 0, 0), VersionSpec::Any), None)
            .unwrap();
        g1.insert(make_node("a/y", v(1, 0, 0), VersionSpec::Any), None)
            .unwrap();
        g1.insert(
            make_node("a/z", v(1, 0, 0), VersionSpec::Any),
            Some(&id("a/x")),
        )
        .unwrap();

        let mut g2 = DependencyGraph::new();
        g2.insert(make_node("a/y", v(1, 0, 0), VersionSpec::Any), None)
            .unwrap();
        g2.insert(make_node("a/x", v(1, 0, 0), VersionSpec::Any), None)
            .unwrap();
        g2.insert(
            make_node("a/z", v(1, 0, 0), VersionSpec::Any),
            Some(&id("a/x")),
        )
        .unwrap();

        assert_eq!(g1, g2);
    }

    #[test]
    fn equality_compares_node_identity_only() {
        let mut g1 = DependencyGraph::new();
        g1.insert(make_node("a/x", v(1, 0, 0), VersionSpec::Any), None)
            .unwrap();

        let mut g2 = DependencyGraph::new();
        g2.insert(make_node("a/x", v(2, 0, 0), VersionSpec::Any), None)
            .unwrap();

        assert_eq!(g1, g2);
    }

    #[test]
    fn pinned_is_ordered_by_identifier() {
        let mut g = DependencyGraph::new();
        g.insert(make_node("b/y", v(2, 0, 0), VersionSpec::Any), None)
            .unwrap();
        g.insert(make_node("a/x", v(1, 0, 0), VersionSpec::Any), None)
            .unwrap();

        let pins = g.pinned();
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].identifier, id("a/x"));
        assert_eq!(pins[1].identifier, id("b/y"));
    }
}
