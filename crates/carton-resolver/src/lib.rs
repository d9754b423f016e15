//! Dependency resolution engine: walks the transitive dependency tree of a
//! manifest, enumerates candidate version assignments through a lazy
//! permutation stream, and prunes every assignment that violates a declared
//! version constraint.

pub mod graph;
pub mod permute;
pub mod registry;
pub mod resolver;
