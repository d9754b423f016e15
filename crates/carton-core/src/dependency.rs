use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use carton_util::errors::{CartonError, CartonResult};

use crate::version::{SemanticVersion, VersionSpec};

/// An opaque, stable name for a dependency's source, typically a repository
/// coordinate such as `github.com/antlion/sandworm`.
///
/// Two identifiers name the same dependency exactly when they compare
/// equal; distinct identifiers never unify, and the same identifier always
/// refers to the same package no matter which manifest declares it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyIdentifier(String);

impl DependencyIdentifier {
    /// Validate and wrap a raw coordinate string.
    pub fn new(raw: impl Into<String>) -> CartonResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CartonError::Manifest {
                message: "empty dependency identifier".to_string(),
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DependencyIdentifier {
    type Err = CartonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for DependencyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dependency pinned to one concrete version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinnedDependency {
    pub identifier: DependencyIdentifier,
    pub version: SemanticVersion,
}

impl PinnedDependency {
    pub fn new(identifier: DependencyIdentifier, version: SemanticVersion) -> Self {
        Self {
            identifier,
            version,
        }
    }
}

impl fmt::Display for PinnedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identifier, self.version)
    }
}

/// One declared dependency: an identifier plus the version range the
/// declaring manifest accepts for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    pub identifier: DependencyIdentifier,
    pub specifier: VersionSpec,
}

impl DependencyRequest {
    pub fn new(identifier: DependencyIdentifier, specifier: VersionSpec) -> Self {
        Self {
            identifier,
            specifier,
        }
    }
}

impl fmt::Display for DependencyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.identifier, self.specifier)
    }
}
