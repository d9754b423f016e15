//! Carton.toml parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use carton_util::errors::{CartonError, CartonResult};

use crate::dependency::{DependencyIdentifier, DependencyRequest};

/// The standard manifest file name.
pub const MANIFEST_FILE: &str = "Carton.toml";

/// The parsed representation of a `Carton.toml` file: the dependencies a
/// package declares, each with a version specifier.
///
/// Declaration order is deterministic (sorted by identifier) and has no
/// effect on what resolution produces.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    dependencies: Vec<DependencyRequest>,
}

/// Serde mirror of the on-disk format.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// A manifest declaring no dependencies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a manifest from already-typed requests, preserving their order.
    pub fn from_requests(dependencies: Vec<DependencyRequest>) -> Self {
        Self { dependencies }
    }

    /// Parse manifest TOML text.
    pub fn parse_toml(text: &str) -> CartonResult<Self> {
        let raw: RawManifest = toml::from_str(text).map_err(|e| CartonError::Manifest {
            message: e.to_string(),
        })?;

        let mut dependencies = Vec::with_capacity(raw.dependencies.len());
        for (name, spec) in raw.dependencies {
            dependencies.push(DependencyRequest::new(
                DependencyIdentifier::new(name)?,
                spec.parse()?,
            ));
        }
        Ok(Self { dependencies })
    }

    /// Load and parse a manifest file from disk.
    pub fn from_path(path: &Path) -> CartonResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse_toml(&text)
    }

    /// The declared dependencies, in declaration order.
    pub fn dependencies(&self) -> &[DependencyRequest] {
        &self.dependencies
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}
