//! Semantic version values and version specifiers.
//!
//! Versions are plain `major.minor.patch` triples ordered lexicographically
//! over their components. Specifiers are range constraints over those
//! triples with an intersection operator: the intersection of two
//! specifiers is the most restrictive specifier satisfied by exactly the
//! versions that satisfy both, or nothing when the two are mutually
//! exclusive.

use std::fmt;
use std::str::FromStr;

use carton_util::errors::CartonError;

/// A `major.minor.patch` version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for SemanticVersion {
    type Err = CartonError;

    /// Parse `1`, `1.2`, or `1.2.3`, with an optional leading `v`.
    ///
    /// Missing components default to zero, matching the leniency of
    /// release tags in the wild (`v2.1` pins `2.1.0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(CartonError::Version {
                message: format!("empty version string {s:?}"),
            });
        }

        let mut components = [0u64; 3];
        let mut count = 0;
        for part in digits.split('.') {
            if count == components.len() {
                return Err(CartonError::Version {
                    message: format!("too many components in version {s:?}"),
                });
            }
            components[count] = part.parse().map_err(|_| CartonError::Version {
                message: format!("invalid component {part:?} in version {s:?}"),
            })?;
            count += 1;
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A version range constraint attached to one declaration of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    /// Any version at all.
    Any,
    /// Exactly the given version.
    Exactly(SemanticVersion),
    /// The given version or anything newer.
    AtLeast(SemanticVersion),
    /// Anything with the same major component, at or above the given
    /// version.
    CompatibleWith(SemanticVersion),
}

impl VersionSpec {
    /// Whether `version` falls inside this constraint.
    pub fn satisfied_by(&self, version: &SemanticVersion) -> bool {
        match self {
            VersionSpec::Any => true,
            VersionSpec::Exactly(v) => version == v,
            VersionSpec::AtLeast(v) => version >= v,
            VersionSpec::CompatibleWith(v) => version.major == v.major && version >= v,
        }
    }

    /// The most restrictive specifier satisfying both `self` and `other`,
    /// or `None` when the two are mutually exclusive.
    ///
    /// Commutative, and a version satisfies the intersection exactly when
    /// it satisfies both inputs.
    pub fn intersect(&self, other: &VersionSpec) -> Option<VersionSpec> {
        use VersionSpec::*;

        match (self, other) {
            (Any, spec) | (spec, Any) => Some(spec.clone()),
            (Exactly(v), spec) | (spec, Exactly(v)) => {
                spec.satisfied_by(v).then(|| Exactly(*v))
            }
            (AtLeast(a), AtLeast(b)) => Some(AtLeast(*a.max(b))),
            (AtLeast(floor), CompatibleWith(base)) | (CompatibleWith(base), AtLeast(floor)) => {
                // The floor may climb within the base's major line, but a
                // floor above that line leaves no version at all.
                let raised = (*floor).max(*base);
                (raised.major == base.major).then(|| CompatibleWith(raised))
            }
            (CompatibleWith(a), CompatibleWith(b)) => {
                (a.major == b.major).then(|| CompatibleWith(*a.max(b)))
            }
        }
    }
}

impl FromStr for VersionSpec {
    type Err = CartonError;

    /// Parse a specifier string: `*` (any), `== 1.2.0`, `>= 1.2.0`,
    /// `~> 1.2.0`, or a bare version, which means "compatible with".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        if spec.is_empty() || spec == "*" {
            return Ok(VersionSpec::Any);
        }
        if let Some(rest) = spec.strip_prefix("==") {
            return Ok(VersionSpec::Exactly(rest.trim().parse()?));
        }
        if let Some(rest) = spec.strip_prefix(">=") {
            return Ok(VersionSpec::AtLeast(rest.trim().parse()?));
        }
        if let Some(rest) = spec.strip_prefix("~>") {
            return Ok(VersionSpec::CompatibleWith(rest.trim().parse()?));
        }
        Ok(VersionSpec::CompatibleWith(spec.parse()?))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Any => f.write_str("*"),
            VersionSpec::Exactly(v) => write!(f, "== {v}"),
            VersionSpec::AtLeast(v) => write!(f, ">= {v}"),
            VersionSpec::CompatibleWith(v) => write!(f, "~> {v}"),
        }
    }
}
