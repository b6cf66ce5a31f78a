//! Dependency version selection policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SemanticVersion;

/// Which version to pick among candidates satisfying a dependency range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DependencyVersion {
    /// The lowest satisfying version
    #[default]
    Lowest,
    /// The highest version sharing major.minor with the lowest candidate
    HighestPatch,
    /// The highest version sharing major with the lowest candidate
    HighestMinor,
    /// The highest satisfying version
    Highest,
}

impl DependencyVersion {
    /// Pick one candidate according to this policy.
    ///
    /// `version_of` projects each candidate onto its version. Returns `None`
    /// when `candidates` is empty.
    pub fn select<'a, T>(
        self,
        candidates: &'a [T],
        version_of: impl Fn(&T) -> &SemanticVersion,
    ) -> Option<&'a T> {
        let lowest = candidates.iter().min_by(|a, b| version_of(a).cmp(version_of(b)))?;
        let floor = version_of(lowest);

        let highest_where = |keep: &dyn Fn(&SemanticVersion) -> bool| {
            candidates
                .iter()
                .filter(|c| keep(version_of(c)))
                .max_by(|a, b| version_of(a).cmp(version_of(b)))
        };

        match self {
            DependencyVersion::Lowest => Some(lowest),
            DependencyVersion::HighestPatch => highest_where(&|v: &SemanticVersion| {
                v.major() == floor.major() && v.minor() == floor.minor()
            }),
            DependencyVersion::HighestMinor => {
                highest_where(&|v: &SemanticVersion| v.major() == floor.major())
            }
            DependencyVersion::Highest => highest_where(&|_: &SemanticVersion| true),
        }
    }
}

impl fmt::Display for DependencyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyVersion::Lowest => write!(f, "Lowest"),
            DependencyVersion::HighestPatch => write!(f, "HighestPatch"),
            DependencyVersion::HighestMinor => write!(f, "HighestMinor"),
            DependencyVersion::Highest => write!(f, "Highest"),
        }
    }
}

impl FromStr for DependencyVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lowest" => Ok(DependencyVersion::Lowest),
            "highestpatch" => Ok(DependencyVersion::HighestPatch),
            "highestminor" => Ok(DependencyVersion::HighestMinor),
            "highest" => Ok(DependencyVersion::Highest),
            _ => anyhow::bail!(
                "Unknown dependency version policy: {}. Expected Lowest, HighestPatch, HighestMinor or Highest.",
                s
            ),
        }
    }
}
