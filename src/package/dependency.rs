use serde::{Deserialize, Serialize};
use std::fmt;

use super::FrameworkName;
use crate::version::{SemanticVersion, VersionSpec};

/// A declared dependency on another package.
///
/// A missing range means any version is acceptable; the resolver then picks
/// one according to the configured [`DependencyVersion`](crate::version::DependencyVersion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDependency {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_spec: Option<VersionSpec>,
}

impl PackageDependency {
    pub fn new(id: impl Into<String>, version_spec: Option<VersionSpec>) -> Self {
        Self {
            id: id.into(),
            version_spec,
        }
    }

    pub fn any(id: impl Into<String>) -> Self {
        Self::new(id, None)
    }

    pub fn is_satisfied_by(&self, version: &SemanticVersion) -> bool {
        self.version_spec
            .as_ref()
            .is_none_or(|spec| spec.satisfies(version))
    }

    /// The exact version requested, if the range pins one.
    pub fn exact_version(&self) -> Option<&SemanticVersion> {
        self.version_spec.as_ref().and_then(VersionSpec::exact_version)
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_spec {
            Some(spec) if !spec.is_any() => write!(f, "{} {}", self.id, spec.pretty()),
            _ => f.write_str(&self.id),
        }
    }
}

/// Dependencies declared for one target framework, or for every framework
/// when `target_framework` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDependencySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<FrameworkName>,
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
}

impl PackageDependencySet {
    pub fn new(target_framework: Option<FrameworkName>, dependencies: Vec<PackageDependency>) -> Self {
        Self {
            target_framework,
            dependencies,
        }
    }
}
