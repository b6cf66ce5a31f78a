use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::{FrameworkName, PackageDependency, PackageDependencySet, PackageId, PackageIdentity};
use crate::error::ResolveError;
use crate::version::SemanticVersion;

fn default_true() -> bool {
    true
}

/// Package metadata as seen by the planner.
///
/// Values are immutable once built and shared behind `Arc` by repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub version: SemanticVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_sets: Vec<PackageDependencySet>,
    #[serde(default)]
    pub require_license_acceptance: bool,
    /// Unlisted packages are hidden from "latest" lookups
    #[serde(default = "default_true")]
    pub listed: bool,
    /// Whether the package carries files that land in a project (references,
    /// content). Packages without project content or dependencies are
    /// solution-level.
    #[serde(default = "default_true")]
    pub has_project_content: bool,
}

impl Package {
    pub fn new(id: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            id: id.into(),
            version,
            title: None,
            authors: Vec::new(),
            description: None,
            dependency_sets: Vec::new(),
            require_license_acceptance: false,
            listed: true,
            has_project_content: true,
        }
    }

    /// Add a dependency group.
    pub fn with_dependency_set(mut self, set: PackageDependencySet) -> Self {
        self.dependency_sets.push(set);
        self
    }

    /// Add framework-agnostic dependencies.
    pub fn with_dependencies(self, dependencies: Vec<PackageDependency>) -> Self {
        self.with_dependency_set(PackageDependencySet::new(None, dependencies))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unlisted(mut self) -> Self {
        self.listed = false;
        self
    }

    pub fn without_project_content(mut self) -> Self {
        self.has_project_content = false;
        self
    }

    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(self.id.clone(), self.version.clone())
    }

    pub fn key(&self) -> PackageId {
        PackageId::new(self.id.clone())
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }

    pub fn is_release_version(&self) -> bool {
        self.version.is_release()
    }

    pub fn has_dependencies(&self) -> bool {
        self.dependency_sets.iter().any(|s| !s.dependencies.is_empty())
    }

    /// Dependencies that apply to a project targeting `framework`.
    ///
    /// Without a framework every group applies (first declaration of an id
    /// wins). With one, the highest compatible framework-specific group is
    /// used, then the framework-agnostic group. A package whose groups are all
    /// framework-specific and none compatible is an error.
    pub fn compatible_dependencies(
        &self,
        framework: Option<&FrameworkName>,
    ) -> Result<Vec<PackageDependency>, ResolveError> {
        if self.dependency_sets.is_empty() {
            return Ok(Vec::new());
        }

        let Some(framework) = framework else {
            let mut seen = HashSet::new();
            return Ok(self
                .dependency_sets
                .iter()
                .flat_map(|s| s.dependencies.iter())
                .filter(|d| seen.insert(PackageId::new(d.id.clone())))
                .cloned()
                .collect());
        };

        let best_specific = self
            .dependency_sets
            .iter()
            .filter_map(|s| s.target_framework.as_ref().map(|f| (f, s)))
            .filter(|(f, _)| f.is_compatible_with(framework))
            .max_by(|(a, _), (b, _)| a.version.cmp(&b.version))
            .map(|(_, s)| s);

        let selected =
            best_specific.or_else(|| self.dependency_sets.iter().find(|s| s.target_framework.is_none()));

        match selected {
            Some(set) => Ok(set.dependencies.clone()),
            None => Err(ResolveError::IncompatibleFramework {
                package: self.identity(),
                framework: framework.to_string(),
            }),
        }
    }

    /// The dependency on `id` that applies to `framework`, if any.
    ///
    /// Packages without a compatible group are treated as declaring nothing.
    pub fn find_dependency(
        &self,
        id: &str,
        framework: Option<&FrameworkName>,
    ) -> Option<PackageDependency> {
        self.compatible_dependencies(framework)
            .ok()?
            .into_iter()
            .find(|d| d.id.eq_ignore_ascii_case(id))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fw(s: &str) -> FrameworkName {
        s.parse().unwrap()
    }

    fn dep(id: &str) -> PackageDependency {
        PackageDependency::any(id)
    }

    fn ids(deps: &[PackageDependency]) -> Vec<&str> {
        deps.iter().map(|d| d.id.as_str()).collect()
    }

    fn multi_target() -> Package {
        Package::new("Multi", "1.0".parse().unwrap())
            .with_dependency_set(PackageDependencySet::new(Some(fw("net40")), vec![dep("A")]))
            .with_dependency_set(PackageDependencySet::new(Some(fw("net45")), vec![dep("B")]))
            .with_dependency_set(PackageDependencySet::new(Some(fw("sl5")), vec![dep("C")]))
    }

    #[test]
    fn test_no_dependency_sets() {
        let package = Package::new("Leaf", "1.0".parse().unwrap());
        assert!(package.compatible_dependencies(Some(&fw("net45"))).unwrap().is_empty());
        assert!(!package.has_dependencies());
    }

    #[test]
    fn test_highest_compatible_group_wins() {
        let package = multi_target();
        assert_eq!(ids(&package.compatible_dependencies(Some(&fw("net451"))).unwrap()), vec!["B"]);
        assert_eq!(ids(&package.compatible_dependencies(Some(&fw("net40"))).unwrap()), vec!["A"]);
    }

    #[test]
    fn test_no_compatible_group_is_error() {
        let package = multi_target();
        let err = package
            .compatible_dependencies(Some(&fw("net35")))
            .unwrap_err();
        assert!(matches!(err, ResolveError::IncompatibleFramework { .. }));
        assert!(err.to_string().contains("Multi 1.0"));
    }

    #[test]
    fn test_framework_agnostic_group_is_fallback() {
        let package = multi_target().with_dependencies(vec![dep("Any")]);
        assert_eq!(ids(&package.compatible_dependencies(Some(&fw("net35"))).unwrap()), vec!["Any"]);
        assert_eq!(ids(&package.compatible_dependencies(Some(&fw("net45"))).unwrap()), vec!["B"]);
    }

    #[test]
    fn test_no_framework_uses_all_groups() {
        let package = multi_target().with_dependencies(vec![dep("a")]);
        assert_eq!(ids(&package.compatible_dependencies(None).unwrap()), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_find_dependency() {
        let package = multi_target();
        assert!(package.find_dependency("b", Some(&fw("net45"))).is_some());
        assert!(package.find_dependency("A", Some(&fw("net45"))).is_none());
        assert!(package.find_dependency("A", Some(&fw("net35"))).is_none());
    }

    #[test]
    fn test_deserialize_defaults() {
        let package: Package = serde_json::from_str(r#"{"id":"Foo","version":"1.0"}"#).unwrap();
        assert!(package.listed);
        assert!(package.has_project_content);
        assert!(!package.require_license_acceptance);
        assert!(package.dependency_sets.is_empty());
    }
}
