use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::package::{FrameworkName, Package, PackageIdentity};
use crate::repository::InstalledRepository;

/// Answers "which installed packages need this one".
pub struct DependentsWalker<'a> {
    repository: &'a dyn InstalledRepository,
    target_framework: Option<FrameworkName>,
}

impl<'a> DependentsWalker<'a> {
    pub fn new(repository: &'a dyn InstalledRepository, target_framework: Option<FrameworkName>) -> Self {
        Self {
            repository,
            target_framework,
        }
    }

    /// Installed packages declaring a dependency whose range admits `package`.
    ///
    /// Packages without a dependency group for the framework count as having
    /// no dependencies.
    pub fn get_dependents(&self, package: &PackageIdentity) -> Vec<Arc<Package>> {
        self.repository
            .get_packages()
            .into_iter()
            .filter(|candidate| candidate.identity() != *package)
            .filter(|candidate| self.depends_on(candidate, package))
            .collect()
    }

    fn depends_on(&self, candidate: &Package, package: &PackageIdentity) -> bool {
        match candidate.compatible_dependencies(self.target_framework.as_ref()) {
            Ok(dependencies) => dependencies
                .iter()
                .any(|d| package.has_id(&d.id) && d.is_satisfied_by(&package.version)),
            Err(e) => {
                log::debug!("Ignoring dependencies of {}: {}", candidate, e);
                false
            }
        }
    }
}

/// Transitive closure of [`DependentsWalker`].
pub struct ReverseDependencyWalker<'a> {
    dependents: DependentsWalker<'a>,
}

impl<'a> ReverseDependencyWalker<'a> {
    pub fn new(repository: &'a dyn InstalledRepository, target_framework: Option<FrameworkName>) -> Self {
        Self {
            dependents: DependentsWalker::new(repository, target_framework),
        }
    }

    /// Every installed package that depends on `package` directly or through
    /// other installed packages, nearest first.
    pub fn get_transitive_dependents(&self, package: &PackageIdentity) -> Vec<Arc<Package>> {
        let mut seen: HashSet<PackageIdentity> = HashSet::from([package.clone()]);
        let mut queue = VecDeque::from([package.clone()]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents.get_dependents(&current) {
                let identity = dependent.identity();
                if seen.insert(identity.clone()) {
                    queue.push_back(identity);
                    found.push(dependent);
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackageDependency, PackageDependencySet};
    use crate::repository::InMemoryRepository;

    fn package(id: &str, version: &str, deps: &[(&str, &str)]) -> Package {
        Package::new(id, version.parse().unwrap()).with_dependencies(
            deps.iter()
                .map(|(id, spec)| PackageDependency::new(*id, Some(spec.parse().unwrap())))
                .collect(),
        )
    }

    fn identity(id: &str, version: &str) -> PackageIdentity {
        PackageIdentity::new(id, version.parse().unwrap())
    }

    fn names(found: &[Arc<Package>]) -> Vec<String> {
        found.iter().map(|p| p.to_string()).collect()
    }

    fn repository() -> InMemoryRepository {
        InMemoryRepository::with_packages([
            package("App", "1.0", &[("Web", "1.0")]),
            package("Web", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Cli", "1.0", &[("Core", "2.0")]),
            package("Core", "1.5", &[]),
        ])
    }

    #[test]
    fn test_direct_dependents_match_range() {
        let repo = repository();
        let walker = DependentsWalker::new(&repo, None);

        assert_eq!(names(&walker.get_dependents(&identity("core", "1.5"))), vec!["Web 1.0"]);
        assert_eq!(names(&walker.get_dependents(&identity("Core", "2.1"))), vec!["Cli 1.0"]);
        assert!(walker.get_dependents(&identity("App", "1.0")).is_empty());
    }

    #[test]
    fn test_incompatible_packages_have_no_dependencies() {
        let silverlight = Package::new("Phone", "1.0".parse().unwrap()).with_dependency_set(
            PackageDependencySet::new(Some("sl5".parse().unwrap()), vec![PackageDependency::any("Core")]),
        );
        let repo = InMemoryRepository::with_packages([silverlight, package("Core", "1.0", &[])]);

        let net45 = DependentsWalker::new(&repo, Some("net45".parse().unwrap()));
        assert!(net45.get_dependents(&identity("Core", "1.0")).is_empty());

        let any = DependentsWalker::new(&repo, None);
        assert_eq!(any.get_dependents(&identity("Core", "1.0")).len(), 1);
    }

    #[test]
    fn test_transitive_dependents_nearest_first() {
        let repo = repository();
        let walker = ReverseDependencyWalker::new(&repo, None);

        let found = walker.get_transitive_dependents(&identity("Core", "1.5"));
        assert_eq!(names(&found), vec!["Web 1.0", "App 1.0"]);
    }
}
