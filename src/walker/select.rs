//! Candidate selection for dependencies.

use std::sync::Arc;

use crate::package::{Package, PackageDependency};
use crate::repository::{ConstraintProvider, InstalledRepository, PackageSource};
use crate::version::DependencyVersion;

/// Pick the source package that satisfies `dependency` under `policy`.
///
/// Candidates must fall inside the dependency range and the id's constraint.
/// Prereleases are admitted when allowed or when the range itself starts at a
/// prerelease. Unlisted packages are only considered for exact ranges and
/// only when no listed candidate remains.
pub(crate) fn resolve_dependency(
    source: &dyn PackageSource,
    constraints: &dyn ConstraintProvider,
    dependency: &PackageDependency,
    allow_prerelease: bool,
    policy: DependencyVersion,
) -> Option<Arc<Package>> {
    let spec = dependency.version_spec.as_ref();
    let constraint = constraints.get_constraint(&dependency.id);
    let prerelease_ok = allow_prerelease
        || spec
            .and_then(|s| s.min_version())
            .is_some_and(|v| v.is_prerelease());

    let pool: Vec<Arc<Package>> = source
        .find_packages_by_id(&dependency.id)
        .into_iter()
        .filter(|p| dependency.is_satisfied_by(&p.version))
        .filter(|p| constraint.as_ref().is_none_or(|c| c.satisfies(&p.version)))
        .filter(|p| prerelease_ok || p.is_release_version())
        .collect();

    let listed: Vec<Arc<Package>> = pool.iter().filter(|p| p.listed).cloned().collect();
    let pool = if !listed.is_empty() {
        listed
    } else if dependency.exact_version().is_some() {
        pool
    } else {
        Vec::new()
    };

    policy.select(&pool, |p| &p.version).cloned()
}

/// Highest installed package that satisfies `dependency`.
pub(crate) fn installed_match(
    local: &dyn InstalledRepository,
    dependency: &PackageDependency,
) -> Option<Arc<Package>> {
    local
        .find_packages_by_id(&dependency.id)
        .into_iter()
        .filter(|p| dependency.is_satisfied_by(&p.version))
        .max_by(|a, b| a.version.cmp(&b.version))
}
