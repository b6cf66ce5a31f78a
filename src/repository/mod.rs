//! Repository abstraction
//!
//! This module provides the capabilities the planner consumes from its host:
//!
//! - [`PackageSource`] - a queryable (remote or aggregate) source of packages
//! - [`InstalledRepository`] - packages installed in a project or in the shared folder
//! - [`SharedRepository`] - project registration and reference counting for the shared folder
//! - [`ConstraintProvider`] - per-id version pins
//!
//! It also ships the in-memory backends and the copy-on-write overlay used for
//! speculative resolution.

mod aggregate;
mod constraint;
mod memory;
mod overlay;
mod shared;

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::package::{FrameworkName, Package, PackageId, PackageIdentity};
use crate::version::{SemanticVersion, VersionSpec};

pub use aggregate::AggregateSource;
pub use constraint::{ConstraintProvider, DefaultConstraintProvider, NullConstraintProvider};
pub use memory::InMemoryRepository;
pub use overlay::VirtualRepository;
pub use shared::SharedPackagesFolder;

/// A source packages are installed from.
#[cfg_attr(test, mockall::automock)]
pub trait PackageSource: Send + Sync {
    /// Every version of `id` known to the source.
    fn find_packages_by_id(&self, id: &str) -> Vec<Arc<Package>>;

    /// Every package known to the source.
    fn get_packages(&self) -> Vec<Arc<Package>>;

    /// The highest version of `id` admitted by both `version_spec` and
    /// `constraint`.
    ///
    /// Prerelease and unlisted versions are skipped unless allowed, except
    /// when `version_spec` pins an exact version.
    fn find_package<'a, 'b>(
        &self,
        id: &str,
        version_spec: Option<&'a VersionSpec>,
        constraint: Option<&'b VersionSpec>,
        allow_prerelease: bool,
        allow_unlisted: bool,
    ) -> Option<Arc<Package>> {
        select_latest(
            self.find_packages_by_id(id),
            version_spec,
            constraint,
            allow_prerelease,
            allow_unlisted,
        )
    }

    /// Search listed packages by id, title or description.
    fn search(
        &self,
        term: &str,
        frameworks: &[FrameworkName],
        include_prerelease: bool,
    ) -> Vec<Arc<Package>> {
        search_packages(self.get_packages(), term, frameworks, include_prerelease)
    }
}

/// Packages installed in one project, or in the shared packages folder.
pub trait InstalledRepository: Send + Sync {
    /// All installed packages, ordered by identity.
    fn get_packages(&self) -> Vec<Arc<Package>>;

    fn add_package(&self, package: Arc<Package>) -> Result<()>;

    fn remove_package(&self, identity: &PackageIdentity) -> Result<()>;

    /// Installed versions of `id`, lowest first.
    fn find_packages_by_id(&self, id: &str) -> Vec<Arc<Package>> {
        self.get_packages()
            .into_iter()
            .filter(|p| p.has_id(id))
            .collect()
    }

    /// The installed package with `id` at `version`, or the highest installed
    /// version when `version` is `None`.
    fn find_package(&self, id: &str, version: Option<&SemanticVersion>) -> Option<Arc<Package>> {
        let mut candidates = self.find_packages_by_id(id).into_iter();
        match version {
            Some(version) => candidates.find(|p| p.version == *version),
            None => candidates.max_by(|a, b| a.version.cmp(&b.version)),
        }
    }

    fn exists(&self, identity: &PackageIdentity) -> bool {
        self.find_package(&identity.id, Some(&identity.version))
            .is_some()
    }

    fn exists_id(&self, id: &str) -> bool {
        !self.find_packages_by_id(id).is_empty()
    }
}

/// Reference tracking for the shared packages folder.
pub trait SharedRepository: Send + Sync {
    /// Register the local repository of a project that references packages
    /// from this folder.
    fn register_project(&self, name: &str, repository: Arc<dyn InstalledRepository>);

    fn unregister_project(&self, name: &str);

    /// Local repositories of every registered project.
    fn load_project_repositories(&self) -> Vec<Arc<dyn InstalledRepository>>;

    /// Number of projects that have `identity` installed.
    fn reference_count(&self, identity: &PackageIdentity) -> usize {
        self.load_project_repositories()
            .iter()
            .filter(|r| r.exists(identity))
            .count()
    }

    fn is_referenced(&self, id: &str, version: &SemanticVersion) -> bool {
        self.reference_count(&PackageIdentity::new(id, version.clone())) > 0
    }
}

/// Highest package among `packages` that passes the range, constraint,
/// prerelease and listing filters.
pub fn select_latest(
    packages: Vec<Arc<Package>>,
    version_spec: Option<&VersionSpec>,
    constraint: Option<&VersionSpec>,
    allow_prerelease: bool,
    allow_unlisted: bool,
) -> Option<Arc<Package>> {
    let exact = version_spec.and_then(VersionSpec::exact_version).is_some();

    packages
        .into_iter()
        .filter(|p| version_spec.is_none_or(|spec| spec.satisfies(&p.version)))
        .filter(|p| constraint.is_none_or(|c| c.satisfies(&p.version)))
        .filter(|p| exact || allow_prerelease || p.is_release_version())
        .filter(|p| exact || allow_unlisted || p.listed)
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Latest listed version per id among packages matching `term`.
pub fn search_packages(
    packages: Vec<Arc<Package>>,
    term: &str,
    frameworks: &[FrameworkName],
    include_prerelease: bool,
) -> Vec<Arc<Package>> {
    let term = term.trim().to_ascii_lowercase();
    let matches_term = |p: &Package| {
        term.is_empty()
            || p.id.to_ascii_lowercase().contains(&term)
            || p.title
                .as_deref()
                .is_some_and(|t| t.to_ascii_lowercase().contains(&term))
            || p.description
                .as_deref()
                .is_some_and(|d| d.to_ascii_lowercase().contains(&term))
    };
    let supports_frameworks = |p: &Package| {
        frameworks.is_empty()
            || frameworks
                .iter()
                .any(|f| p.compatible_dependencies(Some(f)).is_ok())
    };

    let mut latest: BTreeMap<PackageId, Arc<Package>> = BTreeMap::new();
    for package in packages {
        if !package.listed
            || (!include_prerelease && !package.is_release_version())
            || !matches_term(&package)
            || !supports_frameworks(&package)
        {
            continue;
        }
        match latest.get(&package.key()) {
            Some(existing) if existing.version >= package.version => {}
            _ => {
                latest.insert(package.key(), package);
            }
        }
    }
    latest.into_values().collect()
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
