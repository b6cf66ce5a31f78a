use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::{InMemoryRepository, InstalledRepository, SharedRepository, read_lock, write_lock};
use crate::package::{Package, PackageIdentity};

/// The solution-wide packages folder.
///
/// Stores the packages themselves and keeps track of which projects reference
/// them, keyed by project name.
#[derive(Default)]
pub struct SharedPackagesFolder {
    packages: InMemoryRepository,
    projects: RwLock<BTreeMap<String, Arc<dyn InstalledRepository>>>,
}

impl SharedPackagesFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packages(packages: impl IntoIterator<Item = Package>) -> Self {
        Self {
            packages: InMemoryRepository::with_packages(packages),
            projects: RwLock::default(),
        }
    }

    /// Snapshot of the stored packages, ordered by identity.
    pub fn packages(&self) -> Vec<Arc<Package>> {
        self.packages.packages()
    }

    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.packages.contains(identity)
    }

    pub fn project_names(&self) -> Vec<String> {
        read_lock(&self.projects).keys().cloned().collect()
    }
}

impl std::fmt::Debug for SharedPackagesFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPackagesFolder")
            .field("packages", &self.packages.identities())
            .field("projects", &self.project_names())
            .finish()
    }
}

impl InstalledRepository for SharedPackagesFolder {
    fn get_packages(&self) -> Vec<Arc<Package>> {
        self.packages.packages()
    }

    fn add_package(&self, package: Arc<Package>) -> Result<()> {
        InstalledRepository::add_package(&self.packages, package)
    }

    fn remove_package(&self, identity: &PackageIdentity) -> Result<()> {
        InstalledRepository::remove_package(&self.packages, identity)
    }
}

impl SharedRepository for SharedPackagesFolder {
    fn register_project(&self, name: &str, repository: Arc<dyn InstalledRepository>) {
        log::debug!("Registering project '{}' with the packages folder", name);
        write_lock(&self.projects).insert(name.to_string(), repository);
    }

    fn unregister_project(&self, name: &str) {
        write_lock(&self.projects).remove(name);
    }

    fn load_project_repositories(&self) -> Vec<Arc<dyn InstalledRepository>> {
        read_lock(&self.projects).values().cloned().collect()
    }
}
