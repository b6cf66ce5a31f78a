use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::{InstalledRepository, PackageSource, read_lock, write_lock};
use crate::package::{Package, PackageIdentity};

/// A repository backed by an ordered in-memory map.
///
/// Serves both as a package source and as an installed repository. Adding a
/// package that already exists replaces it; removing a missing package is a
/// no-op.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    packages: RwLock<BTreeMap<PackageIdentity, Arc<Package>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packages(packages: impl IntoIterator<Item = Package>) -> Self {
        let map = packages
            .into_iter()
            .map(|p| (p.identity(), Arc::new(p)))
            .collect();
        Self {
            packages: RwLock::new(map),
        }
    }

    /// Snapshot of the stored packages, ordered by identity.
    pub fn packages(&self) -> Vec<Arc<Package>> {
        read_lock(&self.packages).values().cloned().collect()
    }

    pub fn identities(&self) -> Vec<PackageIdentity> {
        read_lock(&self.packages).keys().cloned().collect()
    }

    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        read_lock(&self.packages).contains_key(identity)
    }

    pub fn insert(&self, package: Arc<Package>) {
        write_lock(&self.packages).insert(package.identity(), package);
    }

    pub fn remove(&self, identity: &PackageIdentity) -> Option<Arc<Package>> {
        write_lock(&self.packages).remove(identity)
    }

    pub fn len(&self) -> usize {
        read_lock(&self.packages).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.packages).is_empty()
    }

    fn by_id(&self, id: &str) -> Vec<Arc<Package>> {
        read_lock(&self.packages)
            .values()
            .filter(|p| p.has_id(id))
            .cloned()
            .collect()
    }
}

impl InstalledRepository for InMemoryRepository {
    fn get_packages(&self) -> Vec<Arc<Package>> {
        self.packages()
    }

    fn add_package(&self, package: Arc<Package>) -> Result<()> {
        log::trace!("Adding {} to in-memory repository", package);
        self.insert(package);
        Ok(())
    }

    fn remove_package(&self, identity: &PackageIdentity) -> Result<()> {
        if self.remove(identity).is_none() {
            log::trace!("{} was not present, nothing to remove", identity);
        }
        Ok(())
    }

    fn find_packages_by_id(&self, id: &str) -> Vec<Arc<Package>> {
        self.by_id(id)
    }
}

impl PackageSource for InMemoryRepository {
    fn find_packages_by_id(&self, id: &str) -> Vec<Arc<Package>> {
        self.by_id(id)
    }

    fn get_packages(&self) -> Vec<Arc<Package>> {
        self.packages()
    }
}
