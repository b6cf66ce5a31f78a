use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use super::{InstalledRepository, read_lock, write_lock};
use crate::operation::{PackageAction, PackageOperation, PackageOperationTarget};
use crate::package::{Package, PackageIdentity};

#[derive(Default)]
struct Changes {
    added: BTreeMap<PackageIdentity, Arc<Package>>,
    removed: BTreeSet<PackageIdentity>,
}

/// Copy-on-write view over an installed repository.
///
/// Writes land in the overlay only, so the resolver can apply planned
/// operations while it keeps planning without touching the real repository.
pub struct VirtualRepository {
    base: Arc<dyn InstalledRepository>,
    changes: RwLock<Changes>,
}

impl VirtualRepository {
    pub fn new(base: Arc<dyn InstalledRepository>) -> Self {
        Self {
            base,
            changes: RwLock::default(),
        }
    }

    /// Identities added and removed relative to the base repository.
    pub fn pending_changes(&self) -> (Vec<PackageIdentity>, Vec<PackageIdentity>) {
        let changes = read_lock(&self.changes);
        (
            changes.added.keys().cloned().collect(),
            changes.removed.iter().cloned().collect(),
        )
    }

    /// Record the effect of `operation` in the overlay.
    pub fn apply(&self, operation: &PackageOperation) {
        let identity = operation.identity();
        let mut changes = write_lock(&self.changes);
        match operation.action {
            PackageAction::Install => {
                changes.removed.remove(&identity);
                if !self.base.exists(&identity) {
                    changes.added.insert(identity, operation.package.clone());
                }
            }
            PackageAction::Uninstall => {
                changes.added.remove(&identity);
                if self.base.exists(&identity) {
                    changes.removed.insert(identity);
                }
            }
        }
    }

    pub fn has_changes(&self) -> bool {
        let changes = read_lock(&self.changes);
        !changes.added.is_empty() || !changes.removed.is_empty()
    }
}

impl std::fmt::Debug for VirtualRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (added, removed) = self.pending_changes();
        f.debug_struct("VirtualRepository")
            .field("added", &added)
            .field("removed", &removed)
            .finish()
    }
}

impl InstalledRepository for VirtualRepository {
    fn get_packages(&self) -> Vec<Arc<Package>> {
        let changes = read_lock(&self.changes);
        let mut merged: BTreeMap<PackageIdentity, Arc<Package>> = self
            .base
            .get_packages()
            .into_iter()
            .map(|p| (p.identity(), p))
            .filter(|(identity, _)| !changes.removed.contains(identity))
            .collect();
        merged.extend(changes.added.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.into_values().collect()
    }

    fn add_package(&self, package: Arc<Package>) -> Result<()> {
        self.apply(&PackageOperation::install(package, PackageOperationTarget::Project));
        Ok(())
    }

    fn remove_package(&self, identity: &PackageIdentity) -> Result<()> {
        if let Some(package) = self.find_package(&identity.id, Some(&identity.version)) {
            self.apply(&PackageOperation::uninstall(package, PackageOperationTarget::Project));
        }
        Ok(())
    }
}
