use std::collections::HashSet;
use std::sync::Arc;

use super::dependents::{DependentsWalker, ReverseDependencyWalker};
use super::marker::Marker;
use super::select::installed_match;
use crate::error::ResolveError;
use crate::logging::{Logger, MessageLevel};
use crate::operation::{PackageOperation, PackageOperationTarget};
use crate::package::{FrameworkName, Package, PackageIdentity};
use crate::repository::InstalledRepository;

#[derive(Debug, Clone)]
pub struct UninstallSettings {
    pub target_framework: Option<FrameworkName>,
    /// Remove the package even when installed packages depend on it
    pub force: bool,
    /// Also remove dependencies nothing else needs
    pub remove_dependencies: bool,
    pub target: PackageOperationTarget,
}

impl Default for UninstallSettings {
    fn default() -> Self {
        Self {
            target_framework: None,
            force: false,
            remove_dependencies: false,
            target: PackageOperationTarget::Project,
        }
    }
}

/// Plans the removal of an installed package.
///
/// The requested package is uninstalled first, followed by the dependencies
/// that exist only to satisfy it, dependents before their dependencies.
pub struct UninstallWalker<'a> {
    local: &'a dyn InstalledRepository,
    logger: &'a dyn Logger,
    settings: UninstallSettings,
}

impl<'a> UninstallWalker<'a> {
    pub fn new(local: &'a dyn InstalledRepository, logger: &'a dyn Logger, settings: UninstallSettings) -> Self {
        Self {
            local,
            logger,
            settings,
        }
    }

    pub fn resolve_operations(&self, package: &PackageIdentity) -> Result<Vec<PackageOperation>, ResolveError> {
        let root = self
            .local
            .find_package(&package.id, Some(&package.version))
            .ok_or_else(|| ResolveError::NotInstalled {
                id: package.to_string(),
            })?;
        let dependents_walker = DependentsWalker::new(self.local, self.settings.target_framework.clone());

        let dependents = dependents_walker.get_dependents(&root.identity());
        if !dependents.is_empty() {
            if !self.settings.force {
                return Err(ResolveError::HasDependents {
                    package: root.identity(),
                    dependents: dependents.iter().map(|d| d.identity()).collect(),
                });
            }
            self.warn_forced(&root);
        }

        let mut marker = Marker::new();
        let mut order = Vec::new();
        self.collect(&root, &mut marker, &mut order)?;

        let mut removing: HashSet<PackageIdentity> = order.iter().map(|p| p.identity()).collect();
        self.keep_shared_dependencies(&root, &order, &mut removing, &dependents_walker);

        let target = self.settings.target;
        Ok(order
            .into_iter()
            .rev()
            .filter(|p| removing.contains(&p.identity()))
            .map(|p| PackageOperation::uninstall(p, target))
            .collect())
    }

    fn warn_forced(&self, root: &Package) {
        let broken = ReverseDependencyWalker::new(self.local, self.settings.target_framework.clone())
            .get_transitive_dependents(&root.identity())
            .iter()
            .map(|p| format!("'{}'", p))
            .collect::<Vec<_>>()
            .join(", ");
        self.logger.log(
            MessageLevel::Warning,
            &format!("Removing '{}' will break {}.", root, broken),
        );
    }

    /// Post-order walk over `package` and, when asked, its installed
    /// dependencies.
    fn collect(
        &self,
        package: &Arc<Package>,
        marker: &mut Marker,
        order: &mut Vec<Arc<Package>>,
    ) -> Result<(), ResolveError> {
        let identity = package.identity();
        marker.enter(&identity)?;

        if self.settings.remove_dependencies {
            let dependencies = package.compatible_dependencies(self.settings.target_framework.as_ref())?;
            for dependency in &dependencies {
                let Some(installed) = installed_match(self.local, dependency) else {
                    log::debug!("Dependency {} of {} is not installed", dependency, package);
                    continue;
                };
                if !marker.is_visited(&installed.identity()) {
                    self.collect(&installed, marker, order)?;
                }
            }
        }

        marker.leave(&identity);
        order.push(package.clone());
        Ok(())
    }

    /// Drop dependencies still needed by packages that stay installed.
    fn keep_shared_dependencies(
        &self,
        root: &Package,
        order: &[Arc<Package>],
        removing: &mut HashSet<PackageIdentity>,
        dependents_walker: &DependentsWalker<'_>,
    ) {
        let root = root.identity();
        loop {
            let mut changed = false;
            for package in order {
                let identity = package.identity();
                if identity == root || !removing.contains(&identity) {
                    continue;
                }
                let outside: Vec<String> = dependents_walker
                    .get_dependents(&identity)
                    .iter()
                    .filter(|d| !removing.contains(&d.identity()))
                    .map(|d| format!("'{}'", d))
                    .collect();
                if !outside.is_empty() {
                    removing.remove(&identity);
                    changed = true;
                    self.logger.log(
                        MessageLevel::Info,
                        &format!(
                            "Skipped removing '{}' because {} still depend(s) on it.",
                            package,
                            outside.join(", ")
                        ),
                    );
                }
            }
            if !changed {
                break;
            }
        }
    }
}
