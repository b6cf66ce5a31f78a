use std::sync::Arc;

use super::marker::Marker;
use super::select::installed_match;
use crate::error::ResolveError;
use crate::package::{FrameworkName, Package};
use crate::repository::InstalledRepository;

/// Topological ordering of installed packages.
pub struct PackageSorter {
    target_framework: Option<FrameworkName>,
}

impl PackageSorter {
    pub fn new(target_framework: Option<FrameworkName>) -> Self {
        Self { target_framework }
    }

    /// Every package of `repository`, dependencies before their dependents.
    ///
    /// Packages are visited in identity order so the result is deterministic.
    /// Dependencies that are not installed are ignored.
    pub fn get_packages_by_dependency_order(
        &self,
        repository: &dyn InstalledRepository,
    ) -> Result<Vec<Arc<Package>>, ResolveError> {
        let mut marker = Marker::new();
        let mut sorted = Vec::new();
        for package in repository.get_packages() {
            if !marker.is_visited(&package.identity()) {
                self.visit(repository, package, &mut marker, &mut sorted)?;
            }
        }
        Ok(sorted)
    }

    fn visit(
        &self,
        repository: &dyn InstalledRepository,
        package: Arc<Package>,
        marker: &mut Marker,
        sorted: &mut Vec<Arc<Package>>,
    ) -> Result<(), ResolveError> {
        let identity = package.identity();
        marker.enter(&identity)?;

        let dependencies = package
            .compatible_dependencies(self.target_framework.as_ref())
            .unwrap_or_default();
        for dependency in dependencies {
            let Some(installed) = installed_match(repository, &dependency) else {
                continue;
            };
            if !marker.is_visited(&installed.identity()) {
                self.visit(repository, installed, marker, sorted)?;
            }
        }

        marker.leave(&identity);
        sorted.push(package);
        Ok(())
    }
}
