use std::sync::Arc;

use super::install::{InstallSettings, InstallWalker};
use crate::error::ResolveError;
use crate::logging::{Logger, MessageLevel};
use crate::operation::PackageOperation;
use crate::package::Package;
use crate::repository::{ConstraintProvider, InstalledRepository, PackageSource};

/// Plans moving an installed package to another version.
///
/// Planning is the same as for an install once the versions differ; with
/// `update_dependencies` set, installed dependencies are also moved to the
/// version the source would pick when that version is newer.
pub struct UpdateWalker<'a> {
    inner: InstallWalker<'a>,
}

impl<'a> UpdateWalker<'a> {
    pub fn new(
        local: &'a dyn InstalledRepository,
        source: &'a dyn PackageSource,
        constraints: &'a dyn ConstraintProvider,
        logger: &'a dyn Logger,
        settings: InstallSettings,
    ) -> Self {
        Self {
            inner: InstallWalker::new(local, source, constraints, logger, settings),
        }
    }

    pub fn resolve_operations(&self, package: Arc<Package>) -> Result<Vec<PackageOperation>, ResolveError> {
        let installed = self.inner.local().find_package(&package.id, None);
        match installed {
            Some(installed) if installed.version == package.version => {
                self.inner.logger().log(
                    MessageLevel::Info,
                    &format!("No updates available for '{}'.", package.id),
                );
                Ok(Vec::new())
            }
            _ => self.inner.resolve_operations(package),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullLogger;
    use crate::package::PackageDependency;
    use crate::repository::{InMemoryRepository, NullConstraintProvider};

    fn package(id: &str, version: &str, deps: &[(&str, &str)]) -> Package {
        Package::new(id, version.parse().unwrap()).with_dependencies(
            deps.iter()
                .map(|(id, spec)| PackageDependency::new(*id, Some(spec.parse().unwrap())))
                .collect(),
        )
    }

    fn render(operations: &[PackageOperation]) -> Vec<String> {
        operations.iter().map(|o| o.to_string()).collect()
    }

    fn find(source: &InMemoryRepository, id: &str, version: &str) -> Arc<Package> {
        source
            .packages()
            .into_iter()
            .find(|p| p.has_id(id) && p.version.to_string() == version)
            .unwrap()
    }

    fn fixtures() -> (InMemoryRepository, InMemoryRepository) {
        let local = InMemoryRepository::with_packages([
            package("App", "1.0", &[("Lib", "1.0")]),
            package("Lib", "1.0", &[]),
        ]);
        let source = InMemoryRepository::with_packages([
            package("App", "1.0", &[("Lib", "1.0")]),
            package("App", "2.0", &[("Lib", "1.0")]),
            package("Lib", "1.0", &[]),
            package("Lib", "1.5", &[]),
        ]);
        (local, source)
    }

    #[test]
    fn test_same_version_is_noop() {
        let (local, source) = fixtures();
        let walker = UpdateWalker::new(
            &local,
            &source,
            &NullConstraintProvider,
            &NullLogger,
            InstallSettings::default(),
        );

        let operations = walker.resolve_operations(find(&source, "App", "1.0")).unwrap();
        assert!(operations.is_empty());
    }

    #[test]
    fn test_update_keeps_satisfied_dependencies() {
        let (local, source) = fixtures();
        let walker = UpdateWalker::new(
            &local,
            &source,
            &NullConstraintProvider,
            &NullLogger,
            InstallSettings::default(),
        );

        let operations = walker.resolve_operations(find(&source, "App", "2.0")).unwrap();
        assert_eq!(render(&operations), vec!["Uninstall App 1.0", "Install App 2.0"]);
    }

    #[test]
    fn test_update_dependencies_moves_them_forward() {
        let (local, source) = fixtures();
        let settings = InstallSettings {
            update_dependencies: true,
            dependency_version: crate::version::DependencyVersion::Highest,
            ..Default::default()
        };
        let walker = UpdateWalker::new(&local, &source, &NullConstraintProvider, &NullLogger, settings);

        let operations = walker.resolve_operations(find(&source, "App", "2.0")).unwrap();
        assert_eq!(
            render(&operations),
            vec!["Uninstall Lib 1.0", "Install Lib 1.5", "Uninstall App 1.0", "Install App 2.0"]
        );
    }
}
