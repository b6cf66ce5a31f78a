use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::dependents::DependentsWalker;
use super::marker::Marker;
use super::select::{installed_match, resolve_dependency};
use crate::error::ResolveError;
use crate::logging::{Logger, MessageLevel};
use crate::operation::{PackageOperation, PackageOperationTarget, reduce};
use crate::package::{FrameworkName, Package, PackageDependency, PackageId, PackageIdentity};
use crate::repository::{ConstraintProvider, InstalledRepository, PackageSource};
use crate::version::DependencyVersion;

/// Knobs shared by the install and update walkers.
#[derive(Debug, Clone)]
pub struct InstallSettings {
    pub target_framework: Option<FrameworkName>,
    pub allow_prerelease: bool,
    pub dependency_version: DependencyVersion,
    pub ignore_dependencies: bool,
    /// Move installed dependencies forward to the version the source would
    /// pick, instead of keeping any installed version that satisfies.
    pub update_dependencies: bool,
    pub target: PackageOperationTarget,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            target_framework: None,
            allow_prerelease: false,
            dependency_version: DependencyVersion::Lowest,
            ignore_dependencies: false,
            update_dependencies: false,
            target: PackageOperationTarget::Project,
        }
    }
}

#[derive(Default)]
struct InstallWalk {
    marker: Marker,
    operations: Vec<PackageOperation>,
    selected: HashMap<PackageId, Arc<Package>>,
    /// Ranges already checked against each selected package.
    pins: HashMap<PackageId, Vec<PackageDependency>>,
    replaced: HashSet<PackageIdentity>,
}

impl InstallWalk {
    /// Keep an installed package that satisfies `dependency`, so later ranges
    /// in the same walk are checked against it.
    fn keep(&mut self, installed: Arc<Package>, dependency: &PackageDependency) {
        self.pin(dependency);
        self.selected.entry(installed.key()).or_insert(installed);
    }

    fn pin(&mut self, dependency: &PackageDependency) {
        self.pins
            .entry(PackageId::from(dependency.id.as_str()))
            .or_default()
            .push(dependency.clone());
    }

    fn allows(&self, candidate: &Package) -> bool {
        self.pins
            .get(&candidate.key())
            .is_none_or(|pins| pins.iter().all(|d| d.is_satisfied_by(&candidate.version)))
    }
}

/// Plans the operations that bring a package and its dependencies into a
/// repository.
///
/// Dependencies are planned before their dependents. When a different version
/// of a package is already installed it is uninstalled right before the new
/// version is installed, and installed dependents that no longer accept the
/// new version are moved to the lowest newer version that does.
pub struct InstallWalker<'a> {
    local: &'a dyn InstalledRepository,
    source: &'a dyn PackageSource,
    constraints: &'a dyn ConstraintProvider,
    logger: &'a dyn Logger,
    settings: InstallSettings,
}

impl<'a> InstallWalker<'a> {
    pub fn new(
        local: &'a dyn InstalledRepository,
        source: &'a dyn PackageSource,
        constraints: &'a dyn ConstraintProvider,
        logger: &'a dyn Logger,
        settings: InstallSettings,
    ) -> Self {
        Self {
            local,
            source,
            constraints,
            logger,
            settings,
        }
    }

    pub fn settings(&self) -> &InstallSettings {
        &self.settings
    }

    pub(crate) fn local(&self) -> &'a dyn InstalledRepository {
        self.local
    }

    pub(crate) fn logger(&self) -> &'a dyn Logger {
        self.logger
    }

    pub fn resolve_operations(&self, package: Arc<Package>) -> Result<Vec<PackageOperation>, ResolveError> {
        let mut walk = InstallWalk::default();
        self.visit(&mut walk, package.clone())?;

        let operations = reduce(walk.operations);
        if operations.is_empty() && self.local.exists(&package.identity()) {
            self.logger.log(
                MessageLevel::Info,
                &format!("'{}' already installed.", package),
            );
        }
        Ok(operations)
    }

    fn visit(&self, walk: &mut InstallWalk, package: Arc<Package>) -> Result<(), ResolveError> {
        let identity = package.identity();
        walk.marker.enter(&identity)?;
        walk.selected.insert(package.key(), package.clone());

        let replaced: Vec<Arc<Package>> = self
            .local
            .find_packages_by_id(&package.id)
            .into_iter()
            .filter(|installed| installed.version != package.version)
            .collect();
        walk.replaced
            .extend(replaced.iter().map(|installed| installed.identity()));

        if self.settings.ignore_dependencies {
            log::debug!("Ignoring dependencies of {}", package);
        } else {
            let dependencies = package.compatible_dependencies(self.settings.target_framework.as_ref())?;
            for dependency in &dependencies {
                self.visit_dependency(walk, &package, dependency)?;
            }
        }

        walk.marker.leave(&identity);

        let target = self.settings.target;
        for installed in &replaced {
            walk.operations
                .push(PackageOperation::uninstall(installed.clone(), target));
        }
        if !self.local.exists(&identity) {
            walk.operations
                .push(PackageOperation::install(package.clone(), target));
        }

        for installed in &replaced {
            self.update_dependents(walk, &package, installed)?;
        }
        Ok(())
    }

    fn visit_dependency(
        &self,
        walk: &mut InstallWalk,
        dependent: &Package,
        dependency: &PackageDependency,
    ) -> Result<(), ResolveError> {
        if let Some(selected) = walk.selected.get(&PackageId::from(dependency.id.as_str())) {
            let selected = selected.identity();
            if walk.marker.is_visiting(&selected) {
                return Err(walk.marker.cycle(&selected));
            }
            if dependency.is_satisfied_by(&selected.version) {
                walk.pin(dependency);
                return Ok(());
            }
            return Err(ResolveError::VersionConflict {
                dependency: dependency.to_string(),
                package: dependent.identity(),
                selected,
            });
        }

        let installed = installed_match(self.local, dependency)
            .filter(|p| !walk.replaced.contains(&p.identity()));

        let candidate = resolve_dependency(
            self.source,
            self.constraints,
            dependency,
            self.settings.allow_prerelease,
            self.settings.dependency_version,
        );

        let next = match (installed, candidate) {
            (Some(installed), _) if !self.settings.update_dependencies => {
                log::trace!("{} is satisfied by installed {}", dependency, installed);
                walk.keep(installed, dependency);
                return Ok(());
            }
            (Some(installed), Some(candidate)) if candidate.version <= installed.version => {
                walk.keep(installed, dependency);
                return Ok(());
            }
            (Some(installed), None) => {
                walk.keep(installed, dependency);
                return Ok(());
            }
            (_, Some(candidate)) => candidate,
            (None, None) => {
                return Err(ResolveError::UnresolvedDependency {
                    dependency: dependency.to_string(),
                    package: dependent.identity(),
                });
            }
        };

        self.visit(walk, next)
    }

    /// Move dependents of `old` that reject `package` to a version that
    /// accepts it.
    fn update_dependents(
        &self,
        walk: &mut InstallWalk,
        package: &Arc<Package>,
        old: &Package,
    ) -> Result<(), ResolveError> {
        let framework = self.settings.target_framework.as_ref();
        let dependents = DependentsWalker::new(self.local, self.settings.target_framework.clone())
            .get_dependents(&old.identity());

        for dependent in dependents {
            let moving = walk
                .selected
                .get(&dependent.key())
                .is_some_and(|selected| selected.version != dependent.version);
            if moving || walk.replaced.contains(&dependent.identity()) {
                continue;
            }
            let accepts = |candidate: &Package| {
                candidate
                    .find_dependency(&package.id, framework)
                    .is_none_or(|d| d.is_satisfied_by(&package.version))
            };
            if accepts(&dependent) {
                continue;
            }

            let upgrade = self
                .source
                .find_packages_by_id(&dependent.id)
                .into_iter()
                .filter(|p| p.version > dependent.version)
                .filter(|p| self.settings.allow_prerelease || p.is_release_version())
                .filter(|p| accepts(p) && walk.allows(p))
                .min_by(|a, b| a.version.cmp(&b.version));

            match upgrade {
                Some(upgrade) => {
                    log::debug!("Updating dependent {} to {}", dependent, upgrade);
                    self.visit(walk, upgrade)?;
                }
                None => {
                    return Err(ResolveError::UpdateConflict {
                        package: package.identity(),
                        installed: old.identity(),
                        dependents: vec![dependent.identity()],
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{MockLogger, NullLogger};
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

    fn resolve(
        local: &InMemoryRepository,
        source: &InMemoryRepository,
        settings: InstallSettings,
        id: &str,
        version: &str,
    ) -> Result<Vec<PackageOperation>, ResolveError> {
        let target = source
            .packages()
            .into_iter()
            .find(|p| p.has_id(id) && p.version.to_string() == version)
            .unwrap();
        InstallWalker::new(local, source, &NullConstraintProvider, &NullLogger, settings)
            .resolve_operations(target)
    }

    #[test]
    fn test_dependencies_before_dependent() {
        let local = InMemoryRepository::new();
        let source = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "1.0")]),
            package("B", "1.0", &[("C", "1.0")]),
            package("B", "2.0", &[]),
            package("C", "1.0", &[]),
        ]);

        let operations = resolve(&local, &source, InstallSettings::default(), "A", "1.0").unwrap();
        assert_eq!(render(&operations), vec!["Install C 1.0", "Install B 1.0", "Install A 1.0"]);
        assert!(operations.iter().all(|o| o.target == PackageOperationTarget::Project));
    }

    #[test]
    fn test_highest_policy() {
        let local = InMemoryRepository::new();
        let source = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "1.0")]),
            package("B", "1.0", &[("C", "1.0")]),
            package("B", "2.0", &[]),
            package("C", "1.0", &[]),
        ]);
        let settings = InstallSettings {
            dependency_version: DependencyVersion::Highest,
            ..Default::default()
        };

        let operations = resolve(&local, &source, settings, "A", "1.0").unwrap();
        assert_eq!(render(&operations), vec!["Install B 2.0", "Install A 1.0"]);
    }

    #[test]
    fn test_satisfied_dependency_is_skipped() {
        let local = InMemoryRepository::with_packages([package("B", "1.5", &[])]);
        let source = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "1.0")]),
            package("B", "1.0", &[]),
            package("B", "1.5", &[]),
        ]);

        let operations = resolve(&local, &source, InstallSettings::default(), "A", "1.0").unwrap();
        assert_eq!(render(&operations), vec!["Install A 1.0"]);
    }

    #[test]
    fn test_ignore_dependencies() {
        let local = InMemoryRepository::new();
        let source = InMemoryRepository::with_packages([package("A", "1.0", &[("Missing", "1.0")])]);
        let settings = InstallSettings {
            ignore_dependencies: true,
            ..Default::default()
        };

        let operations = resolve(&local, &source, settings, "A", "1.0").unwrap();
        assert_eq!(render(&operations), vec!["Install A 1.0"]);
    }

    #[test]
    fn test_already_installed_is_empty_and_logged() {
        let local = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "1.0")]),
            package("B", "1.0", &[]),
        ]);
        let source = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "1.0")]),
            package("B", "1.0", &[]),
        ]);
        let mut logger = MockLogger::new();
        logger
            .expect_log()
            .withf(|level, message| *level == MessageLevel::Info && message.contains("already installed"))
            .times(1)
            .return_const(());

        let target = source.packages()[0].clone();
        let operations = InstallWalker::new(
            &local,
            &source,
            &NullConstraintProvider,
            &logger,
            InstallSettings::default(),
        )
        .resolve_operations(target)
        .unwrap();
        assert!(operations.is_empty());
    }

    #[test]
    fn test_missing_dependency_is_error() {
        let local = InMemoryRepository::new();
        let source = InMemoryRepository::with_packages([package("A", "1.0", &[("B", "2.0")])]);

        let err = resolve(&local, &source, InstallSettings::default(), "A", "1.0").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to resolve dependency 'B (>= 2.0)' of 'A 1.0'."
        );
    }

    #[test]
    fn test_cycle_is_detected() {
        let local = InMemoryRepository::new();
        let source = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "1.0")]),
            package("B", "1.0", &[("A", "1.0")]),
        ]);

        let err = resolve(&local, &source, InstallSettings::default(), "A", "1.0").unwrap_err();
        assert_eq!(
            err,
            ResolveError::CircularDependency {
                chain: "A 1.0 => B 1.0 => A 1.0".into()
            }
        );
    }

    #[test]
    fn test_conflicting_selection_is_error() {
        let local = InMemoryRepository::new();
        let source = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "1.0"), ("C", "1.0")]),
            package("B", "1.0", &[("D", "[1.0]")]),
            package("C", "1.0", &[("D", "[2.0]")]),
            package("D", "1.0", &[]),
            package("D", "2.0", &[]),
        ]);

        let err = resolve(&local, &source, InstallSettings::default(), "A", "1.0").unwrap_err();
        assert!(matches!(err, ResolveError::VersionConflict { .. }), "{err}");
    }

    #[test]
    fn test_replacing_installed_version() {
        let local = InMemoryRepository::with_packages([package("B", "1.0", &[])]);
        let source = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "2.0")]),
            package("B", "1.0", &[]),
            package("B", "2.0", &[]),
        ]);

        let operations = resolve(&local, &source, InstallSettings::default(), "A", "1.0").unwrap();
        assert_eq!(
            render(&operations),
            vec!["Uninstall B 1.0", "Install B 2.0", "Install A 1.0"]
        );
    }

    #[test]
    fn test_dependent_is_moved_forward() {
        let local = InMemoryRepository::with_packages([
            package("Web", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Core", "1.0", &[]),
        ]);
        let source = InMemoryRepository::with_packages([
            package("Web", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Web", "2.0", &[("Core", "2.0")]),
            package("Core", "1.0", &[]),
            package("Core", "2.0", &[]),
        ]);

        let operations = resolve(&local, &source, InstallSettings::default(), "Core", "2.0").unwrap();
        assert_eq!(
            render(&operations),
            vec!["Uninstall Core 1.0", "Install Core 2.0", "Uninstall Web 1.0", "Install Web 2.0"]
        );
    }

    #[test]
    fn test_dependent_without_upgrade_is_conflict() {
        let local = InMemoryRepository::with_packages([
            package("Web", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Core", "1.0", &[]),
        ]);
        let source = InMemoryRepository::with_packages([
            package("Web", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Core", "2.0", &[]),
        ]);

        let err = resolve(&local, &source, InstallSettings::default(), "Core", "2.0").unwrap_err();
        assert_eq!(
            err,
            ResolveError::UpdateConflict {
                package: PackageIdentity::new("Core", "2.0".parse().unwrap()),
                installed: PackageIdentity::new("Core", "1.0".parse().unwrap()),
                dependents: vec![PackageIdentity::new("Web", "1.0".parse().unwrap())],
            }
        );
    }

    #[test]
    fn test_installed_dependency_pins_later_ranges() {
        let local = InMemoryRepository::with_packages([package("B", "1.0", &[])]);
        let source = InMemoryRepository::with_packages([
            package("A", "1.0", &[("B", "[1.0,2.0)"), ("C", "1.0")]),
            package("B", "1.0", &[]),
            package("B", "2.0", &[]),
            package("C", "1.0", &[("B", "[2.0]")]),
        ]);

        let err = resolve(&local, &source, InstallSettings::default(), "A", "1.0").unwrap_err();
        match err {
            ResolveError::VersionConflict { package, selected, .. } => {
                assert_eq!(package, PackageIdentity::new("C", "1.0".parse().unwrap()));
                assert_eq!(selected, PackageIdentity::new("B", "1.0".parse().unwrap()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kept_dependent_moves_within_its_ranges() {
        let local = InMemoryRepository::with_packages([
            package("Lib", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Core", "1.0", &[]),
        ]);
        let source = InMemoryRepository::with_packages([
            package("App", "1.0", &[("Lib", "1.0"), ("Core", "2.0")]),
            package("Lib", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Lib", "2.0", &[("Core", "2.0")]),
            package("Core", "1.0", &[]),
            package("Core", "2.0", &[]),
        ]);

        let operations = resolve(&local, &source, InstallSettings::default(), "App", "1.0").unwrap();
        assert_eq!(
            render(&operations),
            vec![
                "Uninstall Core 1.0",
                "Install Core 2.0",
                "Uninstall Lib 1.0",
                "Install Lib 2.0",
                "Install App 1.0",
            ]
        );
    }

    #[test]
    fn test_kept_dependent_outside_its_ranges_is_conflict() {
        let local = InMemoryRepository::with_packages([
            package("Lib", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Core", "1.0", &[]),
        ]);
        let source = InMemoryRepository::with_packages([
            package("App", "1.0", &[("Lib", "[1.0]"), ("Core", "2.0")]),
            package("Lib", "1.0", &[("Core", "[1.0,2.0)")]),
            package("Lib", "2.0", &[("Core", "2.0")]),
            package("Core", "1.0", &[]),
            package("Core", "2.0", &[]),
        ]);

        let err = resolve(&local, &source, InstallSettings::default(), "App", "1.0").unwrap_err();
        assert!(matches!(err, ResolveError::UpdateConflict { .. }), "{err}");
    }
}
