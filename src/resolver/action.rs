use std::collections::HashMap;
use std::sync::Arc;

use super::{ResolverOptions, UninstallOptions};
use crate::error::ResolveError;
use crate::logging::Logger;
use crate::manager::{PackageManager, ProjectManager};
use crate::operation::{Operation, PackageAction, PackageOperation, PackageOperationTarget};
use crate::package::{FrameworkName, Package, PackageIdentity};
use crate::repository::{InstalledRepository, NullConstraintProvider, VirtualRepository};
use crate::walker::{InstallSettings, InstallWalker, UninstallSettings, UninstallWalker, UpdateWalker};

/// One requested change in a batch.
#[derive(Clone)]
pub struct PlanRequest {
    pub action: PackageAction,
    pub package: Arc<Package>,
    /// `None` targets the solution rather than one project.
    pub project: Option<Arc<dyn ProjectManager>>,
}

impl PlanRequest {
    pub fn install(package: Arc<Package>, project: Option<Arc<dyn ProjectManager>>) -> Self {
        Self {
            action: PackageAction::Install,
            package,
            project,
        }
    }

    pub fn uninstall(package: Arc<Package>, project: Option<Arc<dyn ProjectManager>>) -> Self {
        Self {
            action: PackageAction::Uninstall,
            package,
            project,
        }
    }
}

/// Turns requested changes into operations bound to their managers.
///
/// Planned project operations are recorded in per-project overlays, so later
/// requests in the same batch see the state earlier requests would leave
/// behind. Nothing is written to the real repositories.
pub struct ActionResolver {
    package_manager: Arc<dyn PackageManager>,
    options: ResolverOptions,
    logger: Arc<dyn Logger>,
    project_overlays: HashMap<String, Arc<VirtualRepository>>,
    folder_overlay: Arc<VirtualRepository>,
}

impl ActionResolver {
    pub fn new(package_manager: Arc<dyn PackageManager>, options: ResolverOptions, logger: Arc<dyn Logger>) -> Self {
        let folder_overlay = Arc::new(VirtualRepository::new(package_manager.local_repository()));
        Self {
            package_manager,
            options,
            logger,
            project_overlays: HashMap::new(),
            folder_overlay,
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ResolverOptions {
        &mut self.options
    }

    pub fn package_manager(&self) -> &Arc<dyn PackageManager> {
        &self.package_manager
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Forget every planned change.
    pub fn reset(&mut self) {
        self.project_overlays.clear();
        self.folder_overlay = Arc::new(VirtualRepository::new(self.package_manager.local_repository()));
    }

    /// The project's repository as planned so far in this batch.
    pub fn project_view(&mut self, project: &dyn ProjectManager) -> Arc<dyn InstalledRepository> {
        self.project_overlay(project)
    }

    /// The packages folder as planned so far in this batch.
    pub fn folder_view(&self) -> Arc<dyn InstalledRepository> {
        self.folder_overlay.clone()
    }

    /// Plan `action` on `package` for `project`.
    ///
    /// Packages that are not project-level, or requests without a project,
    /// are planned against the shared packages folder only.
    #[tracing::instrument(skip_all, fields(action = %action, package = %package))]
    pub fn resolve_project_operations(
        &mut self,
        action: PackageAction,
        package: Arc<Package>,
        project: Option<Arc<dyn ProjectManager>>,
    ) -> Result<Vec<Operation>, ResolveError> {
        let project = project.filter(|_| self.package_manager.is_project_level(&package));
        match project {
            Some(project) => self.resolve_for_project(action, package, project),
            None => self.resolve_for_solution(action, package),
        }
    }

    fn resolve_for_project(
        &mut self,
        action: PackageAction,
        package: Arc<Package>,
        project: Arc<dyn ProjectManager>,
    ) -> Result<Vec<Operation>, ResolveError> {
        let overlay = self.project_overlay(project.as_ref());
        let target_framework = project.target_framework();
        log::debug!("Resolving {} {} for project '{}'", action, package, project.name());

        let operations = match action {
            PackageAction::Install => {
                let source = self.package_manager.source_repository();
                let constraints = project.constraint_provider();
                let settings = self.install_settings(target_framework, PackageOperationTarget::Project);
                InstallWalker::new(
                    overlay.as_ref(),
                    source.as_ref(),
                    constraints.as_ref(),
                    self.logger.as_ref(),
                    settings,
                )
                .resolve_operations(package)?
            }
            PackageAction::Uninstall => {
                let settings =
                    uninstall_settings(&self.options.uninstall, target_framework, PackageOperationTarget::Project);
                UninstallWalker::new(overlay.as_ref(), self.logger.as_ref(), settings)
                    .resolve_operations(&package.identity())?
            }
        };

        Ok(operations
            .into_iter()
            .map(|operation| {
                overlay.apply(&operation);
                Operation::for_project(operation, project.clone())
            })
            .collect())
    }

    fn resolve_for_solution(&mut self, action: PackageAction, package: Arc<Package>) -> Result<Vec<Operation>, ResolveError> {
        let overlay = self.folder_overlay.clone();
        log::debug!("Resolving {} {} for the solution", action, package);

        let operations = match action {
            PackageAction::Install => {
                let source = self.package_manager.source_repository();
                let settings = self.install_settings(None, PackageOperationTarget::PackagesFolder);
                UpdateWalker::new(
                    overlay.as_ref(),
                    source.as_ref(),
                    &NullConstraintProvider,
                    self.logger.as_ref(),
                    settings,
                )
                .resolve_operations(package)?
            }
            PackageAction::Uninstall => {
                let settings =
                    uninstall_settings(&self.options.uninstall, None, PackageOperationTarget::PackagesFolder);
                UninstallWalker::new(overlay.as_ref(), self.logger.as_ref(), settings)
                    .resolve_operations(&package.identity())?
            }
        };

        Ok(operations
            .into_iter()
            .map(|operation| {
                overlay.apply(&operation);
                Operation::for_packages_folder(operation, self.package_manager.clone())
            })
            .collect())
    }

    /// Add the packages-folder operations that project operations imply.
    ///
    /// Reference counts start from every registered project repository. A
    /// package whose count rises from zero is installed into the folder
    /// before any project operation; a package whose count drops to zero is
    /// purged after all of them.
    #[tracing::instrument(skip_all, fields(count = project_operations.len()))]
    pub fn resolve_final_operations(&self, project_operations: Vec<Operation>) -> Vec<Operation> {
        let folder = self.folder_overlay.as_ref();
        let planned_in_folder = |identity: &PackageIdentity| {
            project_operations.iter().any(|o| {
                o.is_packages_folder() && o.action() == PackageAction::Install && o.operation.identity() == *identity
            })
        };
        let mut counts: HashMap<PackageIdentity, i64> = HashMap::new();
        for repository in self.package_manager.shared_repository().load_project_repositories() {
            for package in repository.get_packages() {
                *counts.entry(package.identity()).or_default() += 1;
            }
        }

        let mut installs: Vec<PackageOperation> = Vec::new();
        let mut uninstalls: Vec<PackageOperation> = Vec::new();
        for operation in project_operations.iter().filter(|o| !o.is_packages_folder()) {
            let package = &operation.operation.package;
            let identity = package.identity();
            let count = counts.entry(identity.clone()).or_default();
            match operation.action() {
                PackageAction::Install => {
                    *count += 1;
                    if *count != 1 {
                        continue;
                    }
                    if let Some(pending) = uninstalls.iter().position(|u| u.identity() == identity) {
                        uninstalls.remove(pending);
                    } else if !folder.exists(&identity)
                        && !planned_in_folder(&identity)
                        && !installs.iter().any(|i| i.identity() == identity)
                    {
                        installs.push(PackageOperation::install(
                            package.clone(),
                            PackageOperationTarget::PackagesFolder,
                        ));
                    }
                }
                PackageAction::Uninstall => {
                    *count -= 1;
                    let present = folder.exists(&identity)
                        || planned_in_folder(&identity)
                        || installs.iter().any(|i| i.identity() == identity);
                    if *count <= 0 && present && !uninstalls.iter().any(|u| u.identity() == identity) {
                        uninstalls.push(PackageOperation::uninstall(
                            package.clone(),
                            PackageOperationTarget::PackagesFolder,
                        ));
                    }
                }
            }
        }

        let to_folder = |operation: PackageOperation| Operation::for_packages_folder(operation, self.package_manager.clone());
        installs
            .into_iter()
            .map(to_folder)
            .chain(project_operations)
            .chain(uninstalls.into_iter().map(to_folder))
            .collect()
    }

    /// Resolve every request in order, then reconcile the packages folder
    /// once for the whole batch.
    pub fn resolve_plan(&mut self, requests: Vec<PlanRequest>) -> Result<Vec<Operation>, ResolveError> {
        let mut operations = Vec::new();
        for request in requests {
            operations.extend(self.resolve_project_operations(request.action, request.package, request.project)?);
        }
        Ok(self.resolve_final_operations(operations))
    }

    pub(crate) fn install_settings(
        &self,
        target_framework: Option<FrameworkName>,
        target: PackageOperationTarget,
    ) -> InstallSettings {
        InstallSettings {
            target_framework,
            allow_prerelease: self.options.allow_prerelease,
            dependency_version: self.options.dependency_version,
            ignore_dependencies: self.options.ignore_dependencies,
            update_dependencies: self.options.update_dependencies,
            target,
        }
    }

    fn project_overlay(&mut self, project: &dyn ProjectManager) -> Arc<VirtualRepository> {
        self.project_overlays
            .entry(project.name())
            .or_insert_with(|| Arc::new(VirtualRepository::new(project.local_repository())))
            .clone()
    }
}

fn uninstall_settings(
    options: &UninstallOptions,
    target_framework: Option<FrameworkName>,
    target: PackageOperationTarget,
) -> UninstallSettings {
    UninstallSettings {
        target_framework,
        force: options.force,
        remove_dependencies: options.remove_dependencies,
        target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullLogger;
    use crate::manager::{LocalPackageManager, LocalProjectManager};
    use crate::package::PackageDependency;
    use crate::repository::{InMemoryRepository, SharedPackagesFolder};

    struct Solution {
        folder: Arc<SharedPackagesFolder>,
        manager: Arc<LocalPackageManager>,
    }

    fn package(id: &str, version: &str, deps: &[&str]) -> Package {
        Package::new(id, version.parse().unwrap())
            .with_dependencies(deps.iter().map(|d| PackageDependency::any(*d)).collect())
    }

    fn solution(source: Vec<Package>) -> Solution {
        let folder = Arc::new(SharedPackagesFolder::new());
        let manager = Arc::new(LocalPackageManager::new(
            folder.clone(),
            Arc::new(InMemoryRepository::with_packages(source)),
        ));
        Solution { folder, manager }
    }

    fn project(solution: &Solution, name: &str, installed: Vec<Package>) -> Arc<LocalProjectManager> {
        let project = Arc::new(
            LocalProjectManager::new(name, None)
                .with_repository(Arc::new(InMemoryRepository::with_packages(installed))),
        );
        solution.manager.add_project(project.as_ref());
        project
    }

    fn resolver(solution: &Solution) -> ActionResolver {
        ActionResolver::new(solution.manager.clone(), ResolverOptions::default(), Arc::new(NullLogger))
    }

    fn render(operations: &[Operation]) -> Vec<String> {
        operations.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn test_install_into_empty_project() {
        let solution = solution(vec![package("Foo", "1.0", &[])]);
        let web = project(&solution, "Web", vec![]);
        let mut resolver = resolver(&solution);

        let operations = resolver
            .resolve_project_operations(PackageAction::Install, Arc::new(package("Foo", "1.0", &[])), Some(web))
            .unwrap();
        let operations = resolver.resolve_final_operations(operations);
        assert_eq!(
            render(&operations),
            vec!["Install Foo 1.0 @ packages folder", "Install Foo 1.0 @ Web"]
        );
    }

    #[test]
    fn test_solution_level_package_targets_folder() {
        let tool = package("Tool", "1.0", &[]).without_project_content();
        let solution = solution(vec![tool.clone()]);
        let web = project(&solution, "Web", vec![]);
        let mut resolver = resolver(&solution);

        let operations = resolver
            .resolve_project_operations(PackageAction::Install, Arc::new(tool), Some(web))
            .unwrap();
        let operations = resolver.resolve_final_operations(operations);
        assert_eq!(render(&operations), vec!["Install Tool 1.0 @ packages folder"]);
    }

    #[test]
    fn test_folder_install_planned_earlier_in_batch_is_reused() {
        let tool = package("Tool", "1.0", &[]).without_project_content();
        let app = package("App", "1.0", &["Tool"]);
        let solution = solution(vec![tool.clone(), app.clone()]);
        let web = project(&solution, "Web", vec![]);
        let mut resolver = resolver(&solution);

        let plan = resolver
            .resolve_plan(vec![
                PlanRequest::install(Arc::new(tool), Some(web.clone())),
                PlanRequest::install(Arc::new(app), Some(web)),
            ])
            .unwrap();
        assert_eq!(
            render(&plan),
            vec![
                "Install App 1.0 @ packages folder",
                "Install Tool 1.0 @ packages folder",
                "Install Tool 1.0 @ Web",
                "Install App 1.0 @ Web",
            ]
        );
        assert!(solution.folder.packages().is_empty());
    }

    #[test]
    fn test_overlay_carries_state_between_requests() {
        let solution = solution(vec![package("A", "1.0", &["B"]), package("B", "1.0", &[])]);
        let web = project(&solution, "Web", vec![]);
        let mut resolver = resolver(&solution);

        let plan = resolver
            .resolve_plan(vec![
                PlanRequest::install(Arc::new(package("B", "1.0", &[])), Some(web.clone())),
                PlanRequest::install(Arc::new(package("A", "1.0", &["B"])), Some(web.clone())),
            ])
            .unwrap();
        assert_eq!(
            render(&plan),
            vec![
                "Install B 1.0 @ packages folder",
                "Install A 1.0 @ packages folder",
                "Install B 1.0 @ Web",
                "Install A 1.0 @ Web",
            ]
        );
        assert!(web.repository().is_empty());
        assert!(resolver.project_view(web.as_ref()).exists_id("A"));
    }

    #[test]
    fn test_shared_package_purged_only_when_unreferenced() {
        let foo = package("Foo", "1.0", &[]);
        let solution = solution(vec![foo.clone()]);
        solution.folder.add_package(Arc::new(foo.clone())).unwrap();
        let web = project(&solution, "Web", vec![foo.clone()]);
        let lib = project(&solution, "Lib", vec![foo.clone()]);
        let mut resolver = resolver(&solution);
        let foo = Arc::new(foo);

        let first = resolver
            .resolve_plan(vec![PlanRequest::uninstall(foo.clone(), Some(web.clone()))])
            .unwrap();
        assert_eq!(render(&first), vec!["Uninstall Foo 1.0 @ Web"]);

        resolver.reset();
        let both = resolver
            .resolve_plan(vec![
                PlanRequest::uninstall(foo.clone(), Some(web)),
                PlanRequest::uninstall(foo, Some(lib)),
            ])
            .unwrap();
        assert_eq!(
            render(&both),
            vec![
                "Uninstall Foo 1.0 @ Web",
                "Uninstall Foo 1.0 @ Lib",
                "Uninstall Foo 1.0 @ packages folder",
            ]
        );
    }

    #[test]
    fn test_moving_package_between_projects_keeps_folder_copy() {
        let foo = package("Foo", "1.0", &[]);
        let solution = solution(vec![foo.clone()]);
        solution.folder.add_package(Arc::new(foo.clone())).unwrap();
        let web = project(&solution, "Web", vec![foo.clone()]);
        let lib = project(&solution, "Lib", vec![]);
        let mut resolver = resolver(&solution);
        let foo = Arc::new(foo);

        let plan = resolver
            .resolve_plan(vec![
                PlanRequest::uninstall(foo.clone(), Some(web)),
                PlanRequest::install(foo, Some(lib)),
            ])
            .unwrap();
        assert_eq!(render(&plan), vec!["Uninstall Foo 1.0 @ Web", "Install Foo 1.0 @ Lib"]);
    }

    #[test]
    fn test_resolution_errors_surface() {
        let solution = solution(vec![package("A", "1.0", &["Missing"])]);
        let web = project(&solution, "Web", vec![]);
        let mut resolver = resolver(&solution);

        let err = resolver
            .resolve_project_operations(PackageAction::Install, Arc::new(package("A", "1.0", &["Missing"])), Some(web))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvedDependency { .. }));
    }
}
