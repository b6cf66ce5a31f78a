use std::collections::HashSet;
use std::sync::Arc;

use super::{ActionResolver, UpdateOptions};
use crate::error::ResolveError;
use crate::logging::MessageLevel;
use crate::manager::ProjectManager;
use crate::operation::{Operation, PackageAction};
use crate::package::{Package, PackageId};
use crate::version::{SemanticVersion, VersionSpec};
use crate::walker::PackageSorter;

/// Whether moving from `old` to `new` counts as an update.
///
/// Kept exactly as the package manager has always evaluated it: the
/// condition admits prerelease-to-prerelease moves even without
/// `allow_prerelease`, and only rejects moving a prerelease to an older
/// release.
pub fn should_update(old: &Package, new: &Package, allow_prerelease: bool, explicit_version: bool) -> bool {
    allow_prerelease
        || explicit_version
        || old.is_release_version()
        || !new.is_release_version()
        || old.version < new.version
}

/// Update flows over an [`ActionResolver`]: update everything, update one
/// package, optionally within the safe range.
pub struct UpdateUtility {
    resolver: ActionResolver,
    projects: Vec<Arc<dyn ProjectManager>>,
    options: UpdateOptions,
}

impl UpdateUtility {
    pub fn new(mut resolver: ActionResolver, projects: Vec<Arc<dyn ProjectManager>>, options: UpdateOptions) -> Self {
        resolver.options_mut().update_dependencies = options.update_dependencies;
        Self {
            resolver,
            projects,
            options,
        }
    }

    pub fn resolver(&self) -> &ActionResolver {
        &self.resolver
    }

    pub fn into_resolver(self) -> ActionResolver {
        self.resolver
    }

    /// Update every installed package.
    ///
    /// Packages are visited dependents first. Project-level packages are
    /// updated in every project that has them, the others against the
    /// packages folder.
    #[tracing::instrument(skip_all)]
    pub fn resolve_update_all(&mut self) -> Result<Vec<Operation>, ResolveError> {
        let package_manager = self.resolver.package_manager().clone();
        let folder = package_manager.local_repository();
        let sorted = PackageSorter::new(None).get_packages_by_dependency_order(folder.as_ref())?;

        let mut seen: HashSet<PackageId> = HashSet::new();
        let mut operations = Vec::new();
        for package in sorted.into_iter().rev() {
            if !seen.insert(package.key()) {
                continue;
            }
            if package_manager.is_project_level(&package) {
                for project in self.projects.clone() {
                    if self.resolver.project_view(project.as_ref()).exists_id(&package.id) {
                        operations.extend(self.update_in_project(&package.id, None, project)?);
                    }
                }
            } else {
                operations.extend(self.update_solution_level(&package.id, None)?);
            }
        }
        Ok(self.resolver.resolve_final_operations(operations))
    }

    /// Update `id`, to `version` when given, in `project` or wherever it is
    /// installed.
    #[tracing::instrument(skip(self))]
    pub fn resolve_update(
        &mut self,
        id: &str,
        version: Option<SemanticVersion>,
        project: Option<&str>,
    ) -> Result<Vec<Operation>, ResolveError> {
        let installed = self.find_package_to_update(id, project)?;
        let is_project_level = self.resolver.package_manager().is_project_level(&installed);

        let mut operations = Vec::new();
        if let Some(name) = project {
            let project = self.project(id, name)?;
            operations.extend(self.update_in_project(id, version, project)?);
        } else if is_project_level {
            for project in self.projects.clone() {
                if self.resolver.project_view(project.as_ref()).exists_id(id) {
                    operations.extend(self.update_in_project(id, version.clone(), project)?);
                }
            }
        } else {
            operations.extend(self.update_solution_level(id, version)?);
        }
        Ok(self.resolver.resolve_final_operations(operations))
    }

    /// The installed package an update of `id` starts from.
    ///
    /// A single version found across the projects wins. Otherwise the packages
    /// folder decides: solution-level packages resolve to their highest
    /// version, a single project-level version must be referenced by some
    /// project, and several project-level versions are ambiguous.
    pub fn find_package_to_update(&mut self, id: &str, project: Option<&str>) -> Result<Arc<Package>, ResolveError> {
        if let Some(name) = project {
            let project = self.project(id, name)?;
            return self
                .resolver
                .project_view(project.as_ref())
                .find_package(id, None)
                .ok_or_else(|| ResolveError::NotInstalledInProject {
                    id: id.to_string(),
                    project: name.to_string(),
                });
        }

        let mut in_projects: Vec<Arc<Package>> = Vec::new();
        for project in self.projects.clone() {
            if let Some(package) = self.resolver.project_view(project.as_ref()).find_package(id, None) {
                if !in_projects.iter().any(|p| p.identity() == package.identity()) {
                    in_projects.push(package);
                }
            }
        }
        if in_projects.len() == 1 {
            return Ok(in_projects.remove(0));
        }

        let package_manager = self.resolver.package_manager().clone();
        let candidates = self.resolver.folder_view().find_packages_by_id(id);
        if candidates.is_empty() {
            return Err(ResolveError::NotInstalled { id: id.to_string() });
        }

        let (project_level, solution_level): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|p| package_manager.is_project_level(p));

        match project_level.as_slice() {
            [] => solution_level
                .into_iter()
                .max_by(|a, b| a.version.cmp(&b.version))
                .ok_or_else(|| ResolveError::NotInstalled { id: id.to_string() }),
            [single] => {
                if package_manager.shared_repository().is_referenced(&single.id, &single.version) {
                    Ok(single.clone())
                } else {
                    Err(ResolveError::NotReferenced {
                        package: single.identity(),
                    })
                }
            }
            several => Err(ResolveError::AmbiguousUpdate {
                id: id.to_string(),
                versions: several.iter().map(|p| p.version.clone()).collect(),
            }),
        }
    }

    fn project(&self, id: &str, name: &str) -> Result<Arc<dyn ProjectManager>, ResolveError> {
        self.projects
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| ResolveError::NotInstalledInProject {
                id: id.to_string(),
                project: name.to_string(),
            })
    }

    /// The candidate range for an update from `installed`.
    fn candidate_spec(&self, installed: &Package, version: Option<&SemanticVersion>) -> Option<VersionSpec> {
        match version {
            Some(version) => Some(VersionSpec::exact(version.clone())),
            None if self.options.safe => Some(installed.version.safe_range()),
            None => None,
        }
    }

    fn update_in_project(
        &mut self,
        id: &str,
        version: Option<SemanticVersion>,
        project: Arc<dyn ProjectManager>,
    ) -> Result<Vec<Operation>, ResolveError> {
        let name = project.name();
        let installed = self
            .resolver
            .project_view(project.as_ref())
            .find_package(id, None)
            .ok_or_else(|| ResolveError::NotInstalledInProject {
                id: id.to_string(),
                project: name.clone(),
            })?;
        let constraint = project.constraint_provider().get_constraint(id);
        let candidate = self.find_candidate(&installed, version.as_ref(), constraint.as_ref())?;

        match candidate {
            Some(candidate) => {
                log::info!("Updating {} to {} in project '{}'", installed, candidate.version, name);
                self.resolver
                    .resolve_project_operations(PackageAction::Install, candidate, Some(project))
            }
            None => {
                self.resolver.logger().log(
                    MessageLevel::Info,
                    &format!("No updates available for '{}' in project '{}'.", id, name),
                );
                Ok(Vec::new())
            }
        }
    }

    fn update_solution_level(&mut self, id: &str, version: Option<SemanticVersion>) -> Result<Vec<Operation>, ResolveError> {
        let installed = self
            .resolver
            .folder_view()
            .find_package(id, None)
            .ok_or_else(|| ResolveError::NotInstalled { id: id.to_string() })?;
        let candidate = self.find_candidate(&installed, version.as_ref(), None)?;

        match candidate {
            Some(candidate) => self
                .resolver
                .resolve_project_operations(PackageAction::Install, candidate, None),
            None => {
                self.resolver.logger().log(
                    MessageLevel::Info,
                    &format!("No updates available for '{}'.", id),
                );
                Ok(Vec::new())
            }
        }
    }

    /// The source package to move `installed` to, if any.
    fn find_candidate(
        &self,
        installed: &Package,
        version: Option<&SemanticVersion>,
        constraint: Option<&VersionSpec>,
    ) -> Result<Option<Arc<Package>>, ResolveError> {
        let allow_prerelease = self.resolver.options().allow_prerelease;
        let spec = self.candidate_spec(installed, version);
        let source = self.resolver.package_manager().source_repository();

        let found = source.find_package(&installed.id, spec.as_ref(), constraint, allow_prerelease, false);
        if let (None, Some(version)) = (&found, version) {
            return Err(ResolveError::UnknownPackage {
                id: installed.id.clone(),
                version: Some(version.to_string()),
            });
        }

        Ok(found.filter(|candidate| {
            candidate.version != installed.version
                && should_update(installed, candidate, allow_prerelease, version.is_some())
        }))
    }
}
