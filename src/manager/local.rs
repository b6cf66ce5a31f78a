//! In-memory managers
//!
//! Apply operations to in-memory repositories. Useful for hosts that keep
//! their own state and for planning dry runs.

use anyhow::{Result, bail};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{PackageManager, ProjectManager};
use crate::logging::{Logger, MessageLevel};
use crate::operation::{PackageAction, PackageOperation};
use crate::package::{FrameworkName, Package};
use crate::repository::{
    ConstraintProvider, InMemoryRepository, InstalledRepository, NullConstraintProvider, PackageSource,
    SharedPackagesFolder, SharedRepository,
};

/// A project whose references are held in an [`InMemoryRepository`].
pub struct LocalProjectManager {
    name: String,
    repository: Arc<InMemoryRepository>,
    target_framework: Option<FrameworkName>,
    constraints: Arc<dyn ConstraintProvider>,
    binding_redirects: bool,
    redirect_updates: AtomicUsize,
}

impl LocalProjectManager {
    pub fn new(name: impl Into<String>, target_framework: Option<FrameworkName>) -> Self {
        Self {
            name: name.into(),
            repository: Arc::new(InMemoryRepository::new()),
            target_framework,
            constraints: Arc::new(NullConstraintProvider),
            binding_redirects: false,
            redirect_updates: AtomicUsize::new(0),
        }
    }

    pub fn with_repository(mut self, repository: Arc<InMemoryRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn with_constraints(mut self, constraints: Arc<dyn ConstraintProvider>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_binding_redirects(mut self) -> Self {
        self.binding_redirects = true;
        self
    }

    pub fn repository(&self) -> &Arc<InMemoryRepository> {
        &self.repository
    }

    /// How many times binding redirects were regenerated.
    pub fn redirect_updates(&self) -> usize {
        self.redirect_updates.load(Ordering::SeqCst)
    }
}

impl ProjectManager for LocalProjectManager {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn local_repository(&self) -> Arc<dyn InstalledRepository> {
        self.repository.clone()
    }

    fn target_framework(&self) -> Option<FrameworkName> {
        self.target_framework.clone()
    }

    fn constraint_provider(&self) -> Arc<dyn ConstraintProvider> {
        self.constraints.clone()
    }

    fn execute(&self, operation: &PackageOperation, logger: &dyn Logger) -> Result<()> {
        let identity = operation.identity();
        match operation.action {
            PackageAction::Install => {
                if self.repository.contains(&identity) {
                    bail!("'{}' is already referenced by project '{}'", identity, self.name);
                }
                self.repository.insert(operation.package.clone());
                logger.log(
                    MessageLevel::Info,
                    &format!("Successfully added '{}' to {}.", identity, self.name),
                );
            }
            PackageAction::Uninstall => {
                if self.repository.remove(&identity).is_none() {
                    bail!("'{}' is not referenced by project '{}'", identity, self.name);
                }
                logger.log(
                    MessageLevel::Info,
                    &format!("Successfully removed '{}' from {}.", identity, self.name),
                );
            }
        }
        Ok(())
    }

    fn supports_binding_redirects(&self) -> bool {
        self.binding_redirects
    }

    fn add_binding_redirects(&self, logger: &dyn Logger) -> Result<()> {
        self.redirect_updates.fetch_add(1, Ordering::SeqCst);
        logger.log(
            MessageLevel::Debug,
            &format!("Updated binding redirects for {}.", self.name),
        );
        Ok(())
    }
}

/// A packages folder held in a [`SharedPackagesFolder`].
pub struct LocalPackageManager {
    folder: Arc<SharedPackagesFolder>,
    source: Arc<dyn PackageSource>,
}

impl LocalPackageManager {
    pub fn new(folder: Arc<SharedPackagesFolder>, source: Arc<dyn PackageSource>) -> Self {
        Self { folder, source }
    }

    pub fn folder(&self) -> &Arc<SharedPackagesFolder> {
        &self.folder
    }

    /// Register `project` so its references count towards the folder.
    pub fn add_project(&self, project: &dyn ProjectManager) {
        self.folder
            .register_project(&project.name(), project.local_repository());
    }
}

impl PackageManager for LocalPackageManager {
    fn local_repository(&self) -> Arc<dyn InstalledRepository> {
        self.folder.clone()
    }

    fn shared_repository(&self) -> Arc<dyn SharedRepository> {
        self.folder.clone()
    }

    fn source_repository(&self) -> Arc<dyn PackageSource> {
        self.source.clone()
    }

    fn is_project_level(&self, package: &Package) -> bool {
        package.has_project_content || package.has_dependencies()
    }

    fn execute(&self, operation: &PackageOperation, logger: &dyn Logger) -> Result<()> {
        let identity = operation.identity();
        let folder: &dyn InstalledRepository = self.folder.as_ref();
        match operation.action {
            PackageAction::Install => {
                if self.folder.contains(&identity) {
                    bail!("'{}' is already in the packages folder", identity);
                }
                folder.add_package(operation.package.clone())?;
                logger.log(
                    MessageLevel::Info,
                    &format!("Successfully installed '{}'.", identity),
                );
            }
            PackageAction::Uninstall => {
                folder.remove_package(&identity)?;
                logger.log(
                    MessageLevel::Info,
                    &format!("Successfully uninstalled '{}'.", identity),
                );
            }
        }
        Ok(())
    }
}
