//! Manager interfaces
//!
//! The planner never touches a project or the packages folder directly. It
//! hands each operation to a [`ProjectManager`] (references and content of one
//! project) or to the [`PackageManager`] (the shared packages folder), which the
//! host implements. In-memory implementations live in [`local`].

pub mod local;

use anyhow::Result;
use std::sync::Arc;

use crate::logging::Logger;
use crate::operation::PackageOperation;
use crate::package::{FrameworkName, Package};
use crate::repository::{ConstraintProvider, InstalledRepository, PackageSource, SharedRepository};

pub use local::{LocalPackageManager, LocalProjectManager};

/// One project of the solution.
#[cfg_attr(test, mockall::automock)]
pub trait ProjectManager: Send + Sync {
    /// Unique name of the project within the solution.
    fn name(&self) -> String;

    /// Packages referenced by the project.
    fn local_repository(&self) -> Arc<dyn InstalledRepository>;

    fn target_framework(&self) -> Option<FrameworkName>;

    fn constraint_provider(&self) -> Arc<dyn ConstraintProvider>;

    /// Add or remove the package's references and content.
    fn execute(&self, operation: &PackageOperation, logger: &dyn Logger) -> Result<()>;

    fn supports_binding_redirects(&self) -> bool {
        false
    }

    /// Regenerate binding redirects after references changed.
    fn add_binding_redirects(&self, _logger: &dyn Logger) -> Result<()> {
        Ok(())
    }
}

/// The solution-wide packages folder.
#[cfg_attr(test, mockall::automock)]
pub trait PackageManager: Send + Sync {
    /// Packages stored in the shared folder.
    fn local_repository(&self) -> Arc<dyn InstalledRepository>;

    /// Project registration for reference counting.
    fn shared_repository(&self) -> Arc<dyn SharedRepository>;

    fn source_repository(&self) -> Arc<dyn PackageSource>;

    /// Whether `package` belongs in projects rather than only in the shared
    /// folder.
    fn is_project_level(&self, package: &Package) -> bool;

    /// Download into or purge from the shared folder.
    fn execute(&self, operation: &PackageOperation, logger: &dyn Logger) -> Result<()>;
}
