use std::fmt;
use std::sync::Arc;

use super::{PackageAction, PackageOperation, PackageOperationTarget};
use crate::manager::{PackageManager, ProjectManager};

/// The manager an operation is applied through.
#[derive(Clone)]
pub enum ExecutionTarget {
    Project(Arc<dyn ProjectManager>),
    PackagesFolder(Arc<dyn PackageManager>),
}

impl fmt::Debug for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTarget::Project(project) => f.debug_tuple("Project").field(&project.name()).finish(),
            ExecutionTarget::PackagesFolder(_) => f.write_str("PackagesFolder"),
        }
    }
}

/// A [`PackageOperation`] bound to the manager that applies it.
#[derive(Debug, Clone)]
pub struct Operation {
    pub operation: PackageOperation,
    pub target: ExecutionTarget,
}

impl Operation {
    pub fn for_project(operation: PackageOperation, project: Arc<dyn ProjectManager>) -> Self {
        Self {
            operation,
            target: ExecutionTarget::Project(project),
        }
    }

    pub fn for_packages_folder(operation: PackageOperation, manager: Arc<dyn PackageManager>) -> Self {
        Self {
            operation,
            target: ExecutionTarget::PackagesFolder(manager),
        }
    }

    pub fn action(&self) -> PackageAction {
        self.operation.action
    }

    pub fn is_packages_folder(&self) -> bool {
        matches!(self.target, ExecutionTarget::PackagesFolder(_))
    }

    /// Name of the project this operation applies to, if any.
    pub fn project_name(&self) -> Option<String> {
        match &self.target {
            ExecutionTarget::Project(project) => Some(project.name()),
            ExecutionTarget::PackagesFolder(_) => None,
        }
    }

    /// Same package and manager with the action inverted.
    pub fn inverse(&self) -> Self {
        Self {
            operation: self.operation.inverse(),
            target: self.target.clone(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            ExecutionTarget::Project(project) => {
                write!(f, "{} @ {}", self.operation, project.name())
            }
            ExecutionTarget::PackagesFolder(_) => {
                write!(f, "{} @ {}", self.operation, PackageOperationTarget::PackagesFolder)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{MockPackageManager, MockProjectManager};
    use crate::package::Package;

    fn package() -> Arc<Package> {
        Arc::new(Package::new("Foo", "1.0".parse().unwrap()))
    }

    #[test]
    fn test_display_names_target() {
        let mut project = MockProjectManager::new();
        project.expect_name().returning(|| "Web".to_string());
        let operation = Operation::for_project(
            PackageOperation::install(package(), PackageOperationTarget::Project),
            Arc::new(project),
        );
        assert_eq!(operation.to_string(), "Install Foo 1.0 @ Web");
        assert_eq!(operation.project_name().as_deref(), Some("Web"));
        assert_eq!(operation.inverse().to_string(), "Uninstall Foo 1.0 @ Web");

        let folder = Operation::for_packages_folder(
            PackageOperation::uninstall(package(), PackageOperationTarget::PackagesFolder),
            Arc::new(MockPackageManager::new()),
        );
        assert_eq!(folder.to_string(), "Uninstall Foo 1.0 @ packages folder");
        assert!(folder.is_packages_folder());
        assert_eq!(folder.action(), PackageAction::Uninstall);
    }
}
