//! Error taxonomy for resolution and execution.

use crate::package::PackageIdentity;
use crate::version::SemanticVersion;

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| format!("'{}'", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn version_suffix(version: &Option<String>) -> String {
    version
        .as_ref()
        .map(|v| format!(" version '{}'", v))
        .unwrap_or_default()
}

/// Errors raised while walking the dependency graph or planning operations.
///
/// These are always returned to the caller; a plan that cannot be resolved is
/// never reduced to an empty or partial list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Unable to find package '{id}'{}.", version_suffix(.version))]
    UnknownPackage { id: String, version: Option<String> },

    #[error("Unable to resolve dependency '{dependency}' of '{package}'.")]
    UnresolvedDependency {
        dependency: String,
        package: PackageIdentity,
    },

    #[error("Circular dependency detected '{chain}'.")]
    CircularDependency { chain: String },

    #[error("Unable to find a compatible dependency set for '{package}' targeting '{framework}'.")]
    IncompatibleFramework {
        package: PackageIdentity,
        framework: String,
    },

    #[error("Unable to uninstall '{package}' because {} depend(s) on it.", join(.dependents))]
    HasDependents {
        package: PackageIdentity,
        dependents: Vec<PackageIdentity>,
    },

    #[error("Updating '{installed}' to '{package}' failed. Unable to find a version of {} that is compatible with '{package}'.", join(.dependents))]
    UpdateConflict {
        package: PackageIdentity,
        installed: PackageIdentity,
        dependents: Vec<PackageIdentity>,
    },

    #[error("'{package}' requires '{dependency}' but '{selected}' was already selected.")]
    VersionConflict {
        dependency: String,
        package: PackageIdentity,
        selected: PackageIdentity,
    },

    #[error("Unable to update '{id}': more than one version is installed in the solution ({}). Specify a project.", join(.versions))]
    AmbiguousUpdate {
        id: String,
        versions: Vec<SemanticVersion>,
    },

    #[error("'{package}' is not referenced by any project.")]
    NotReferenced { package: PackageIdentity },

    #[error("'{id}' is not installed in the solution.")]
    NotInstalled { id: String },

    #[error("'{id}' is not installed in project '{project}'.")]
    NotInstalledInProject { id: String, project: String },
}

/// Error returned when executing a plan fails.
///
/// By the time this is returned every operation completed before the failure
/// has been rolled back.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("{operation} failed; rolled back {rolled_back} completed operation(s)")]
    OperationFailed {
        operation: String,
        rolled_back: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl ExecuteError {
    /// The original failure that aborted the batch.
    pub fn cause(&self) -> &anyhow::Error {
        match self {
            ExecuteError::OperationFailed { source, .. } => source,
        }
    }
}
