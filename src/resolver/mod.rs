//! Operation planning
//!
//! [`ActionResolver`] plans requested installs and uninstalls per project or
//! for the solution, then reconciles the shared packages folder against the
//! planned project operations. [`UpdateUtility`] builds the update flows on
//! top of it.

mod action;
mod update;

use crate::version::DependencyVersion;

pub use action::{ActionResolver, PlanRequest};
pub use update::{UpdateUtility, should_update};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UninstallOptions {
    pub force: bool,
    pub remove_dependencies: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    pub allow_prerelease: bool,
    pub dependency_version: DependencyVersion,
    pub ignore_dependencies: bool,
    /// Move installed dependencies forward when the dependency policy picks a
    /// newer version than the one installed.
    pub update_dependencies: bool,
    pub uninstall: UninstallOptions,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            allow_prerelease: false,
            dependency_version: DependencyVersion::Lowest,
            ignore_dependencies: false,
            update_dependencies: false,
            uninstall: UninstallOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Only consider versions in `[installed, next minor)`.
    pub safe: bool,
    pub update_dependencies: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            safe: false,
            update_dependencies: true,
        }
    }
}
