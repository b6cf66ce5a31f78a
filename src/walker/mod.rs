//! Dependency walkers
//!
//! Each walker turns one requested change into an ordered list of
//! [`PackageOperation`](crate::operation::PackageOperation)s. Executing the
//! list front to back keeps the repository consistent: dependencies are
//! installed before their dependents and removed after them.
//!
//! Every walk is a depth-first traversal. Reaching a package that is still on
//! the traversal stack is reported as [`ResolveError::CircularDependency`](crate::error::ResolveError).

mod dependents;
mod install;
mod marker;
mod select;
mod sorter;
mod uninstall;
mod update;

pub use dependents::{DependentsWalker, ReverseDependencyWalker};
pub use install::{InstallSettings, InstallWalker};
pub use sorter::PackageSorter;
pub use uninstall::{UninstallSettings, UninstallWalker};
pub use update::UpdateWalker;
