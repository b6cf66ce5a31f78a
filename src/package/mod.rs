//! Package metadata
//!
//! This module provides the package identity types, dependency declarations,
//! target framework handling and the [`Package`] value consumed by the walkers.

mod dependency;
mod framework;
mod identity;
mod metadata;

pub use dependency::{PackageDependency, PackageDependencySet};
pub use framework::{FrameworkName, FrameworkParseError};
pub use identity::{PackageId, PackageIdentity};
pub use metadata::Package;
