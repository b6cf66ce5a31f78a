//! Version model
//!
//! This module provides the version type, version ranges and the policy used
//! to pick a dependency version among several candidates.

mod policy;
mod semantic;
mod spec;

pub use policy::DependencyVersion;
pub use semantic::{SemanticVersion, VersionParseError};
pub use spec::{VersionSpec, VersionSpecParseError};
