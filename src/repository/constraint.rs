use std::collections::HashMap;

use crate::package::PackageId;
use crate::version::VersionSpec;

/// Supplies the allowed version range pinned for a package id.
#[cfg_attr(test, mockall::automock)]
pub trait ConstraintProvider: Send + Sync {
    fn get_constraint(&self, id: &str) -> Option<VersionSpec>;
}

/// No package is constrained.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConstraintProvider;

impl ConstraintProvider for NullConstraintProvider {
    fn get_constraint(&self, _id: &str) -> Option<VersionSpec> {
        None
    }
}

/// Constraints held in a map keyed by case-insensitive id.
#[derive(Debug, Clone, Default)]
pub struct DefaultConstraintProvider {
    constraints: HashMap<PackageId, VersionSpec>,
}

impl DefaultConstraintProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `id` to `spec`, replacing any earlier pin.
    pub fn add_constraint(&mut self, id: impl Into<String>, spec: VersionSpec) {
        self.constraints.insert(PackageId::new(id), spec);
    }

    pub fn remove_constraint(&mut self, id: &str) -> Option<VersionSpec> {
        self.constraints.remove(&PackageId::from(id))
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl ConstraintProvider for DefaultConstraintProvider {
    fn get_constraint(&self, id: &str) -> Option<VersionSpec> {
        self.constraints.get(&PackageId::from(id)).cloned()
    }
}
