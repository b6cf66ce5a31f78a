//! Operation model
//!
//! Walkers produce [`PackageOperation`]s: an install or uninstall of one
//! package against a project or the shared packages folder. The resolver binds
//! each of them to the manager that will apply it, producing an [`Operation`].

mod resolved;

use std::fmt;
use std::sync::Arc;

use crate::package::{Package, PackageIdentity};

pub use resolved::{ExecutionTarget, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageAction {
    Install,
    Uninstall,
}

impl PackageAction {
    pub fn invert(self) -> Self {
        match self {
            PackageAction::Install => PackageAction::Uninstall,
            PackageAction::Uninstall => PackageAction::Install,
        }
    }
}

impl fmt::Display for PackageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageAction::Install => write!(f, "Install"),
            PackageAction::Uninstall => write!(f, "Uninstall"),
        }
    }
}

/// Where an operation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageOperationTarget {
    /// References and content inside one project
    Project,
    /// The solution-wide shared packages folder
    PackagesFolder,
}

impl fmt::Display for PackageOperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageOperationTarget::Project => write!(f, "project"),
            PackageOperationTarget::PackagesFolder => write!(f, "packages folder"),
        }
    }
}

/// An atomic install or uninstall of one package.
///
/// Two operations are equal when they carry the same package identity and the
/// same action.
#[derive(Debug, Clone)]
pub struct PackageOperation {
    pub package: Arc<Package>,
    pub action: PackageAction,
    pub target: PackageOperationTarget,
}

impl PackageOperation {
    pub fn new(package: Arc<Package>, action: PackageAction, target: PackageOperationTarget) -> Self {
        Self {
            package,
            action,
            target,
        }
    }

    pub fn install(package: Arc<Package>, target: PackageOperationTarget) -> Self {
        Self::new(package, PackageAction::Install, target)
    }

    pub fn uninstall(package: Arc<Package>, target: PackageOperationTarget) -> Self {
        Self::new(package, PackageAction::Uninstall, target)
    }

    pub fn identity(&self) -> PackageIdentity {
        self.package.identity()
    }

    /// The operation that undoes this one on the same target.
    pub fn inverse(&self) -> Self {
        Self::new(self.package.clone(), self.action.invert(), self.target)
    }

    fn cancels(&self, other: &PackageOperation) -> bool {
        self.action != other.action
            && self.target == other.target
            && self.identity() == other.identity()
    }
}

impl PartialEq for PackageOperation {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action && self.identity() == other.identity()
    }
}

impl Eq for PackageOperation {}

impl fmt::Display for PackageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.package)
    }
}

/// Drop install/uninstall pairs of the same package on the same target.
///
/// Survivors keep their relative order.
pub fn reduce(operations: Vec<PackageOperation>) -> Vec<PackageOperation> {
    let mut kept: Vec<Option<PackageOperation>> = Vec::with_capacity(operations.len());
    for operation in operations {
        let opposite = kept
            .iter()
            .rposition(|k| k.as_ref().is_some_and(|k| k.cancels(&operation)));
        match opposite {
            Some(index) => kept[index] = None,
            None => kept.push(Some(operation)),
        }
    }
    kept.into_iter().flatten().collect()
}
