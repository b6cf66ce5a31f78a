use std::collections::HashMap;

use crate::error::ResolveError;
use crate::package::PackageIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Depth-first visit bookkeeping shared by the walkers.
///
/// Re-entering a package that is still on the stack is a cycle.
#[derive(Debug, Default)]
pub(crate) struct Marker {
    states: HashMap<PackageIdentity, VisitState>,
    stack: Vec<PackageIdentity>,
}

impl Marker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visiting(&self, identity: &PackageIdentity) -> bool {
        self.states.get(identity) == Some(&VisitState::Visiting)
    }

    pub fn is_visited(&self, identity: &PackageIdentity) -> bool {
        self.states.get(identity) == Some(&VisitState::Visited)
    }

    /// Push `identity` on the stack.
    pub fn enter(&mut self, identity: &PackageIdentity) -> Result<(), ResolveError> {
        if self.is_visiting(identity) {
            return Err(self.cycle(identity));
        }
        self.states.insert(identity.clone(), VisitState::Visiting);
        self.stack.push(identity.clone());
        Ok(())
    }

    /// Pop `identity` and mark it done.
    pub fn leave(&mut self, identity: &PackageIdentity) {
        if let Some(position) = self.stack.iter().rposition(|i| i == identity) {
            self.stack.remove(position);
        }
        self.states.insert(identity.clone(), VisitState::Visited);
    }

    /// Error naming the chain from the first occurrence of `identity` on the
    /// stack back to itself.
    pub fn cycle(&self, identity: &PackageIdentity) -> ResolveError {
        let start = self
            .stack
            .iter()
            .position(|i| i == identity)
            .unwrap_or_default();
        let chain = self.stack[start..]
            .iter()
            .chain(std::iter::once(identity))
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(" => ");
        ResolveError::CircularDependency { chain }
    }
}
