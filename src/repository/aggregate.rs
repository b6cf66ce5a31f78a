use std::collections::BTreeMap;
use std::sync::Arc;

use super::PackageSource;
use crate::package::{Package, PackageIdentity};

/// Several sources queried as one.
///
/// When more than one source carries the same identity, the first source
/// registered wins.
#[derive(Default)]
pub struct AggregateSource {
    sources: Vec<Arc<dyn PackageSource>>,
}

impl AggregateSource {
    pub fn new(sources: Vec<Arc<dyn PackageSource>>) -> Self {
        Self { sources }
    }

    pub fn push(&mut self, source: Arc<dyn PackageSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn merge(&self, query: impl Fn(&dyn PackageSource) -> Vec<Arc<Package>>) -> Vec<Arc<Package>> {
        let mut merged: BTreeMap<PackageIdentity, Arc<Package>> = BTreeMap::new();
        for source in &self.sources {
            for package in query(source.as_ref()) {
                merged.entry(package.identity()).or_insert(package);
            }
        }
        merged.into_values().collect()
    }
}

impl PackageSource for AggregateSource {
    fn find_packages_by_id(&self, id: &str) -> Vec<Arc<Package>> {
        self.merge(|source| source.find_packages_by_id(id))
    }

    fn get_packages(&self) -> Vec<Arc<Package>> {
        self.merge(|source| source.get_packages())
    }
}
