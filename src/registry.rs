//! Identifier lookup for classifiers.
//!
//! [`Registry`] is the reverse transformer's working table from schema
//! identifier to classifier slot. [`PackageIndex`] answers the same question
//! over finished packages, so a caller can re-resolve proxies after loading
//! more packages.

use std::collections::HashMap;

use crate::identifier::{classifier_id, schema_id};
use crate::model::{Classifier, ClassifierRef, Package};

/// Where a registered identifier points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Index into the owner's classifier arena.
    pub index: usize,
    /// Seeded at construction rather than read from a document.
    pub builtin: bool,
}

/// Identifier → classifier slot.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, Slot>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Slot> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registers `id`, returning the slot it replaced.
    pub fn insert(&mut self, id: impl Into<String>, slot: Slot) -> Option<Slot> {
        self.entries.insert(id.into(), slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only identifier index over a set of loaded packages.
#[derive(Debug, Default)]
pub struct PackageIndex<'a> {
    classifiers: HashMap<String, &'a Classifier>,
}

impl<'a> PackageIndex<'a> {
    pub fn new(packages: &'a [Package]) -> Self {
        let mut index = Self::default();
        for package in packages {
            index.add(package);
        }
        index
    }

    /// Indexes `package` and its sub-packages. Later packages shadow earlier
    /// ones with the same identifiers.
    pub fn add(&mut self, package: &'a Package) {
        for classifier in &package.classifiers {
            self.classifiers
                .insert(schema_id(&package.ns_uri, &classifier.name), classifier);
        }
        for sub in &package.subpackages {
            self.add(sub);
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a Classifier> {
        self.classifiers.get(id).copied()
    }

    /// Resolves a reference; proxies resolve once their package is indexed.
    pub fn resolve(&self, classifier: &ClassifierRef) -> Option<&'a Classifier> {
        classifier_id(classifier).ok().and_then(|id| self.get(&id))
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}
