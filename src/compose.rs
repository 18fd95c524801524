//! Accumulation of fetched resources and recomposition of the response.
//!
//! Fetched documents are flattened into resource objects, deduplicated by
//! `(type, id)` with the first occurrence kept, and written into the original
//! document's `included` member. Every other member is left untouched and the
//! input document is never mutated.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::types::{ResourceReference, DATA, INCLUDED, RELATIONSHIPS};

/// Ordered, deduplicated collection of fetched resource objects.
///
/// Resources side-loaded in a fetched document's own `included` member are
/// kept apart: they only reach the response once a hop asks for them.
///
/// Each resource also remembers the include names it was fetched with, since
/// servers typically emit relationship linkage only for included
/// relationships. A side-loaded resource covers no include names. Refetching
/// a resource with new names merges the new linkage into a separate copy used
/// for traversal; the copy in the response stays the first one seen.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    resources: Vec<Value>,
    index: HashMap<ResourceReference, usize>,
    coverage: HashMap<ResourceReference, BTreeSet<String>>,
    linkage: HashMap<ResourceReference, Value>,
    sideloaded: HashMap<ResourceReference, Value>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the resources of a fetched document.
    ///
    /// Returns the references of resources that were new to the accumulator.
    pub fn absorb(&mut self, document: &Value) -> Vec<ResourceReference> {
        self.absorb_fetched(document, &BTreeSet::new())
    }

    /// Add the resources of a document fetched with `include`.
    ///
    /// Returns the references of resources that were new to the accumulator.
    pub fn absorb_fetched(
        &mut self,
        document: &Value,
        include: &BTreeSet<String>,
    ) -> Vec<ResourceReference> {
        let mut added = Vec::new();
        for resource in members(document, DATA) {
            let Some(reference) = ResourceReference::from_value(resource) else {
                continue;
            };
            if self.index.contains_key(&reference) {
                self.refresh(&reference, resource, include);
            } else if let Some(reference) = self.insert_covered(resource.clone(), include.clone()) {
                added.push(reference);
            }
        }
        for resource in members(document, INCLUDED) {
            if let Some(reference) = ResourceReference::from_value(resource) {
                if !self.index.contains_key(&reference) {
                    self.sideloaded
                        .entry(reference)
                        .or_insert_with(|| resource.clone());
                }
            }
        }
        added
    }

    /// Append `resource` unless its `(type, id)` is already present.
    ///
    /// Resources without a usable identity are dropped.
    pub fn insert(&mut self, resource: Value) -> Option<ResourceReference> {
        self.insert_covered(resource, BTreeSet::new())
    }

    fn insert_covered(
        &mut self,
        resource: Value,
        include: BTreeSet<String>,
    ) -> Option<ResourceReference> {
        let reference = ResourceReference::from_value(&resource)?;
        if self.index.contains_key(&reference) {
            return None;
        }
        self.sideloaded.remove(&reference);
        self.coverage.insert(reference.clone(), include);
        self.index.insert(reference.clone(), self.resources.len());
        self.resources.push(resource);
        Some(reference)
    }

    /// Merge linkage of a refetched copy when it covers new include names.
    fn refresh(
        &mut self,
        reference: &ResourceReference,
        resource: &Value,
        include: &BTreeSet<String>,
    ) {
        let covered = self.coverage.entry(reference.clone()).or_default();
        if include.is_subset(covered) {
            return;
        }
        covered.extend(include.iter().cloned());
        if !self.linkage.contains_key(reference) {
            let Some(&position) = self.index.get(reference) else {
                return;
            };
            let first = self.resources[position].clone();
            self.linkage.insert(reference.clone(), first);
        }
        if let Some(stored) = self.linkage.get_mut(reference) {
            merge_relationships(stored, resource);
        }
    }

    /// Whether `reference` has been resolved or side-loaded already.
    pub fn contains(&self, reference: &ResourceReference) -> bool {
        self.index.contains_key(reference) || self.sideloaded.contains_key(reference)
    }

    /// Whether `reference` is held with linkage for every name in `include`.
    ///
    /// Side-loaded resources only cover an empty include set.
    pub fn covers(&self, reference: &ResourceReference, include: &BTreeSet<String>) -> bool {
        match self.coverage.get(reference) {
            Some(covered) => include.is_subset(covered),
            None => self.sideloaded.contains_key(reference) && include.is_empty(),
        }
    }

    /// The resolved resource for `reference`, promoting a side-loaded copy.
    ///
    /// Returns the copy carrying the most linkage seen so far.
    pub fn resolve(&mut self, reference: &ResourceReference) -> Option<&Value> {
        if let Some(resource) = self.sideloaded.remove(reference) {
            self.insert(resource);
        }
        self.linkage
            .get(reference)
            .or_else(|| self.index.get(reference).map(|&i| &self.resources[i]))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[Value] {
        &self.resources
    }

    pub fn into_resources(self) -> Vec<Value> {
        self.resources
    }
}

/// Copy every relationship of `source` onto `target`, replacing same names.
fn merge_relationships(target: &mut Value, source: &Value) {
    let Some(incoming) = source.get(RELATIONSHIPS).and_then(Value::as_object) else {
        return;
    };
    let Some(target) = target.as_object_mut() else {
        return;
    };
    let relationships = target
        .entry(RELATIONSHIPS)
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(relationships) = relationships.as_object_mut() {
        for (name, relationship) in incoming {
            relationships.insert(name.clone(), relationship.clone());
        }
    }
}

/// Merge every fetched document into `original`'s `included` member.
///
/// Returns `original` unchanged when the documents hold no resources.
pub fn compose(original: &Value, documents: &[Value]) -> Value {
    let mut accumulator = Accumulator::new();
    for document in documents {
        accumulator.absorb(document);
    }
    with_included(original, accumulator.into_resources())
}

/// Return a copy of `original` whose `included` member is exactly `resources`.
///
/// An empty list leaves the copy identical to `original`.
pub fn with_included(original: &Value, resources: Vec<Value>) -> Value {
    if resources.is_empty() {
        return original.clone();
    }
    let mut composed = original.clone();
    if let Some(obj) = composed.as_object_mut() {
        obj.insert(INCLUDED.to_string(), Value::Array(resources));
    }
    composed
}

/// Elements of `document[member]`, accepting a single object or an array.
fn members<'a>(document: &'a Value, member: &str) -> Vec<&'a Value> {
    match document.get(member) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}
