//! Linkage extraction from wire documents.
//!
//! Walks a primary resource document (or a relationship document) and records
//! every well-formed resource identifier it finds, keyed by the relationship
//! name that referenced it. Malformed identifiers are skipped, never fatal.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::error::ResolveError;
use crate::types::{json_type_name, DocumentMode, ResourceReference, DATA, RELATIONSHIPS};

/// Linkage discovered in one hop: relationship name -> type -> ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HopResult {
    links: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl HopResult {
    /// Record that `relationship` referenced `reference`.
    pub fn record(&mut self, relationship: &str, reference: ResourceReference) {
        self.links
            .entry(relationship.to_string())
            .or_default()
            .entry(reference.resource_type)
            .or_default()
            .insert(reference.id);
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Ids referenced per resource type, deduplicated across relationships.
    pub fn references_by_type(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut by_type: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for types in self.links.values() {
            for (resource_type, ids) in types {
                by_type
                    .entry(resource_type.clone())
                    .or_default()
                    .extend(ids.iter().cloned());
            }
        }
        by_type
    }

    /// Relationship names that referenced each resource type.
    pub fn relationship_names_by_type(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut by_type: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (relationship, types) in &self.links {
            for resource_type in types.keys() {
                by_type
                    .entry(resource_type.clone())
                    .or_default()
                    .insert(relationship.clone());
            }
        }
        by_type
    }

    /// Relationship names that referenced each `(type, id)` pair.
    pub fn relationship_names_by_reference(
        &self,
    ) -> BTreeMap<ResourceReference, BTreeSet<String>> {
        let mut by_reference: BTreeMap<ResourceReference, BTreeSet<String>> = BTreeMap::new();
        for (relationship, types) in &self.links {
            for (resource_type, ids) in types {
                for id in ids {
                    by_reference
                        .entry(ResourceReference::new(resource_type.clone(), id.clone()))
                        .or_default()
                        .insert(relationship.clone());
                }
            }
        }
        by_reference
    }

    /// Every referenced `(type, id)` pair.
    pub fn references(&self) -> BTreeSet<ResourceReference> {
        self.references_by_type()
            .into_iter()
            .flat_map(|(resource_type, ids)| {
                ids.into_iter()
                    .map(move |id| ResourceReference::new(resource_type.clone(), id))
            })
            .collect()
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: HopResult) {
        for (relationship, types) in other.links {
            let entry = self.links.entry(relationship).or_default();
            for (resource_type, ids) in types {
                entry.entry(resource_type).or_default().extend(ids);
            }
        }
    }

    /// Keep only linkage recorded under the given relationship names.
    pub fn restrict_to<'a, I>(&self, relationships: I) -> HopResult
    where
        I: IntoIterator<Item = &'a String>,
    {
        let links = relationships
            .into_iter()
            .filter_map(|name| self.links.get(name).map(|t| (name.clone(), t.clone())))
            .collect();
        HopResult { links }
    }

    /// Drop every reference matching `skip`, pruning emptied entries.
    pub fn without<F>(&self, skip: F) -> HopResult
    where
        F: Fn(&ResourceReference) -> bool,
    {
        let mut result = HopResult::default();
        for (relationship, types) in &self.links {
            for (resource_type, ids) in types {
                for id in ids {
                    let reference = ResourceReference::new(resource_type.clone(), id.clone());
                    if !skip(&reference) {
                        result.record(relationship, reference);
                    }
                }
            }
        }
        result
    }
}

impl Serialize for HopResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct View {
            references_by_type: BTreeMap<String, BTreeSet<String>>,
            relationship_names_by_type: BTreeMap<String, BTreeSet<String>>,
        }

        View {
            references_by_type: self.references_by_type(),
            relationship_names_by_type: self.relationship_names_by_type(),
        }
        .serialize(serializer)
    }
}

/// Extract linkage from a document.
///
/// # Errors
///
/// Returns `ResolveError::InvalidDocument` if the document is not an object,
/// has no `data` member, or `data` is neither an object, an array, nor null.
pub fn parse(document: &Value, mode: &DocumentMode) -> Result<HopResult, ResolveError> {
    let mut result = HopResult::default();
    for element in primary_data(document)? {
        match mode {
            DocumentMode::PrimaryResource => record_relationships(element, &mut result),
            DocumentMode::Relationship(name) => {
                if let Some(reference) = ResourceReference::from_value(element) {
                    result.record(name, reference);
                }
            }
        }
    }
    Ok(result)
}

/// Extract linkage from a serialized document.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the text isn't valid JSON, otherwise
/// the same errors as [`parse`].
pub fn parse_str(content: &str, mode: &DocumentMode) -> Result<HopResult, ResolveError> {
    let document: Value =
        serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson { source })?;
    parse(&document, mode)
}

/// Extract linkage from the relationships of standalone resource objects.
pub fn parse_resources<'a, I>(resources: I) -> HopResult
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut result = HopResult::default();
    for resource in resources {
        record_relationships(resource, &mut result);
    }
    result
}

/// Elements of the top-level `data` member, normalized to a list.
pub(crate) fn primary_data(document: &Value) -> Result<Vec<&Value>, ResolveError> {
    let obj = document.as_object().ok_or_else(|| {
        ResolveError::invalid_document(format!(
            "expected object, got {}",
            json_type_name(document)
        ))
    })?;

    match obj.get(DATA) {
        None => Err(ResolveError::invalid_document("missing 'data' member")),
        Some(Value::Null) => Ok(Vec::new()),
        Some(data @ Value::Object(_)) => Ok(vec![data]),
        Some(Value::Array(items)) => Ok(items.iter().collect()),
        Some(other) => Err(ResolveError::invalid_document(format!(
            "'data' must be an object or array, got {}",
            json_type_name(other)
        ))),
    }
}

fn record_relationships(resource: &Value, result: &mut HopResult) {
    let Some(relationships) = resource.get(RELATIONSHIPS).and_then(Value::as_object) else {
        return;
    };

    for (name, relationship) in relationships {
        match relationship.get(DATA) {
            Some(Value::Array(identifiers)) => {
                for identifier in identifiers {
                    if let Some(reference) = ResourceReference::from_value(identifier) {
                        result.record(name, reference);
                    }
                }
            }
            Some(identifier @ Value::Object(_)) => {
                if let Some(reference) = ResourceReference::from_value(identifier) {
                    result.record(name, reference);
                }
            }
            // null linkage or links-only relationship
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn user_document() -> Value {
        json!({
            "data": {
                "type": "users",
                "id": "1",
                "relationships": {
                    "citizenships": {
                        "data": [
                            { "type": "countries", "id": "TG" },
                            { "type": "countries", "id": "BJ" }
                        ]
                    },
                    "birthplace": { "data": { "type": "countries", "id": "TG" } },
                    "employer": { "data": null },
                    "friends": { "links": { "related": "/users/1/friends" } }
                }
            }
        })
    }

    #[test]
    fn primary_document_records_references_and_names() {
        let result = parse(&user_document(), &DocumentMode::PrimaryResource).unwrap();

        let by_type = result.references_by_type();
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type["countries"], ids(&["BJ", "TG"]));

        let names = result.relationship_names_by_type();
        assert_eq!(names["countries"], ids(&["birthplace", "citizenships"]));
    }

    #[test]
    fn array_data_is_walked() {
        let document = json!({
            "data": [
                {
                    "type": "countries", "id": "TG",
                    "relationships": { "currencies": { "data": [{ "type": "currencies", "id": "XOF" }] } }
                },
                {
                    "type": "countries", "id": "GH",
                    "relationships": { "currencies": { "data": [{ "type": "currencies", "id": "GHS" }] } }
                }
            ]
        });
        let result = parse(&document, &DocumentMode::PrimaryResource).unwrap();
        assert_eq!(result.references_by_type()["currencies"], ids(&["GHS", "XOF"]));
    }

    #[test]
    fn malformed_identifiers_are_skipped() {
        let document = json!({
            "data": {
                "type": "users", "id": "1",
                "relationships": {
                    "citizenships": {
                        "data": [
                            { "type": "countries" },
                            { "id": "XX" },
                            { "type": "countries", "id": 12 },
                            "TG",
                            { "type": "countries", "id": "GH" }
                        ]
                    }
                }
            }
        });
        let result = parse(&document, &DocumentMode::PrimaryResource).unwrap();
        assert_eq!(result.references(), BTreeSet::from([ResourceReference::new("countries", "GH")]));
    }

    #[test]
    fn relationship_mode_treats_data_as_identifiers() {
        let document = json!({
            "data": [
                { "type": "countries", "id": "TG" },
                { "type": "countries" }
            ]
        });
        let mode = DocumentMode::Relationship("citizenships".into());
        let result = parse(&document, &mode).unwrap();

        assert_eq!(result.references_by_type()["countries"], ids(&["TG"]));
        assert_eq!(result.relationship_names_by_type()["countries"], ids(&["citizenships"]));
    }

    #[test]
    fn missing_data_is_invalid() {
        let result = parse(&json!({ "meta": {} }), &DocumentMode::PrimaryResource);
        assert!(matches!(result, Err(ResolveError::InvalidDocument { .. })));

        let result = parse(&json!([1, 2]), &DocumentMode::PrimaryResource);
        assert!(matches!(result, Err(ResolveError::InvalidDocument { .. })));

        let result = parse(&json!({ "data": "users" }), &DocumentMode::PrimaryResource);
        assert!(matches!(result, Err(ResolveError::InvalidDocument { .. })));
    }

    #[test]
    fn null_data_yields_nothing() {
        let result = parse(&json!({ "data": null }), &DocumentMode::PrimaryResource).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn unparsable_text_is_invalid_json() {
        let result = parse_str("{ not json", &DocumentMode::PrimaryResource);
        assert!(matches!(result, Err(ResolveError::InvalidJson { .. })));
    }

    #[test]
    fn parsing_is_repeatable() {
        let document = user_document();
        let first = parse(&document, &DocumentMode::PrimaryResource).unwrap();
        let second = parse(&document, &DocumentMode::PrimaryResource).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn restrict_and_without() {
        let result = parse(&user_document(), &DocumentMode::PrimaryResource).unwrap();

        let restricted = result.restrict_to([&"birthplace".to_string()]);
        assert_eq!(restricted.references_by_type()["countries"], ids(&["TG"]));

        let pruned = result.without(|r| r.id == "TG");
        assert_eq!(pruned.references_by_type()["countries"], ids(&["BJ"]));
        assert_eq!(pruned.relationship_names_by_type()["countries"], ids(&["citizenships"]));

        let emptied = result.without(|_| true);
        assert!(emptied.is_empty());
    }

    #[test]
    fn serializes_both_views() {
        let result = parse(&user_document(), &DocumentMode::PrimaryResource).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["referencesByType"]["countries"], json!(["BJ", "TG"]));
        assert_eq!(
            value["relationshipNamesByType"]["countries"],
            json!(["birthplace", "citizenships"])
        );
    }
}
