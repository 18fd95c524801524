//! Per-hop projection of the requested include paths.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::IncludePath;

/// Relationship names to expand at a hop, each mapped to the nested include
/// names forwarded to the next fetch. An empty value set means "expand, but
/// request nothing deeper".
pub type HopPlan = BTreeMap<String, BTreeSet<String>>;

/// Compute the relationships to expand at `hop` (1-based).
///
/// An empty plan means no path reaches this depth and resolution is done.
pub fn next_level<'a, I>(paths: I, hop: usize) -> HopPlan
where
    I: IntoIterator<Item = &'a IncludePath>,
{
    let mut plan = HopPlan::new();
    if hop == 0 {
        return plan;
    }

    for path in paths {
        let segments = path.segments();
        let Some(parent) = segments.get(hop - 1) else {
            continue;
        };
        let nested = plan.entry(parent.clone()).or_default();
        if let Some(child) = segments.get(hop) {
            nested.insert(child.clone());
        }
    }
    plan
}

/// Union of the nested include names of every planned relationship in `relationships`.
///
/// Relationship names absent from the plan contribute nothing.
pub fn forwarded_includes<'a, I>(plan: &HopPlan, relationships: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    relationships
        .into_iter()
        .filter_map(|name| plan.get(name))
        .flat_map(|nested| nested.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_include_param;

    fn names(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_hop_collects_roots_and_children() {
        let paths = parse_include_param("a,b.c,b.d");
        let plan = next_level(&paths, 1);

        assert_eq!(plan.len(), 2);
        assert!(plan["a"].is_empty());
        assert_eq!(plan["b"], names(&["c", "d"]));
    }

    #[test]
    fn second_hop_shifts_one_segment() {
        let paths = parse_include_param("citizenships.currencies.issuer,citizenships.languages");
        let plan = next_level(&paths, 2);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan["currencies"], names(&["issuer"]));
        assert!(plan["languages"].is_empty());
    }

    #[test]
    fn shallow_paths_drop_out() {
        let paths = parse_include_param("a,b.c");
        assert!(next_level(&paths, 3).is_empty());

        let plan = next_level(&paths, 2);
        assert_eq!(plan.keys().collect::<Vec<_>>(), ["c"]);
    }

    #[test]
    fn hop_zero_and_no_paths_are_empty() {
        let paths = parse_include_param("a.b");
        assert!(next_level(&paths, 0).is_empty());
        assert!(next_level(&BTreeSet::new(), 1).is_empty());
    }

    #[test]
    fn plan_is_deterministic() {
        let paths = parse_include_param("x.y,a.b,x.z");
        assert_eq!(next_level(&paths, 1), next_level(&paths, 1));
    }

    #[test]
    fn forwarded_includes_unions_planned_names() {
        let paths = parse_include_param("citizenships.currencies,birthplace.languages,owner");
        let plan = next_level(&paths, 1);

        let rels = names(&["citizenships", "birthplace", "unplanned"]);
        assert_eq!(forwarded_includes(&plan, &rels), names(&["currencies", "languages"]));

        let rels = names(&["owner"]);
        assert!(forwarded_includes(&plan, &rels).is_empty());
    }
}
