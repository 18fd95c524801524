//! Hop-by-hop resolution of include paths.
//!
//! The original document is parsed once, then each hop plans the relationships
//! to expand, fetches the referenced resources per type, and re-parses what came
//! back to discover the next hop's references. Resolution stops when no include
//! path reaches the next hop, nothing new was discovered, or the hop limit is
//! reached. Everything fetched is finally merged into `included`.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, info_span, Instrument};

use crate::compose::{with_included, Accumulator};
use crate::config::ResolverConfig;
use crate::dispatch::dispatch;
use crate::error::ResolveError;
use crate::parser::{self, parse_resources, HopResult};
use crate::planner::{forwarded_includes, next_level, HopPlan};
use crate::types::{DocumentMode, Headers, IncludePath, ResourceReference};

/// Outcome of a resolution, with traversal statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The composed document.
    pub document: Value,
    /// Hops that had references to resolve.
    pub hops: u32,
    /// Hops that issued at least one batch fetch.
    pub fetch_rounds: u32,
}

/// Resolve `includes` against a primary resource document.
///
/// # Errors
///
/// Returns `ResolveError::InvalidDocument` for a malformed input document and,
/// under the fail strategy, `ResolveError::Fetch` for the first failed fetch.
pub async fn resolve_primary(
    document: &Value,
    includes: &BTreeSet<IncludePath>,
    headers: &Headers,
    config: &ResolverConfig,
) -> Result<Value, ResolveError> {
    resolve(document, &DocumentMode::PrimaryResource, includes, headers, config)
        .await
        .map(|resolution| resolution.document)
}

/// Resolve `includes` against a relationship document of `relationship`.
///
/// The document's `data` holds identifiers; include paths start with the
/// relationship name itself (e.g. `citizenships.currencies`).
///
/// # Errors
///
/// Same as [`resolve_primary`].
pub async fn resolve_relationship(
    document: &Value,
    relationship: &str,
    includes: &BTreeSet<IncludePath>,
    headers: &Headers,
    config: &ResolverConfig,
) -> Result<Value, ResolveError> {
    let mode = DocumentMode::Relationship(relationship.to_string());
    resolve(document, &mode, includes, headers, config)
        .await
        .map(|resolution| resolution.document)
}

/// Resolve `includes` against `document` interpreted per `mode`.
///
/// # Errors
///
/// Same as [`resolve_primary`].
pub async fn resolve(
    document: &Value,
    mode: &DocumentMode,
    includes: &BTreeSet<IncludePath>,
    headers: &Headers,
    config: &ResolverConfig,
) -> Result<Resolution, ResolveError> {
    let mut pending = parser::parse(document, mode)?;
    let mut accumulator = Accumulator::new();
    let mut hops = 0;
    let mut fetch_rounds = 0;

    for hop in 1..=config.hop_limit {
        let plan = next_level(includes, hop as usize);
        if plan.is_empty() {
            debug!(hop, "No include path reaches this hop");
            break;
        }

        let targets = pending.restrict_to(plan.keys());
        if targets.is_empty() {
            debug!(hop, relationships = ?plan.keys().collect::<Vec<_>>(), "No linkage for planned relationships");
            break;
        }
        hops = hop;

        let (to_fetch, reused) = if config.memoize {
            split_resolved(&targets, &plan, &accumulator)
        } else {
            (targets, Vec::new())
        };

        let mut next = HopResult::default();
        if !to_fetch.is_empty() {
            fetch_rounds += 1;
            let fetched = dispatch(&to_fetch, &plan, headers, config)
                .instrument(info_span!("hop", hop))
                .await?;
            for fetched in &fetched {
                accumulator.absorb_fetched(&fetched.document, &fetched.include);
                next.merge(parser::parse(
                    &fetched.document,
                    &DocumentMode::PrimaryResource,
                )?);
            }
        }
        for reference in &reused {
            if let Some(resource) = accumulator.resolve(reference) {
                next.merge(parse_resources([resource]));
            }
        }

        debug!(
            hop,
            reused = reused.len(),
            accumulated = accumulator.len(),
            "Hop complete"
        );
        pending = next;
    }

    Ok(Resolution {
        document: with_included(document, accumulator.into_resources()),
        hops,
        fetch_rounds,
    })
}

/// Split targets into references still to fetch and ones already resolved.
///
/// A resolved resource is reused only if it was obtained with every include
/// name this hop forwards for it; otherwise its stored linkage may be partial.
fn split_resolved(
    targets: &HopResult,
    plan: &HopPlan,
    accumulator: &Accumulator,
) -> (HopResult, Vec<ResourceReference>) {
    let required: BTreeMap<ResourceReference, BTreeSet<String>> = targets
        .relationship_names_by_reference()
        .into_iter()
        .map(|(reference, names)| {
            let include = forwarded_includes(plan, &names);
            (reference, include)
        })
        .collect();
    let reusable = |reference: &ResourceReference| {
        required
            .get(reference)
            .is_some_and(|include| accumulator.covers(reference, include))
    };

    let to_fetch = targets.without(reusable);
    let reused = targets
        .references()
        .into_iter()
        .filter(|reference| reusable(reference))
        .collect();
    (to_fetch, reused)
}
