//! Concurrent per-type batch fetching for one hop.
//!
//! Pending references are partitioned by resource type and fetched with one
//! batch call per type. Calls run concurrently up to the configured pool width;
//! results are returned in type order once every call has finished.

use std::collections::BTreeSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::{FetchError, ResolveError};
use crate::parser::{primary_data, HopResult};
use crate::planner::{forwarded_includes, HopPlan};
use crate::types::{ErrorStrategy, Headers};

/// One per-type fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub resource_type: String,
    pub ids: BTreeSet<String>,
    pub include: BTreeSet<String>,
}

/// Document returned by a successful batch fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub resource_type: String,
    /// Include names the batch was fetched with.
    pub include: BTreeSet<String>,
    pub document: Value,
}

/// Partition pending references into one batch per type.
///
/// Each batch forwards the union of nested includes planned for the
/// relationships that referenced its type.
pub fn plan_batches(pending: &HopResult, plan: &HopPlan) -> Vec<Batch> {
    let names = pending.relationship_names_by_type();
    pending
        .references_by_type()
        .into_iter()
        .map(|(resource_type, ids)| {
            let include = forwarded_includes(plan, names.get(&resource_type).into_iter().flatten());
            Batch {
                resource_type,
                ids,
                include,
            }
        })
        .collect()
}

/// Fetch every pending type and wait for all of them.
///
/// # Errors
///
/// Under [`ErrorStrategy::Fail`] the first failed fetch aborts the hop with
/// `ResolveError::Fetch`; fetches still in flight are dropped. Under
/// [`ErrorStrategy::Ignore`] failures are logged and contribute nothing.
pub async fn dispatch(
    pending: &HopResult,
    plan: &HopPlan,
    headers: &Headers,
    config: &ResolverConfig,
) -> Result<Vec<FetchedDocument>, ResolveError> {
    let batches = plan_batches(pending, plan);
    let mut results = stream::iter(batches)
        .map(|batch| async move {
            let result = fetch_batch(&batch, headers, config).await;
            (batch, result)
        })
        .buffered(config.concurrency());

    let mut fetched = Vec::new();
    while let Some((Batch { resource_type, include, .. }, result)) = results.next().await {
        match result {
            Ok(document) => fetched.push(FetchedDocument {
                resource_type,
                include,
                document,
            }),
            Err(source) => match config.error_strategy {
                ErrorStrategy::Fail => {
                    return Err(ResolveError::Fetch {
                        resource_type,
                        source,
                    })
                }
                ErrorStrategy::Ignore => {
                    warn!(
                        resource_type = %resource_type,
                        error = %source,
                        "Batch fetch failed, continuing without it"
                    );
                }
            },
        }
    }
    Ok(fetched)
}

async fn fetch_batch(
    batch: &Batch,
    headers: &Headers,
    config: &ResolverConfig,
) -> Result<Value, FetchError> {
    let endpoint = config
        .endpoints
        .endpoint_for(&batch.resource_type)
        .ok_or_else(|| FetchError::NoEndpoint {
            resource_type: batch.resource_type.clone(),
        })?;

    debug!(
        resource_type = %batch.resource_type,
        ids = ?batch.ids,
        include = ?batch.include,
        "Dispatching batch fetch"
    );

    let document = timeout(
        config.fetch_timeout,
        endpoint.batch_fetch(&batch.ids, &batch.include, headers),
    )
    .await
    .map_err(|_| FetchError::Timeout {
        timeout_ms: millis(config.fetch_timeout),
    })??;

    primary_data(&document).map_err(|e| FetchError::MalformedResponse {
        message: e.to_string(),
    })?;
    Ok(document)
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
