//! Compound Document Resolver
//!
//! Resolves JSON:API `include` paths into compound documents.
//!
//! Given a response document and the client's include paths, the resolver
//! follows relationship linkage hop by hop, batch-fetches the referenced
//! resources from per-type endpoints, and merges everything into the
//! document's `included` member.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use compound_resolver::{
//!     parse_include_param, resolve_primary, EndpointRegistry, Headers, MemoryEndpoint,
//!     ResolverConfig,
//! };
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let currencies = MemoryEndpoint::new(vec![json!({
//!     "type": "currencies",
//!     "id": "XOF",
//!     "attributes": { "name": "West African CFA franc" }
//! })]);
//! let registry = EndpointRegistry::new().register("currencies", Arc::new(currencies));
//! let config = ResolverConfig::new(Arc::new(registry));
//!
//! let document = json!({
//!     "data": {
//!         "type": "countries",
//!         "id": "TG",
//!         "relationships": {
//!             "currencies": { "data": [{ "type": "currencies", "id": "XOF" }] }
//!         }
//!     }
//! });
//!
//! let includes = parse_include_param("currencies");
//! let resolved = resolve_primary(&document, &includes, &Headers::new(), &config)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(resolved["included"][0]["id"], "XOF");
//! # }
//! ```
//!
//! # Error Strategies
//!
//! | Strategy | Effect of a failed batch fetch |
//! |----------|--------------------------------|
//! | `Fail` | Resolution aborts with `ResolveError::Fetch` |
//! | `Ignore` | The failed type contributes nothing; resolution continues |
//!
//! Under `Ignore` the returned `included` may be incomplete and no error is
//! surfaced. Resources resolved in earlier hops are kept.

mod compose;
mod config;
mod dispatch;
mod endpoint;
mod error;
mod loader;
mod parser;
mod planner;
mod resolver;
mod types;

pub use compose::{compose, with_included, Accumulator};
pub use config::{
    ResolverConfig, DEFAULT_FETCH_TIMEOUT, DEFAULT_HOP_LIMIT, DEFAULT_MAX_CONCURRENCY,
};
pub use dispatch::{dispatch, plan_batches, Batch, FetchedDocument};
pub use endpoint::{
    DirectoryEndpoint, DirectoryResolver, Endpoint, EndpointRegistry, EndpointResolver,
    LayeredResolver, MemoryEndpoint, JSON_API_MEDIA_TYPE,
};
pub use error::{FetchError, ResolveError};
pub use loader::{
    is_url, load_document, load_document_auto, load_document_str, read_source, STDIN_SOURCE,
};
pub use parser::{parse, parse_resources, parse_str, HopResult};
pub use planner::{forwarded_includes, next_level, HopPlan};
pub use resolver::{resolve, resolve_primary, resolve_relationship, Resolution};
pub use types::{
    parse_include_param, DocumentMode, ErrorStrategy, Headers, IncludePath, ResourceReference,
};

#[cfg(feature = "remote")]
pub use endpoint::HttpEndpoint;
#[cfg(feature = "remote")]
pub use loader::load_document_url;
