//! Per-type batch-fetch endpoints.
//!
//! The resolver only needs a way to fetch many resources of one type by id.
//! [`EndpointRegistry`] maps types to endpoints; [`DirectoryEndpoint`] serves
//! local fixture files and, with the `remote` feature, [`HttpEndpoint`] issues
//! JSON:API collection requests.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::FetchError;
use crate::parser::primary_data;
use crate::types::{Headers, ResourceReference, DATA};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON:API media type sent as `Accept` unless the caller overrides it.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Batch-fetch capability for a single resource type.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Fetch every resource in `ids`, asking the source to side-load `include`.
    ///
    /// Returns a document whose `data` member holds the fetched resources.
    async fn batch_fetch(
        &self,
        ids: &BTreeSet<String>,
        include: &BTreeSet<String>,
        headers: &Headers,
    ) -> Result<Value, FetchError>;
}

/// Lookup of the endpoint serving a resource type.
pub trait EndpointResolver: Send + Sync {
    fn endpoint_for(&self, resource_type: &str) -> Option<Arc<dyn Endpoint>>;
}

/// Fixed `type -> endpoint` table.
#[derive(Default, Clone)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Arc<dyn Endpoint>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint` for `resource_type`, replacing any previous entry.
    pub fn register(mut self, resource_type: impl Into<String>, endpoint: Arc<dyn Endpoint>) -> Self {
        self.endpoints.insert(resource_type.into(), endpoint);
        self
    }

    pub fn insert(&mut self, resource_type: impl Into<String>, endpoint: Arc<dyn Endpoint>) {
        self.endpoints.insert(resource_type.into(), endpoint);
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.endpoints.keys().collect();
        types.sort();
        f.debug_struct("EndpointRegistry")
            .field("types", &types)
            .finish()
    }
}

impl EndpointResolver for EndpointRegistry {
    fn endpoint_for(&self, resource_type: &str) -> Option<Arc<dyn Endpoint>> {
        self.endpoints.get(resource_type).cloned()
    }
}

/// Resolver that tries `primary` first and falls back to `fallback`.
pub struct LayeredResolver {
    primary: Arc<dyn EndpointResolver>,
    fallback: Arc<dyn EndpointResolver>,
}

impl LayeredResolver {
    pub fn new(primary: Arc<dyn EndpointResolver>, fallback: Arc<dyn EndpointResolver>) -> Self {
        Self { primary, fallback }
    }
}

impl EndpointResolver for LayeredResolver {
    fn endpoint_for(&self, resource_type: &str) -> Option<Arc<dyn Endpoint>> {
        self.primary
            .endpoint_for(resource_type)
            .or_else(|| self.fallback.endpoint_for(resource_type))
    }
}

/// Serves a fixed, in-memory list of resource objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryEndpoint {
    resources: Vec<Value>,
}

impl MemoryEndpoint {
    pub fn new(resources: Vec<Value>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl Endpoint for MemoryEndpoint {
    async fn batch_fetch(
        &self,
        ids: &BTreeSet<String>,
        _include: &BTreeSet<String>,
        _headers: &Headers,
    ) -> Result<Value, FetchError> {
        Ok(select(self.resources.iter(), ids))
    }
}

/// Document whose `data` holds the resources matching `ids`, in source order.
fn select<'a, I>(resources: I, ids: &BTreeSet<String>) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    let matching: Vec<Value> = resources
        .into_iter()
        .filter(|resource| {
            ResourceReference::from_value(resource).is_some_and(|r| ids.contains(&r.id))
        })
        .cloned()
        .collect();

    let mut document = Map::new();
    document.insert(DATA.to_string(), Value::Array(matching));
    Value::Object(document)
}

/// Serves resources from `<dir>/<type>.json` fixture documents.
///
/// Each fixture is a document whose `data` lists every resource of that type;
/// a batch fetch returns the subset matching the requested ids. Fixtures carry
/// their full linkage, so the include set is not consulted.
#[derive(Debug, Clone)]
pub struct DirectoryEndpoint {
    path: PathBuf,
}

impl DirectoryEndpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Endpoint for DirectoryEndpoint {
    async fn batch_fetch(
        &self,
        ids: &BTreeSet<String>,
        _include: &BTreeSet<String>,
        _headers: &Headers,
    ) -> Result<Value, FetchError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::Source {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        let fixture: Value = serde_json::from_str(&content).map_err(|e| FetchError::Source {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let resources = primary_data(&fixture).map_err(|e| FetchError::Source {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        Ok(select(resources, ids))
    }
}

/// Resolver mapping every type to `<dir>/<type>.json` when that file exists.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    dir: PathBuf,
}

impl DirectoryResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl EndpointResolver for DirectoryResolver {
    fn endpoint_for(&self, resource_type: &str) -> Option<Arc<dyn Endpoint>> {
        // types name files; refuse anything that could escape the directory
        if resource_type.contains(|c| c == '/' || c == '\\') || resource_type.starts_with('.') {
            return None;
        }
        let path = self.dir.join(format!("{}.json", resource_type));
        if !path.is_file() {
            return None;
        }
        Some(Arc::new(DirectoryEndpoint::new(path)))
    }
}

/// JSON:API collection endpoint over HTTP.
///
/// A batch fetch issues
/// `GET {collection_url}?filter[id]=a,b&include=x,y`, omitting `include`
/// when nothing is forwarded.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    collection_url: String,
}

#[cfg(feature = "remote")]
impl HttpEndpoint {
    /// Create an endpoint for `collection_url` with the default client.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` if the HTTP client cannot be built.
    pub fn new(collection_url: impl Into<String>) -> Result<Self, FetchError> {
        let collection_url = collection_url.into();
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|source| FetchError::Network {
                url: collection_url.clone(),
                source,
            })?;
        Ok(Self::with_client(client, collection_url))
    }

    /// Create an endpoint sharing an existing client.
    pub fn with_client(client: reqwest::Client, collection_url: impl Into<String>) -> Self {
        Self {
            client,
            collection_url: collection_url.into(),
        }
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn query(ids: &BTreeSet<String>, include: &BTreeSet<String>) -> Vec<(&'static str, String)> {
        let mut query = vec![("filter[id]", join(ids))];
        if !include.is_empty() {
            query.push(("include", join(include)));
        }
        query
    }
}

#[cfg(feature = "remote")]
fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(feature = "remote")]
#[async_trait]
impl Endpoint for HttpEndpoint {
    async fn batch_fetch(
        &self,
        ids: &BTreeSet<String>,
        include: &BTreeSet<String>,
        headers: &Headers,
    ) -> Result<Value, FetchError> {
        let mut request = self
            .client
            .get(&self.collection_url)
            .query(&Self::query(ids, include));

        if !headers.keys().any(|k| k.eq_ignore_ascii_case("accept")) {
            request = request.header(reqwest::header::ACCEPT, JSON_API_MEDIA_TYPE);
        }
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|source| FetchError::Network {
            url: self.collection_url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.collection_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Network {
            url: self.collection_url.clone(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| FetchError::MalformedResponse {
            message: format!("{}: {}", self.collection_url, e),
        })
    }
}
