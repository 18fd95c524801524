//! Compound Resolver CLI
//!
//! Command-line interface for resolving JSON:API include paths.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use compound_resolver::{
    load_document_auto, load_document_str, next_level, parse, parse_include_param, read_source,
    resolve, DirectoryResolver, DocumentMode, EndpointRegistry, EndpointResolver, ErrorStrategy,
    Headers, IncludePath, LayeredResolver, ResolverConfig, DEFAULT_HOP_LIMIT,
    DEFAULT_MAX_CONCURRENCY,
};
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(name = "compound-resolver")]
#[command(about = "Resolve JSON:API include paths into compound documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch related resources and merge them into the document's `included`
    Resolve {
        /// Document source: file path, URL (http:// or https://), or - for stdin
        document: String,

        /// Comma-separated include paths (e.g. citizenships.currencies,owner)
        #[arg(long, short, default_value = "")]
        include: String,

        /// Treat the document as a relationship document of this relationship
        #[arg(long)]
        relationship: Option<String>,

        /// Collection endpoint for a type: TYPE=URL (repeatable)
        #[arg(long = "endpoint", value_name = "TYPE=URL")]
        endpoints: Vec<String>,

        /// Directory of <type>.json fixture documents to serve resources from
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Header forwarded to every fetch: NAME:VALUE (repeatable)
        #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Maximum number of hops
        #[arg(long, env = "COMPOUND_RESOLVER_HOP_LIMIT", default_value_t = DEFAULT_HOP_LIMIT)]
        hop_limit: u32,

        /// What to do when a fetch fails
        #[arg(long, value_enum, default_value_t = OnError::Fail)]
        on_error: OnError,

        /// Per-type fetches in flight at once (1 = sequential)
        #[arg(long, env = "COMPOUND_RESOLVER_CONCURRENCY", default_value_t = DEFAULT_MAX_CONCURRENCY)]
        concurrency: usize,

        /// Per-fetch timeout in milliseconds
        #[arg(long, env = "COMPOUND_RESOLVER_TIMEOUT_MS", default_value_t = 30_000)]
        timeout_ms: u64,

        /// Refetch resources already resolved in an earlier hop
        #[arg(long)]
        no_memoize: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show which relationships each hop expands for a set of include paths
    Plan {
        /// Comma-separated include paths
        #[arg(long, short)]
        include: String,

        /// Only show this hop (1-based)
        #[arg(long)]
        hop: Option<usize>,
    },

    /// Show the resource linkage found in a document
    Links {
        /// Document source: file path, URL, or - for stdin
        document: String,

        /// Treat the document as a relationship document of this relationship
        #[arg(long)]
        relationship: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OnError {
    Fail,
    Ignore,
}

impl From<OnError> for ErrorStrategy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Fail => ErrorStrategy::Fail,
            OnError::Ignore => ErrorStrategy::Ignore,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            document,
            include,
            relationship,
            endpoints,
            fixtures,
            headers,
            hop_limit,
            on_error,
            concurrency,
            timeout_ms,
            no_memoize,
            output,
            pretty,
        } => {
            run_resolve(ResolveArgs {
                document,
                include,
                relationship,
                endpoints,
                fixtures,
                headers,
                hop_limit,
                on_error,
                concurrency,
                timeout_ms,
                no_memoize,
                output,
                pretty,
            })
            .await
        }

        Commands::Plan { include, hop } => run_plan(&include, hop),

        Commands::Links {
            document,
            relationship,
        } => run_links(&document, relationship).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct ResolveArgs {
    document: String,
    include: String,
    relationship: Option<String>,
    endpoints: Vec<String>,
    fixtures: Option<PathBuf>,
    headers: Vec<String>,
    hop_limit: u32,
    on_error: OnError,
    concurrency: usize,
    timeout_ms: u64,
    no_memoize: bool,
    output: Option<PathBuf>,
    pretty: bool,
}

/// Resolve and print the composed document.
///
/// When nothing was added the input text is echoed as read, unless `--pretty`
/// asks for reformatting.
async fn run_resolve(args: ResolveArgs) -> Result<(), u8> {
    let report = |e: compound_resolver::ResolveError| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    };
    let raw = read_source(&args.document).await.map_err(report)?;
    let document = load_document_str(&raw).map_err(report)?;

    let headers = parse_headers(&args.headers)?;
    let endpoints = build_endpoints(&args.endpoints, args.fixtures)?;
    let config = ResolverConfig::new(endpoints)
        .with_hop_limit(args.hop_limit)
        .with_error_strategy(args.on_error.into())
        .with_max_concurrency(args.concurrency)
        .with_fetch_timeout(Duration::from_millis(args.timeout_ms))
        .with_memoize(!args.no_memoize);

    let includes = parse_include_param(&args.include);
    let mode = document_mode(args.relationship);

    let resolution = resolve(&document, &mode, &includes, &headers, &config)
        .await
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    info!(
        hops = resolution.hops,
        fetch_rounds = resolution.fetch_rounds,
        "Resolution complete"
    );

    if resolution.document == document && !args.pretty {
        return write_text(raw.trim_end(), args.output);
    }
    write_json(&resolution.document, args.pretty, args.output)
}

fn run_plan(include: &str, hop: Option<usize>) -> Result<(), u8> {
    let includes = parse_include_param(include);
    let output = match hop {
        Some(hop) => serde_json::to_value(next_level(&includes, hop)),
        None => serde_json::to_value(all_hops(&includes)),
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    write_json(&output, true, None)
}

async fn run_links(source: &str, relationship: Option<String>) -> Result<(), u8> {
    let document = load_document_auto(source).await.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let links = parse(&document, &document_mode(relationship)).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let output = serde_json::to_value(&links).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    write_json(&output, true, None)
}

/// Plans for every hop until no path reaches further.
fn all_hops(includes: &BTreeSet<IncludePath>) -> Vec<Value> {
    (1..)
        .map(|hop| next_level(includes, hop))
        .take_while(|plan| !plan.is_empty())
        .map(|plan| serde_json::json!(plan))
        .collect()
}

fn document_mode(relationship: Option<String>) -> DocumentMode {
    match relationship {
        Some(name) => DocumentMode::Relationship(name),
        None => DocumentMode::PrimaryResource,
    }
}

/// Parse `NAME:VALUE` header arguments.
fn parse_headers(raw: &[String]) -> Result<Headers, u8> {
    let mut headers = Headers::new();
    for entry in raw {
        let Some((name, value)) = entry.split_once(':') else {
            eprintln!("Error: invalid header '{}': expected NAME:VALUE", entry);
            return Err(2);
        };
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }
    Ok(headers)
}

/// Combine `TYPE=URL` endpoints with an optional fixture directory.
///
/// Explicit endpoints win over fixtures.
fn build_endpoints(
    raw: &[String],
    fixtures: Option<PathBuf>,
) -> Result<Arc<dyn EndpointResolver>, u8> {
    let mut registry = EndpointRegistry::new();
    for entry in raw {
        let Some((resource_type, url)) = entry.split_once('=') else {
            eprintln!("Error: invalid endpoint '{}': expected TYPE=URL", entry);
            return Err(2);
        };
        registry.insert(resource_type.trim(), http_endpoint(url.trim())?);
    }

    let registry: Arc<dyn EndpointResolver> = Arc::new(registry);
    Ok(match fixtures {
        Some(dir) => Arc::new(LayeredResolver::new(
            registry,
            Arc::new(DirectoryResolver::new(dir)),
        )),
        None => registry,
    })
}

#[cfg(feature = "remote")]
fn http_endpoint(url: &str) -> Result<Arc<dyn compound_resolver::Endpoint>, u8> {
    compound_resolver::HttpEndpoint::new(url)
        .map(|endpoint| Arc::new(endpoint) as Arc<dyn compound_resolver::Endpoint>)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })
}

#[cfg(not(feature = "remote"))]
fn http_endpoint(url: &str) -> Result<Arc<dyn compound_resolver::Endpoint>, u8> {
    eprintln!(
        "Error: endpoint {} requires the 'remote' feature",
        url
    );
    Err(2)
}

fn write_json(value: &Value, pretty: bool, output: Option<PathBuf>) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    write_text(&json_output, output)
}

fn write_text(text: &str, output: Option<PathBuf>) -> Result<(), u8> {
    match output {
        Some(path) => {
            std::fs::write(&path, text).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", text);
        }
    }

    Ok(())
}
