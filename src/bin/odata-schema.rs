//! OData Schema CLI
//!
//! Command-line interface for deriving flat schemas from OData metadata.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use odata_schema::{
    source_auto, ContextUri, MetadataSource, ResolveOptions, ResolvedSchema, SchemaPipeline,
    DEFAULT_API_VERSION, DEFAULT_MAX_DEPTH, MIN_MAX_DEPTH,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "odata-schema")]
#[command(about = "Derive flat schemas from OData metadata documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Metadata source: directory holding <version>/metadata.json, or URL
    /// template containing {version} (http:// or https://)
    #[arg(long, short)]
    metadata: String,

    /// API version (default: taken from the context URI, then v1.0)
    #[arg(long)]
    api_version: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the flat schema for one @odata.context URI
    Resolve {
        /// Context URI, e.g. https://graph.microsoft.com/v1.0/$metadata#users
        context: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Derived type whose properties are merged over the base type
        #[arg(long)]
        subtype: Option<String>,

        /// Nested property levels to expand before truncating
        #[arg(
            long,
            default_value_t = DEFAULT_MAX_DEPTH,
            value_parser = RangedU64ValueParser::<usize>::new().range(MIN_MAX_DEPTH as u64..)
        )]
        max_depth: usize,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Resolve several contexts and write each to <out-dir>/<version>/<name>.json
    Dump {
        /// Context URIs to resolve
        #[arg(required = true)]
        contexts: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Nested property levels to expand before truncating
        #[arg(
            long,
            default_value_t = DEFAULT_MAX_DEPTH,
            value_parser = RangedU64ValueParser::<usize>::new().range(MIN_MAX_DEPTH as u64..)
        )]
        max_depth: usize,

        /// Directory to write schemas into
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// List the context variants of a metadata document
    Contexts {
        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            context,
            source,
            subtype,
            max_depth,
            output,
            pretty,
        } => run_resolve(&context, &source, subtype, max_depth, output, pretty),

        Commands::Dump {
            contexts,
            source,
            max_depth,
            out_dir,
        } => run_dump(&contexts, &source, max_depth, &out_dir),

        Commands::Contexts { source, json } => run_contexts(&source, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn open_pipeline(source: &SourceArgs) -> Result<SchemaPipeline<Box<dyn MetadataSource>>, u8> {
    let metadata = source_auto(&source.metadata).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    Ok(SchemaPipeline::new(metadata))
}

/// Version for a context: --api-version, else the URI's version, else v1.0.
fn version_for(context: &str, source: &SourceArgs) -> String {
    source
        .api_version
        .clone()
        .or_else(|| ContextUri::parse(context).ok().and_then(|uri| uri.version))
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
}

fn resolve_one(
    pipeline: &SchemaPipeline<Box<dyn MetadataSource>>,
    context: &str,
    version: String,
    subtype: Option<String>,
    max_depth: usize,
) -> Result<ResolvedSchema, u8> {
    let mut options = ResolveOptions::new(context)
        .version(version)
        .max_depth(max_depth);
    if let Some(subtype) = subtype {
        options = options.subtype(subtype);
    }

    pipeline.resolve(&options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn to_json(schema: &ResolvedSchema, pretty: bool) -> Result<String, u8> {
    if pretty {
        serde_json::to_string_pretty(schema)
    } else {
        serde_json::to_string(schema)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })
}

fn run_resolve(
    context: &str,
    source: &SourceArgs,
    subtype: Option<String>,
    max_depth: usize,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let pipeline = open_pipeline(source)?;
    let version = version_for(context, source);
    let schema = resolve_one(&pipeline, context, version, subtype, max_depth)?;
    let json_output = to_json(&schema, pretty)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_dump(
    contexts: &[String],
    source: &SourceArgs,
    max_depth: usize,
    out_dir: &Path,
) -> Result<(), u8> {
    let pipeline = open_pipeline(source)?;

    for context in contexts {
        let uri = ContextUri::parse(context).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
        let version = version_for(context, source);
        let schema = resolve_one(&pipeline, context, version.clone(), None, max_depth)?;

        let dir = out_dir.join(&version);
        std::fs::create_dir_all(&dir).map_err(|e| {
            eprintln!("Error creating {}: {}", dir.display(), e);
            3u8
        })?;

        let path = dir.join(format!("{}.json", uri.file_stem()));
        std::fs::write(&path, to_json(&schema, true)?).map_err(|e| {
            eprintln!("Error writing to {}: {}", path.display(), e);
            3u8
        })?;
        println!("{}", path.display());
    }

    Ok(())
}

fn run_contexts(source: &SourceArgs, json_output: bool) -> Result<(), u8> {
    let pipeline = open_pipeline(source)?;
    let version = source
        .api_version
        .clone()
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
    let document = pipeline.document(&version).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if json_output {
        let variants: Vec<serde_json::Value> = document
            .variants()
            .iter()
            .map(|v| serde_json::json!({ "pattern": v.pattern, "description": v.description }))
            .collect();
        println!("{}", serde_json::Value::Array(variants));
    } else {
        for variant in document.variants() {
            println!(
                "{}\t{}",
                variant.pattern,
                variant.description.as_deref().unwrap_or("")
            );
        }
    }

    Ok(())
}
