//! graphpath CLI - Command-line interface
//!
//! Usage:
//!   graphpath --schema schema.toml --fixture graph.json resolve Person/42/Company
//!   graphpath resolve persons --param sort=name --param pageSize=5
//!   graphpath signature /Person/<uuid>/Company
//!   graphpath schema --type Person
//!
//! Schema and fixture default to `GRAPHPATH_SCHEMA` and `GRAPHPATH_FIXTURE`.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use graphpath_core::{AppConfig, Schema};
use graphpath_graph::{load_fixture, Fixture, MemoryGraphStore};
use graphpath_resource::{execute, resolve, resource_signature, Outcome, RequestContext, Verb};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "graphpath")]
#[command(about = "Resolve REST resource chains against a graph")]
#[command(version)]
struct Cli {
    /// Schema TOML file
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// JSON graph fixture
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a path and apply a verb to it
    Resolve {
        /// Resource chain, e.g. Person/42/Company
        path: String,
        /// HTTP verb
        #[arg(long, default_value = "GET")]
        verb: String,
        /// Query parameter as key=value, repeatable
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
    /// Print the access-control signature of a path
    Signature {
        path: String,
    },
    /// Describe the schema or one type
    Schema {
        /// Type name
        #[arg(long = "type")]
        entity_type: Option<String>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let env = AppConfig::from_env()?;
    let schema_path = cli.schema.or(env.storage.schema_path);
    let fixture_path = cli.fixture.or(env.storage.fixture_path);

    let output = match cli.command {
        Commands::Signature { path } => json!(resource_signature(&path)),
        Commands::Schema { entity_type } => {
            let schema = load_schema(schema_path)?;
            describe(&schema, entity_type.as_deref())?
        }
        Commands::Resolve {
            path,
            verb,
            params,
            body,
        } => {
            let verb = Verb::parse(&verb).ok_or_else(|| anyhow!("Unknown verb '{verb}'"))?;
            let body = match body {
                Some(raw) => serde_json::from_str(&raw).context("Invalid --body JSON")?,
                None => Value::Null,
            };
            let schema = Arc::new(load_schema(schema_path)?);
            let store = Arc::new(MemoryGraphStore::new(schema.clone()));
            if let Some(path) = fixture_path {
                load_fixture(&store, Fixture::from_file(&path)?).await?;
            }
            let ctx = RequestContext::new(store, schema, env.engine).with_params(params);
            run(&ctx, &path, verb, &body).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_schema(path: Option<PathBuf>) -> anyhow::Result<Schema> {
    let path = path.ok_or_else(|| anyhow!("No schema given, use --schema or GRAPHPATH_SCHEMA"))?;
    Schema::from_file(&path).with_context(|| format!("Loading schema {}", path.display()))
}

fn describe(schema: &Schema, entity_type: Option<&str>) -> anyhow::Result<Value> {
    match entity_type {
        Some(name) => schema
            .describe_type(name)
            .ok_or_else(|| anyhow!("Unknown type '{name}'")),
        None => Ok(Value::Array(
            schema
                .types
                .iter()
                .filter_map(|ty| schema.describe_type(&ty.name))
                .collect(),
        )),
    }
}

async fn run(ctx: &RequestContext, path: &str, verb: Verb, body: &Value) -> anyhow::Result<Value> {
    let resource = resolve(path, ctx)?;
    tracing::debug!(kind = %resource.kind(), signature = %resource.signature(), "Resolved");

    Ok(match execute(&resource, verb, ctx, body).await? {
        Outcome::Result(result) => result.to_json(),
        Outcome::Head(head) => json!({
            "resultCount": head.result_count,
            "isCollection": head.is_collection,
        }),
        Outcome::Options(verbs) => {
            json!({ "allow": verbs.iter().map(Verb::as_str).collect::<Vec<_>>() })
        }
    })
}
