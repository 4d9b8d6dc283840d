//! Command-line interface for avro-cdc-tap
//!
//! # Usage Examples
//!
//! ## Consume
//! ```bash
//! # Print the `after` image of the next 5 change events
//! avro-cdc-tap consume --topic raw-CUSTOMER --from-beginning
//!
//! # Whole Debezium envelopes from every raw-* topic, Confluent framing only
//! avro-cdc-tap consume --topic '^raw-.*' --print envelope \
//!   --header-candidates 5 --max-messages 100
//! ```
//!
//! ## Registry
//! ```bash
//! avro-cdc-tap registry list --group pg1
//! avro-cdc-tap registry export --group pg1 --out data-lakehouse/avro
//! avro-cdc-tap registry import --group pg1 --in data-lakehouse/avro
//! ```
//!
//! Envelopes go to stdout, one JSON object per line; logs go to stderr
//! (`RUST_LOG=debug` shows the header length chosen for each message).
//!
//! ## Exit codes
//! - `0` success
//! - `1` any other failure
//! - `2` registry unreachable, schema missing or unparseable, import folder missing
//! - `3` import finished but some schemas failed to publish

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kafka_avro_source::JsonLinesSink;
use schema_registry::{RegistryApi, RegistryClient, SchemaResolver};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "avro-cdc-tap")]
#[command(about = "Consume Debezium topics with Apicurio-registered Avro values as JSON lines")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume a topic and print decoded, normalized envelopes
    Consume(kafka_avro_source::Config),

    /// Inspect and mirror registry groups
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },
}

#[derive(Subcommand)]
enum RegistryCommand {
    /// List artifact ids in a group
    List {
        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Write a group's schemas to versioned .avsc files
    Export {
        #[command(flatten)]
        registry: RegistryArgs,

        /// Output root; files land under <out>/<group>/
        #[arg(long, env = "AVRO_DIR", default_value = "data-lakehouse/avro")]
        out: PathBuf,

        /// Also export *-key artifacts
        #[arg(long)]
        include_keys: bool,
    },

    /// Publish .avsc files under <in>/<group>/ to the registry
    Import {
        #[command(flatten)]
        registry: RegistryArgs,

        /// Input root
        #[arg(long = "in", env = "AVRO_DIR", default_value = "data-lakehouse/avro")]
        input: PathBuf,
    },
}

#[derive(Args)]
struct RegistryArgs {
    /// Apicurio registry v2 base URL
    #[arg(
        long,
        env = "APICURIO_URL",
        default_value = "http://localhost:8081/apis/registry/v2"
    )]
    registry: String,

    /// Apicurio group id
    #[arg(long, env = "APICURIO_GROUP", default_value = "pg1")]
    group: String,
}

impl RegistryArgs {
    fn client(&self) -> anyhow::Result<RegistryClient> {
        RegistryClient::new(&self.registry)
            .with_context(|| format!("Invalid registry URL {}", self.registry))
    }
}

/// Some schemas could not be published.
#[derive(Debug)]
struct ImportIncomplete {
    failed: usize,
}

impl fmt::Display for ImportIncomplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema file(s) failed to import", self.failed)
    }
}

impl std::error::Error for ImportIncomplete {}

fn exit_code(error: &anyhow::Error) -> i32 {
    if error.chain().any(|cause| cause.is::<ImportIncomplete>()) {
        3
    } else if error.chain().any(|cause| cause.is::<schema_registry::Error>()) {
        2
    } else {
        1
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code(&e));
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // stdout is reserved for envelopes
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Consume(config) => run_consume(config).await,
        Commands::Registry { command } => run_registry(command).await,
    }
}

async fn run_consume(config: kafka_avro_source::Config) -> anyhow::Result<()> {
    let client = RegistryClient::new(&config.registry_url)
        .with_context(|| format!("Invalid registry URL {}", config.registry_url))?;
    let resolver = Arc::new(SchemaResolver::new(Arc::new(client)));

    if let Some(coordinate) = config.startup_coordinate() {
        resolver
            .resolve(&coordinate)
            .await
            .with_context(|| format!("Failed to fetch schema for {coordinate}"))?;
    }

    let mut sink = JsonLinesSink::stdout();
    let stats = kafka_avro_source::consume(&config, resolver, &mut sink)
        .await
        .with_context(|| format!("Failed to consume {}", config.topic))?;
    info!(
        "Processed {} message(s) from {} ({} undecodable)",
        stats.processed, config.topic, stats.decode_failures
    );
    Ok(())
}

async fn run_registry(command: RegistryCommand) -> anyhow::Result<()> {
    match command {
        RegistryCommand::List { registry } => {
            let client = registry.client()?;
            let artifacts = client
                .list_artifacts(&registry.group)
                .await
                .with_context(|| format!("Failed to list artifacts in group '{}'", registry.group))?;
            for artifact in artifacts.iter().filter(|a| !a.id.is_empty()) {
                println!("{}", artifact.id);
            }
            Ok(())
        }
        RegistryCommand::Export {
            registry,
            out,
            include_keys,
        } => {
            let client = registry.client()?;
            let summary =
                schema_registry::export_group(&client, &registry.group, &out, include_keys)
                    .await
                    .with_context(|| {
                        format!("Failed to export group '{}'", registry.group)
                    })?;
            println!(
                "Exported {} schema file(s) into {}/{}/",
                summary.written.len(),
                out.display(),
                registry.group
            );
            Ok(())
        }
        RegistryCommand::Import { registry, input } => {
            let client = registry.client()?;
            let summary = schema_registry::import_group(&client, &registry.group, &input)
                .await
                .with_context(|| format!("Failed to import group '{}'", registry.group))?;
            for failure in &summary.failures {
                println!("FAIL {}: {}", failure.artifact_id, failure.reason);
            }
            println!(
                "Imported {} schema file(s) into group '{}' ({} failed)",
                summary.ok,
                registry.group,
                summary.failed()
            );
            if summary.failed() > 0 {
                return Err(ImportIncomplete {
                    failed: summary.failed(),
                }
                .into());
            }
            Ok(())
        }
    }
}
