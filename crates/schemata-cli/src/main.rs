//! Schemata CLI
//!
//! Command-line entry points for:
//! - Refining an XML mapping description (grouping-node removal)
//! - Printing the diagnostic view of a mapping

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};

use schemata_discovery::{DataDocument, DiscoveryPipeline, DiscoveryStep};
use schemata_mapping::{read_mapping, write_mapping, MappingConfig};

#[derive(Parser)]
#[command(name = "schemata")]
#[command(author, version, about = "Schemata: schema discovery over semi-structured documents")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON file with `namespaceUri` / `tagNamePrefix`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the mapping namespace URI
    #[arg(long, global = true)]
    namespace_uri: Option<String>,

    /// Override the tag-name prefix of the mapping description
    #[arg(long, global = true)]
    prefix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove grouping nodes (attribute-less entities) from a mapping.
    Prune {
        /// Input mapping description (XML)
        input: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Source documents made available to the discovery steps
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,
    },

    /// Print the diagnostic view of a mapping.
    Show {
        /// Input mapping description (XML)
        input: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(global: &GlobalArgs) -> Result<MappingConfig> {
    let mut config = match &global.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            MappingConfig::from_json(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => MappingConfig::default(),
    };
    if let Some(uri) = &global.namespace_uri {
        config.namespace_uri = uri.clone();
    }
    if let Some(prefix) = &global.prefix {
        config.tag_name_prefix = prefix.clone();
    }
    Ok(config)
}

/// Read a mapping description. An explicit `namespace_override` replaces the
/// declared namespace; the configured one only fills a missing declaration.
fn load_mapping(
    path: &Path,
    config: &MappingConfig,
    namespace_override: Option<&str>,
) -> Result<schemata_mapping::Mapping> {
    let xml = fs::read_to_string(path)
        .with_context(|| format!("failed to read mapping {}", path.display()))?;
    let mut mapping = read_mapping(&xml, &config.tag_name_prefix)
        .with_context(|| format!("failed to parse mapping {}", path.display()))?;
    if let Some(uri) = namespace_override {
        debug!(uri, declared = ?mapping.namespace_uri(), "overriding mapping namespace");
        mapping.set_namespace_uri(uri);
    } else if mapping.namespace_uri().is_none() {
        debug!(uri = %config.namespace_uri, "mapping declares no namespace; using configured one");
        mapping.set_namespace_uri(config.namespace_uri.clone());
    }
    Ok(mapping)
}

fn load_documents(paths: &[PathBuf]) -> Result<Vec<DataDocument>> {
    paths
        .iter()
        .map(|path| {
            let body = fs::read_to_string(path)
                .with_context(|| format!("failed to read document {}", path.display()))?;
            Ok(DataDocument::new(path.display().to_string(), body))
        })
        .collect()
}

fn cmd_prune(
    input: &Path,
    out: Option<&PathBuf>,
    docs: &[PathBuf],
    config: &MappingConfig,
    namespace_override: Option<&str>,
) -> Result<()> {
    let mapping = load_mapping(input, config, namespace_override)?;
    let documents = load_documents(docs)?;
    let (entities_before, relations_before) = (mapping.len(), mapping.relations_count());

    let pipeline = DiscoveryPipeline::new().with_step(DiscoveryStep::remove_grouping_nodes());
    let mapping = pipeline.discover(&documents, mapping)?;

    let xml = write_mapping(&mapping)?;
    match out {
        Some(path) => fs::write(path, &xml)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{xml}"),
    }

    eprintln!(
        "pruned {} -> {} entities, {} -> {} relations",
        entities_before,
        mapping.len(),
        relations_before,
        mapping.relations_count()
    );
    Ok(())
}

fn cmd_show(input: &Path, config: &MappingConfig, namespace_override: Option<&str>) -> Result<()> {
    let mapping = load_mapping(input, config, namespace_override)?;
    println!("{mapping}");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    let config = load_config(&cli.global)?;
    let namespace_override = cli.global.namespace_uri.as_deref();

    match cli.command {
        Commands::Prune { input, out, docs } => {
            cmd_prune(&input, out.as_ref(), &docs, &config, namespace_override)
        }
        Commands::Show { input } => cmd_show(&input, &config, namespace_override),
    }
}
