//! `strain-graph`: build and export strain relationship graphs.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use strain_graph::config::{Dimensions, ROOT_ENV};
use strain_graph::{export, CanonicalId, Fetcher, GraphStore, Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "strain-graph")]
#[command(about = "Strain relationship graphs from scraped catalog bundles")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bundle root directory (overrides the configuration)
    #[arg(short, long, global = true, env = ROOT_ENV)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the graph payload as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip the coordinate embedding
        #[arg(long)]
        no_embed: bool,

        /// Embedding dimensions (2 or 3)
        #[arg(long)]
        dimensions: Option<u8>,
    },

    /// Write the nearest-relative tree as JSON
    Tree {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run the scraper for one or more missing strains and reload
    Fetch {
        /// Reference ids such as RSP11046
        ids: Vec<String>,

        /// Fetch every incomplete strain that has a reference id
        #[arg(long)]
        missing: bool,

        /// Scraper command; `{rsp}` is replaced by the id, otherwise
        /// `-u <id>` is appended
        #[arg(long, num_args = 1.., default_values = ["python", "kaana_scraper.py"])]
        scraper: Vec<String>,
    },
}

fn main() -> ExitCode {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("strain_graph=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = cli.root {
        config = config.with_root(root);
    }

    match cli.command {
        Commands::Export { out, no_embed, dimensions } => {
            if no_embed {
                config.embedding.enabled = false;
            }
            if let Some(d) = dimensions {
                config.embedding.dimensions = Dimensions::try_from(d).map_err(anyhow::Error::msg)?;
            }
            cmd_export(config, out.as_deref())
        }
        Commands::Tree { out } => cmd_tree(config, out.as_deref()),
        Commands::Fetch { ids, missing, scraper } => cmd_fetch(config, ids, missing, scraper),
    }
}

fn cmd_export(config: PipelineConfig, out: Option<&Path>) -> Result<()> {
    let pipeline = Pipeline::new(config)?;
    let graph = pipeline.run()?;
    let (payload, warnings) = export::export(&graph);
    info!(
        nodes = payload.nodes.len(),
        complete = graph.complete_count(),
        warnings = graph.warnings.len() + warnings.len(),
        "graph built"
    );
    let mut writer = output(out)?;
    export::write_json(&payload, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn cmd_tree(config: PipelineConfig, out: Option<&Path>) -> Result<()> {
    let pipeline = config_without_embedding(config)?;
    let graph = pipeline.run()?;
    let tree = pipeline.phylogeny(&graph);
    info!(nodes = tree.nodes.len(), root = ?tree.root, "tree built");

    let mut writer = output(out)?;
    serde_json::to_writer_pretty(&mut writer, &tree)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn cmd_fetch(config: PipelineConfig, ids: Vec<String>, missing: bool, scraper: Vec<String>) -> Result<()> {
    let fetcher = command_fetcher(scraper)?;
    let store = GraphStore::open(config_without_embedding(config)?, fetcher)?;

    let mut targets = ids;
    if missing {
        let snapshot = store.snapshot();
        targets.extend(snapshot.missing_ids().map(|id| id.to_string()));
    }
    anyhow::ensure!(!targets.is_empty(), "no reference ids to fetch");

    let mut failed = Vec::new();
    for id in &targets {
        if !store.request_fetch(id) {
            failed.push(id.as_str());
        }
    }
    info!(requested = targets.len(), failed = failed.len(), "fetch finished");
    anyhow::ensure!(failed.is_empty(), "could not complete: {}", failed.join(", "));
    Ok(())
}

/// Tree and fetch only read the genetic edges; coordinates would be wasted.
fn config_without_embedding(mut config: PipelineConfig) -> Result<Pipeline> {
    config.embedding.enabled = false;
    Ok(Pipeline::new(config)?)
}

/// Runs the external scraper as a child process and waits for it.
struct CommandFetcher {
    program: String,
    args: Vec<String>,
}

impl Fetcher for CommandFetcher {
    fn fetch(&self, reference_id: &CanonicalId) -> strain_graph::Result<()> {
        let args = scraper_args(&self.args, reference_id);
        info!(program = %self.program, ?args, "running scraper");
        let status = Command::new(&self.program).args(&args).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(strain_graph::Error::Fetch(format!("{} exited with {status}", self.program)))
        }
    }
}

/// Scraper arguments for one id: `{rsp}` placeholders take the lowercase
/// id, and without any placeholder `-u <id>` is appended.
fn scraper_args(template: &[String], reference_id: &CanonicalId) -> Vec<String> {
    let rsp = reference_id.as_str().to_ascii_lowercase();
    let mut args: Vec<String> = template.iter().map(|a| a.replace("{rsp}", &rsp)).collect();
    if !template.iter().any(|a| a.contains("{rsp}")) {
        args.extend(["-u".to_string(), rsp]);
    }
    args
}

fn command_fetcher(mut scraper: Vec<String>) -> Result<CommandFetcher> {
    anyhow::ensure!(!scraper.is_empty(), "--scraper needs a program");
    let program = scraper.remove(0);
    Ok(CommandFetcher { program, args: scraper })
}

fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating {}", p.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}
