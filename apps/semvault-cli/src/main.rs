//! # semvault
//!
//! Command-line front end for the vault engine: create and switch vaults,
//! index files into a vault, write agent notes, and run semantic queries.
//!
//! ```bash
//! semvault init notes ~/vaults/notes
//! semvault index ~/vaults/notes
//! semvault write decisions/storage.md --content "We keep vectors in lance" --topic storage
//! semvault query "where do vectors live" --where topic=storage
//! ```
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use semvault_core::config::Settings;
use semvault_core::registry::VaultRegistry;
use semvault_core::types::{AgentTags, BulkReport, Meta, MetadataFilter, Vault};
use semvault_core::{Error, ErrorKind};
use semvault_engine::VaultEngine;

#[derive(Parser)]
#[command(name = "semvault")]
#[command(about = "Local multi-vault semantic search")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TagArgs {
    #[arg(long)]
    generated_by: Option<String>,
    #[arg(long)]
    artifact_type: Option<String>,
    #[arg(long)]
    topic: Option<String>,
    /// Extra tag, repeatable
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_pair)]
    tags: Vec<(String, String)>,
}

impl TagArgs {
    fn to_meta(&self) -> Option<Meta> {
        let mut meta: Meta = AgentTags {
            generated_by: self.generated_by.clone(),
            artifact_type: self.artifact_type.clone(),
            topic: self.topic.clone(),
        }
        .into();
        meta.extend(self.tags.iter().cloned());
        (!meta.is_empty()).then_some(meta)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new vault rooted at PATH
    Init { name: String, path: PathBuf },

    /// Make NAME the active vault
    Use { name: String },

    /// List registered vaults
    Vaults,

    /// Print the active vault
    Active,

    /// Index a file or every file under a directory
    Index {
        path: PathBuf,
        #[arg(long)]
        vault: Option<String>,
        #[command(flatten)]
        tags: TagArgs,
    },

    /// Remove a file (or a directory's files) from the index
    Delete {
        path: PathBuf,
        #[arg(long)]
        vault: Option<String>,
    },

    /// Drop and rebuild the index entries of a file or directory
    Reindex {
        path: PathBuf,
        #[arg(long)]
        vault: Option<String>,
        #[command(flatten)]
        tags: TagArgs,
    },

    /// Write a file inside the vault and index it
    Write {
        /// Path relative to the vault root
        path: PathBuf,
        /// File content; read from stdin when omitted
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        vault: Option<String>,
        #[command(flatten)]
        tags: TagArgs,
    },

    /// Semantic search over a vault
    Query {
        text: String,
        #[arg(long)]
        vault: Option<String>,
        /// Maximum results (defaults to query.top_k)
        #[arg(short, long)]
        k: Option<usize>,
        /// Metadata equality filter, repeatable
        #[arg(long = "where", value_name = "KEY=VALUE", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
    },

    /// List indexed documents
    Docs {
        #[arg(long)]
        vault: Option<String>,
    },
}

fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn spinner(msg: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

#[derive(Serialize)]
struct CreatedVault {
    #[serde(flatten)]
    vault: Vault,
    registry: PathBuf,
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn print_report(verb: &str, report: &BulkReport) {
    for path in &report.succeeded {
        println!("{verb} {}", path.display());
    }
    for skipped in &report.skipped {
        println!("skipped {skipped}");
    }
    println!("{} {verb}, {} skipped", report.succeeded.len(), report.skipped.len());
}

fn bulk(
    json: bool,
    verb: &str,
    path: &Path,
    run: impl FnOnce() -> semvault_core::Result<BulkReport>,
) -> Result<()> {
    let pb = spinner(format!("{verb} {}", path.display()))?;
    let report = run();
    pb.finish_and_clear();
    let report = report.with_context(|| format!("{verb} failed for {}", path.display()))?;
    emit(json, &report, |r| print_report(verb, r))
}

fn read_stdin() -> Result<String> {
    use std::io::Read;
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).context("reading content from stdin")?;
    Ok(buf)
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load().context("loading settings")?;
    debug!("registry at {}", settings.registry_path().display());
    let json = cli.json;

    // registry-only commands never load the embedding model
    let registry = VaultRegistry::open(settings.registry_path());
    match &cli.command {
        Commands::Init { name, path } => {
            let (_, registry_file) = registry.create_vault(name, path)?;
            let created = CreatedVault { vault: registry.get_vault_config(name)?, registry: registry_file };
            return emit(json, &created, |c| {
                println!("vault '{}' ready at {}", c.vault.name, c.vault.root_path.display());
                println!("registry: {}", c.registry.display());
            });
        }
        Commands::Use { name } => {
            registry.set_active_vault(name)?;
            let vault = registry.get_active_vault_config()?;
            return emit(json, &vault, |v| println!("active vault: {} ({})", v.name, v.root_path.display()));
        }
        Commands::Vaults => {
            let names = registry.list_vaults()?;
            let active = registry.active_vault_name().ok();
            return emit(json, &names, |names| {
                for n in names {
                    let marker = if active.as_deref() == Some(n.as_str()) { "*" } else { " " };
                    println!("{marker} {n}");
                }
            });
        }
        Commands::Active => {
            let vault = registry.get_active_vault_config()?;
            return emit(json, &vault, |v| println!("{} ({})", v.name, v.root_path.display()));
        }
        _ => {}
    }

    let engine = VaultEngine::from_settings(&settings).context("starting vault engine")?;
    match cli.command {
        Commands::Init { .. } | Commands::Use { .. } | Commands::Vaults | Commands::Active => {}
        Commands::Index { path, vault, tags } => {
            let meta = tags.to_meta();
            bulk(json, "indexed", &path, || engine.index_files(&path, vault.as_deref(), meta.as_ref()))?;
        }
        Commands::Delete { path, vault } => {
            bulk(json, "deleted", &path, || engine.delete_files(&path, vault.as_deref()))?;
        }
        Commands::Reindex { path, vault, tags } => {
            let meta = tags.to_meta();
            bulk(json, "reindexed", &path, || engine.reindex_files(&path, vault.as_deref(), meta.as_ref()))?;
        }
        Commands::Write { path, content, overwrite, vault, tags } => {
            let content = match content {
                Some(c) => c,
                None => read_stdin()?,
            };
            let meta = tags.to_meta();
            let written = engine.write_file(&path, &content, overwrite, vault.as_deref(), meta.as_ref())?;
            emit(json, &serde_json::json!({ "written": written }), |_| println!("wrote {}", written.display()))?;
        }
        Commands::Query { text, vault, k, filters } => {
            let filter = MetadataFilter::from(filters.into_iter().collect::<Meta>());
            let result = engine.query(&text, vault.as_deref(), Some(&filter), k)?;
            if result.results.is_empty() && !json {
                return Err(anyhow!("no results for '{}'", result.query));
            }
            emit(json, &result, |r| {
                for (rank, m) in r.results.iter().enumerate() {
                    println!("{:>2}. [{:.4}] {} #{}", rank + 1, m.score, m.source, m.chunk_index);
                    println!("    {}", m.text);
                }
            })?;
        }
        Commands::Docs { vault } => {
            let docs = engine.list_documents(vault.as_deref())?;
            emit(json, &docs, |docs| {
                for d in docs {
                    println!("{}  {:>4} chunks  {}  {}", d.doc_id, d.chunk_count, d.filetype, d.source);
                }
                println!("{} documents", docs.len());
            })?;
        }
    }
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>().map(Error::kind) {
        Some(ErrorKind::BadRequest) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Conflict) => 4,
        Some(ErrorKind::Internal) | None => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
