//! `docqa`: build, inspect and query a document question-answering index.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use docqa_core::config::{Config, Settings};
use docqa_core::TextLoader;
use docqa_embed::get_default_embedder;
use docqa_llm::OllamaGenerator;
use docqa_pipeline::RagPipeline;

#[derive(Parser)]
#[command(name = "docqa", version, about = "Answer questions from a local document corpus")]
struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from the documents directory
    Build,
    /// Answer a single question
    Query {
        question: String,
        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Answer every non-empty line of a file
    Batch {
        file: PathBuf,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Print index statistics
    Stats,
    /// Copy a document into the corpus and rebuild
    Add { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;
    let settings = config.settings()?;

    match cli.command {
        Commands::Build => {
            let mut pipeline = assemble_pipeline(&settings)?;
            let built = pipeline.rebuild()?;
            print_json(&pipeline.get_statistics())?;
            if !built {
                eprintln!("Nothing was indexed from {}", settings.data.documents_dir);
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Query { question, top_k } => {
            let mut pipeline = open_pipeline(&settings)?;
            let outcome = pipeline.query(&question, top_k.unwrap_or(settings.retrieval.default_top_k));
            print_json(&outcome)?;
        }
        Commands::Batch { file, top_k } => {
            let questions = read_questions(&file)?;
            info!("Answering {} questions from {}", questions.len(), file.display());
            let mut pipeline = open_pipeline(&settings)?;
            let outcomes = pipeline.batch_query(questions.as_slice(), top_k.unwrap_or(settings.retrieval.default_top_k));
            print_json(&outcomes)?;
        }
        Commands::Stats => {
            let pipeline = open_pipeline(&settings)?;
            print_json(&pipeline.get_statistics())?;
        }
        Commands::Add { file } => {
            let content = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                bail!("cannot derive a document name from {}", file.display());
            };
            TextLoader::new(&settings.data.documents_dir).save_document(name, &content)?;
            let mut pipeline = assemble_pipeline(&settings)?;
            pipeline.rebuild()?;
            print_json(&pipeline.get_statistics())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Pipeline with its index loaded from disk, or built once if none is saved.
fn open_pipeline(settings: &Settings) -> Result<RagPipeline> {
    let loader = TextLoader::new(&settings.data.documents_dir);
    let embedder = get_default_embedder(&settings.embedding)?;
    let generator = OllamaGenerator::new(&settings.llm)?;
    Ok(RagPipeline::new(settings, Box::new(loader), embedder, Box::new(generator)))
}

/// Pipeline with an empty index, for commands that rebuild right away.
fn assemble_pipeline(settings: &Settings) -> Result<RagPipeline> {
    let loader = TextLoader::new(&settings.data.documents_dir);
    let embedder = get_default_embedder(&settings.embedding)?;
    let generator = OllamaGenerator::new(&settings.llm)?;
    Ok(RagPipeline::with_empty_index(settings, Box::new(loader), embedder, Box::new(generator)))
}

fn read_questions(file: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
