//! Listings CLI
//!
//! Scrape RE/MAX and ERA into CSV files, and build or query the
//! description vector index.

use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use listings::{
    error::Result,
    models::{Config, EmbeddingBackend},
    pipeline,
    services::{FileCredentials, create_embedder},
    storage::{ListingSink, LocalStorage, output_file_name},
    utils::http,
};

/// Portuguese real-estate listing scrapers
#[derive(Parser, Debug)]
#[command(
    name = "listings",
    version,
    about = "RE/MAX and ERA listing scrapers with a description vector index"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape one RE/MAX city
    Remax {
        #[arg(long)]
        city: String,

        /// Cap on listings read (default: remax.max_results)
        #[arg(long)]
        max_results: Option<u32>,
    },

    /// Scrape every configured RE/MAX city into one file
    RemaxAll,

    /// Scrape the ERA polygon search
    Era {
        /// Credential bundle (default: era.credentials_path)
        #[arg(long)]
        credentials: Option<PathBuf>,
    },

    /// Run RE/MAX (all cities) then ERA
    Pipeline,

    /// Build the description vector index from a gathered CSV
    Vectors {
        #[arg(long)]
        data: PathBuf,

        #[arg(long, default_value = "vector_db")]
        output_dir: PathBuf,

        /// openai or bert_multilingual (default: embedding.backend)
        #[arg(long)]
        backend: Option<EmbeddingBackend>,

        /// Description column (default: embedding.description_column)
        #[arg(long)]
        column: Option<String>,
    },

    /// Query the description vector index
    Search {
        #[arg(long, default_value = "vector_db")]
        index_dir: PathBuf,

        #[arg(long)]
        text: String,

        #[arg(short, long, default_value_t = 5)]
        k: usize,

        #[arg(long)]
        backend: Option<EmbeddingBackend>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_if_exists(&cli.config)?;
    config.validate()?;
    log::info!("Loaded configuration from {}", cli.config.display());

    let client = http::create_client(&config.http)?;
    let output = LocalStorage::new(&config.output.dir);
    let today = Local::now().date_naive();

    match cli.command {
        Command::Remax { city, max_results } => {
            let max_results = max_results.unwrap_or(config.remax.max_results);
            let table = pipeline::run_remax(&config, &client, &city, max_results).await?;
            output
                .write_table(&output_file_name("remax", &city, today), &table)
                .await?;
        }

        Command::RemaxAll => {
            let table = pipeline::run_remax_all(&config, &client).await?;
            output
                .write_table(&output_file_name("remax", "all", today), &table)
                .await?;
        }

        Command::Era { credentials } => {
            let path = credentials.unwrap_or_else(|| config.era.credentials_path.clone());
            let table = pipeline::run_era(&config, &client, &FileCredentials::new(path)).await?;
            output
                .write_table(&output_file_name("era", "shape", today), &table)
                .await?;
        }

        Command::Pipeline => {
            let credentials = FileCredentials::new(&config.era.credentials_path);
            pipeline::run_pipeline(&config, &client, &credentials, &output, today).await?;
        }

        Command::Vectors {
            data,
            output_dir,
            backend,
            column,
        } => {
            let backend = backend.unwrap_or(config.embedding.backend);
            let client = http::create_embedding_client(&config.http, &config.embedding)?;
            let embedder = create_embedder(&config.embedding, backend, client)?;
            let column = column.unwrap_or_else(|| config.embedding.description_column.clone());
            let summary = pipeline::run_vectors(
                &config.embedding,
                embedder.as_ref(),
                &data,
                &column,
                &LocalStorage::new(output_dir),
            )
            .await?;
            log::info!(
                "Indexed {} of {} rows ({} dimensions)",
                summary.indexed,
                summary.rows,
                summary.dimension
            );
        }

        Command::Search {
            index_dir,
            text,
            k,
            backend,
        } => {
            let backend = backend.unwrap_or(config.embedding.backend);
            let client = http::create_embedding_client(&config.http, &config.embedding)?;
            let embedder = create_embedder(&config.embedding, backend, client)?;
            let hits = pipeline::search_index(
                &LocalStorage::new(index_dir),
                embedder.as_ref(),
                &text,
                k,
            )
            .await?;
            for (meta, score) in hits {
                println!("{score:.4}\trow {}\t{}", meta.id, meta.description);
            }
        }

        Command::Validate => {
            log::info!("✓ Config OK");
        }
    }

    log::info!("Done!");

    Ok(())
}
