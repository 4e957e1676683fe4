use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docs_rag::Result;
use docs_rag::commands::{ask, classify, clean, configure, embed, evaluate, generate, requeue, serve, unpack};
use docs_rag::config::{Config, get_config_dir};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Builds QA datasets from documentation pages and answers questions over them")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and derived data
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// OpenAI API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration
    Config {
        /// Write the configuration file with current values
        #[arg(long)]
        init: bool,
    },
    /// Tag each link of a LINK,DESC CSV as API or text-based
    Classify { input: PathBuf, output: PathBuf },
    /// Fetch text-based links and append generated QA pairs to a transcript
    Generate {
        links: PathBuf,
        transcript: PathBuf,
        /// Content cache file, defaults to the one in the config directory
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Process at most this many distinct links
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Turn a transcript into a URL,Question,Answer CSV
    Unpack { transcript: PathBuf, output: PathBuf },
    /// Write the links of insufficient QA rows for another generation pass
    Requeue { input: PathBuf, output: PathBuf },
    /// Drop sentinel rows from a QA CSV
    Clean { input: PathBuf, output: PathBuf },
    /// Embed documents and upload them to the vector index
    Embed {
        /// CSV mapping document names to source links
        links: PathBuf,
        docs_dir: PathBuf,
        /// Vector dump used to resume uploads
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Answer a single question
    Ask { question: String },
    /// Serve the chat page and query endpoint
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer every question of a QA CSV with the assistant
    Evaluate {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
        /// Write question,answer,llm_answer instead of the full row
        #[arg(long)]
        scoring: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| docs_rag::RagError::Config(e.to_string()))?,
    };
    let config = Config::load(&config_dir)?;
    let api_key = cli.api_key.as_deref();

    match cli.command {
        Commands::Config { init } => configure(&config, init)?,
        Commands::Classify { input, output } => classify(&input, &output)?,
        Commands::Generate {
            links,
            transcript,
            cache,
            limit,
        } => generate(&config, api_key, &links, &transcript, cache, limit)?,
        Commands::Unpack { transcript, output } => unpack(&config, &transcript, &output)?,
        Commands::Requeue { input, output } => requeue(&input, &output)?,
        Commands::Clean { input, output } => clean(&input, &output)?,
        Commands::Embed {
            links,
            docs_dir,
            dump,
        } => embed(&config, api_key, &links, &docs_dir, dump).await?,
        Commands::Ask { question } => ask(&config, api_key, &question).await?,
        Commands::Serve { host, port } => serve(&config, api_key, host, port).await?,
        Commands::Evaluate {
            input,
            output,
            limit,
            scoring,
        } => evaluate(&config, api_key, &input, &output, limit, scoring).await?,
    }

    Ok(())
}
