use anyhow::{Context, Result};
use console::style;

use super::Config;

/// Print the effective configuration to stderr
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    match config.openai.api_url() {
        Ok(url) => eprintln!("  API base: {}", style(url).cyan()),
        Err(e) => eprintln!("  API base: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Embedding model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!("  Chat model: {}", style(&config.openai.chat_model).cyan());
    eprintln!("  QA model: {}", style(&config.openai.qa_model).cyan());
    eprintln!("  Temperature: {}", style(config.openai.temperature).cyan());
    eprintln!(
        "  Timeout: {}",
        style(describe_timeout(config.openai.timeout_seconds)).cyan()
    );
    eprintln!(
        "  Retry attempts: {}",
        style(config.openai.retry_attempts).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Vector Index:").bold().yellow());
    eprintln!("  Name: {}", style(&config.index.name).cyan());
    eprintln!("  Top-k: {}", style(config.index.top_k).cyan());
    eprintln!(
        "  Upsert batch size: {}",
        style(config.index.upsert_batch_size).cyan()
    );
    eprintln!(
        "  Location: {}",
        style(config.vector_database_path().display()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Fetching:").bold().yellow());
    eprintln!("  User agent: {}", style(&config.fetch.user_agent).cyan());
    eprintln!(
        "  Timeout: {}",
        style(describe_timeout(config.fetch.timeout_seconds)).cyan()
    );
    eprintln!(
        "  Content cache: {}",
        style(config.content_cache_path().display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Server: {}",
        style(format!("{}:{}", config.server.host, config.server.port)).cyan()
    );
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Write the given configuration to disk, creating the directory if needed
#[inline]
pub fn init_config(config: &Config) -> Result<()> {
    config.save().context("Failed to save configuration")?;
    eprintln!(
        "{} {}",
        style("Configuration saved to:").green(),
        style(config.config_file_path().display()).cyan()
    );
    Ok(())
}

fn describe_timeout(timeout_seconds: Option<u64>) -> String {
    timeout_seconds.map_or_else(|| "client default".to_string(), |s| format!("{}s", s))
}
