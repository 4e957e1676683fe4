#[cfg(test)]
mod tests;

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, error, info};

use super::SENTINEL;
use crate::crawler::{FetchOutcome, PageFetcher};
use crate::llm::{ChatMessage, ChatModel};
use crate::Result;

const SYSTEM_MESSAGE: &str = "Do EXACTLY as the instructions in the prompt say.";

/// Build the QA instruction for one page
#[inline]
pub fn build_qa_prompt(content: &str) -> String {
    format!(
        "Based on ONLY the contents below, please generate as many HIGH-QUALITY question answer pairs as there is information for. \
I want ONLY one of two responses below. Please make the question ONE SENTENCE and the answer ONE PARAGRAPH. \
I want you to focus on the MAIN IDEA of the articles for the questions.\n\n\
FIRST CASE: If you determine that there IS enough information to produce a HIGH-QUALITY question answer pair, \
please return the answer in EXACTLY the format here:\n\n\
QUESTION: ...\n\n\
ANSWER: ...\n\n\
SECOND CASE: If you determine that there IS NOT enough information to produce a HIGH-QUALITY question answer pair, \
please return '{SENTINEL}'\n\n\
Here is the content of the webpage: {content}\n"
    )
}

/// Format one transcript block
#[inline]
pub fn transcript_block(url: &str, response: &str) -> String {
    format!("URL: {}\nQ&A:\n{}\n\n", url, response)
}

/// Counters for a generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Model responses appended to the transcript
    pub generated: usize,
    /// Pages whose fetch failed; a sentinel block was appended instead
    pub unfetched: usize,
    /// Pages whose completion call failed; nothing was written
    pub failed: usize,
}

/// Prompts a chat model for QA pairs and appends the responses to a
/// transcript
pub struct QaGenerator {
    chat: Box<dyn ChatModel>,
}

impl QaGenerator {
    #[inline]
    pub fn new(chat: Box<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Ask the model for QA pairs. API failures are logged and yield `None`.
    #[inline]
    pub fn generate(&self, content: &str) -> Option<String> {
        let messages = [
            ChatMessage::system(SYSTEM_MESSAGE),
            ChatMessage::user(build_qa_prompt(content)),
        ];
        match self.chat.complete(&messages) {
            Ok(response) => Some(response),
            Err(e) => {
                error!("Error in getting response: {}", e);
                None
            }
        }
    }

    /// Fetch every link, generate QA pairs for each page and append them to
    /// the transcript at `transcript_path`
    #[inline]
    pub fn run(
        &self,
        fetcher: &mut PageFetcher,
        links: &[String],
        limit: Option<usize>,
        transcript_path: &Path,
    ) -> Result<GenerationStats> {
        let mut transcript = open_for_append(transcript_path)?;
        let mut stats = GenerationStats::default();
        let mut write_error: Option<io::Error> = None;

        fetcher.fetch_all(links, limit, |url, outcome| {
            let block = match outcome {
                FetchOutcome::Fetched(content) => match self.generate(content) {
                    Some(response) => {
                        stats.generated += 1;
                        transcript_block(url, &response)
                    }
                    None => {
                        stats.failed += 1;
                        return ControlFlow::Continue(());
                    }
                },
                FetchOutcome::Failed(failure) => {
                    debug!("Recording {} as insufficient: {}", url, failure);
                    stats.unfetched += 1;
                    transcript_block(url, SENTINEL)
                }
            };

            match transcript.write_all(block.as_bytes()) {
                Ok(()) => ControlFlow::Continue(()),
                Err(e) => {
                    error!("Failed to append to {}: {}", transcript_path.display(), e);
                    write_error = Some(e);
                    ControlFlow::Break(())
                }
            }
        });

        fetcher.save_cache()?;
        if let Some(e) = write_error {
            return Err(e.into());
        }
        transcript.flush()?;

        info!(
            "Generated {} responses ({} unfetched, {} failed), output saved to {}",
            stats.generated,
            stats.unfetched,
            stats.failed,
            transcript_path.display()
        );
        Ok(stats)
    }
}

fn open_for_append(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open transcript: {}", path.display()))?;
    Ok(file)
}
