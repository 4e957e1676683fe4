use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use tracing::info;

use crate::assistant::{PromptTemplate, RetrievalAssistant};
use crate::config::{Config, init_config, show_config};
use crate::crawler::cache::ContentCache;
use crate::crawler::{HttpClient, PageFetcher};
use crate::database::{LanceIndex, VectorIndex};
use crate::evaluate::{EvaluationLayout, run_evaluation};
use crate::indexer::EmbeddingIndexer;
use crate::links::{classify_links_file, read_text_links};
use crate::llm::{ChatModel, Embedder, OpenAiChat, OpenAiClient, OpenAiEmbedder};
use crate::qa::{QaGenerator, clean_dataset, requeue_insufficient, unpack_transcript, write_qa_rows};
use crate::{RagError, Result};

/// Show the effective configuration, or write it to disk with `init`
#[inline]
pub fn configure(config: &Config, init: bool) -> Result<()> {
    if init {
        init_config(config)?;
    } else {
        show_config(config)?;
    }
    Ok(())
}

#[inline]
pub fn classify(input: &Path, output: &Path) -> Result<()> {
    let summary = classify_links_file(input, output)?;
    println!(
        "Classified {} links ({} API, {} text-based) into {}",
        summary.api + summary.text_based,
        summary.api,
        summary.text_based,
        output.display()
    );
    Ok(())
}

/// Fetch the text-based links of a classified CSV and append generated QA
/// pairs to a transcript
#[inline]
pub fn generate(
    config: &Config,
    api_key: Option<&str>,
    links_path: &Path,
    transcript: &Path,
    cache_path: Option<PathBuf>,
    limit: Option<usize>,
) -> Result<()> {
    let links = read_text_links(links_path)?;
    info!("Loaded {} text-based links from {}", links.len(), links_path.display());

    let cache = ContentCache::load(cache_path.unwrap_or_else(|| config.content_cache_path()))?;
    let mut fetcher = PageFetcher::new(HttpClient::new(&config.fetch), cache);

    let generator = QaGenerator::new(Box::new(qa_chat(config, api_key)?));

    let stats = generator.run(&mut fetcher, &links, limit, transcript)?;
    println!(
        "{} {} responses ({} unfetched, {} failed)",
        style("Generated").green(),
        stats.generated,
        stats.unfetched,
        stats.failed
    );
    Ok(())
}

#[inline]
pub fn unpack(config: &Config, transcript: &Path, output: &Path) -> Result<()> {
    let rows = unpack_transcript(transcript, config.dataset.transcript_encoding)?;
    write_qa_rows(output, &rows)?;
    println!("Unpacked {} QA rows into {}", rows.len(), output.display());
    Ok(())
}

#[inline]
pub fn requeue(input: &Path, output: &Path) -> Result<()> {
    let count = requeue_insufficient(input, output)?;
    println!("Requeued {} links into {}", count, output.display());
    Ok(())
}

#[inline]
pub fn clean(input: &Path, output: &Path) -> Result<()> {
    let count = clean_dataset(input, output)?;
    println!("Kept {} QA rows in {}", count, output.display());
    Ok(())
}

/// Embed the text files under `docs_dir` and upload them to the vector index
#[inline]
pub async fn embed(
    config: &Config,
    api_key: Option<&str>,
    mapping: &Path,
    docs_dir: &Path,
    dump_path: Option<PathBuf>,
) -> Result<()> {
    let embedder = embedder(config, api_key)?;
    let index = open_index(config).await?;
    let indexer = EmbeddingIndexer::new(embedder, index, config.index.upsert_batch_size);

    let dump_path = dump_path.unwrap_or_else(|| config.vector_dump_path());
    let report = indexer.run(docs_dir, mapping, &dump_path).await?;

    println!(
        "Uploaded {} vectors in {} batches ({} skipped, {} failed batches)",
        report.uploaded, report.batches, report.skipped, report.failed_batches
    );
    Ok(())
}

#[inline]
pub async fn ask(config: &Config, api_key: Option<&str>, question: &str) -> Result<()> {
    let assistant = build_assistant(config, api_key).await?;
    let answer = assistant.answer(question).await?;
    println!("{}", answer);
    Ok(())
}

#[inline]
pub async fn serve(
    config: &Config,
    api_key: Option<&str>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let assistant = build_assistant(config, api_key).await?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    crate::server::serve(Arc::new(assistant), &host, port).await
}

#[inline]
pub async fn evaluate(
    config: &Config,
    api_key: Option<&str>,
    input: &Path,
    output: &Path,
    limit: Option<usize>,
    scoring: bool,
) -> Result<()> {
    let assistant = build_assistant(config, api_key).await?;
    let layout = if scoring {
        EvaluationLayout::Scoring
    } else {
        EvaluationLayout::Full
    };

    let stats = run_evaluation(&assistant, input, output, limit, layout).await?;
    println!(
        "Answered {} questions ({} failed), results saved to {}",
        stats.answered,
        stats.failed,
        output.display()
    );
    Ok(())
}

/// Assistant wired to the configured models and the on-disk index
#[inline]
pub async fn build_assistant(config: &Config, api_key: Option<&str>) -> Result<RetrievalAssistant> {
    let template = PromptTemplate::new(config.assistant.prompt_template.as_str())?;
    let embedder = embedder(config, api_key)?;
    let chat: Arc<dyn ChatModel> = Arc::new(
        OpenAiChat::new(openai_client(config, api_key)?, &config.openai.chat_model)
            .with_temperature(config.openai.temperature),
    );

    let index = open_index(config).await?;
    if !index.exists().await? {
        return Err(RagError::Index(format!(
            "Vector index '{}' not found; run `docs-rag embed` first",
            config.index.name
        )));
    }

    Ok(RetrievalAssistant::new(
        embedder,
        index,
        chat,
        template,
        config.index.top_k,
    ))
}

fn openai_client(config: &Config, api_key: Option<&str>) -> Result<OpenAiClient> {
    let key = api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            RagError::Config(
                "OpenAI API key missing; pass --api-key or set OPENAI_API_KEY".to_string(),
            )
        })?;
    OpenAiClient::new(&config.openai, key)
}

/// QA model client; no temperature is sent, so the API default applies
fn qa_chat(config: &Config, api_key: Option<&str>) -> Result<OpenAiChat> {
    Ok(OpenAiChat::new(
        openai_client(config, api_key)?,
        &config.openai.qa_model,
    ))
}

fn embedder(config: &Config, api_key: Option<&str>) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(OpenAiEmbedder::new(
        openai_client(config, api_key)?,
        &config.openai.embedding_model,
    )))
}

async fn open_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    let index = LanceIndex::connect(&config.vector_database_path(), &config.index.name).await?;
    Ok(Arc::new(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = Config::default();
        assert!(matches!(
            openai_client(&config, None),
            Err(RagError::Config(_))
        ));
        assert!(matches!(
            openai_client(&config, Some("  ")),
            Err(RagError::Config(_))
        ));
        assert!(openai_client(&config, Some("sk-test")).is_ok());
    }

    #[test]
    fn generate_requires_key_before_fetching() {
        let dir = TempDir::new().expect("should create temp dir");
        let links = dir.path().join("links.csv");
        std::fs::write(&links, "LINK,Type\nhttps://example.com,text-based\n")
            .expect("should write links");
        let config = Config {
            base_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let result = generate(
            &config,
            None,
            &links,
            &dir.path().join("transcript.txt"),
            None,
            None,
        );
        assert!(matches!(result, Err(RagError::Config(_))));
        assert!(!dir.path().join("transcript.txt").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn qa_chat_leaves_temperature_unset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "QUESTION: Q?\nANSWER: A." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.openai.api_base = format!("{}/v1", server.uri());
        config.openai.temperature = 0.7;
        let chat = qa_chat(&config, Some("sk-test")).expect("should build chat");
        tokio::task::spawn_blocking(move || chat.complete(&[ChatMessage::user("hi")]))
            .await
            .expect("completion task should finish")
            .expect("completion should succeed");

        let requests = server.received_requests().await.unwrap_or_default();
        let body: serde_json::Value =
            serde_json::from_slice(&requests[0].body).expect("body should be json");
        assert_eq!(body["model"], "gpt-4-1106-preview");
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn assistant_requires_existing_index() {
        let dir = TempDir::new().expect("should create temp dir");
        let config = Config {
            base_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let result = build_assistant(&config, Some("sk-test")).await;
        assert!(matches!(result, Err(RagError::Index(_))));
    }
}
