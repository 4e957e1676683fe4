// Indexer module
// Turns a folder of document chunks into embeddings and upserts them into
// the vector index, keeping a dump file so an upload can be resumed

pub mod documents;
pub mod dump;


use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::database::{VectorIndex, VectorMetadata, VectorRecord};
use crate::llm::Embedder;
use crate::progress::step_bar;
use crate::Result;

pub use documents::{Document, NO_LINK, collect_documents, document_key, load_link_mapping};
pub use dump::{DumpedVector, read_dump, write_dump};

/// Text embedded once to learn the embedding dimension
const PROBE_TEXT: &str = "Test text";

/// Outcome of an upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Batches attempted
    pub batches: usize,
    /// Vectors accepted by the index
    pub uploaded: usize,
    /// Candidates skipped for missing fields
    pub skipped: usize,
    /// Batches whose upsert failed
    pub failed_batches: usize,
}

/// Embeds documents and upserts them into a [`VectorIndex`]
pub struct EmbeddingIndexer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl EmbeddingIndexer {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, batch_size: usize) -> Self {
        Self {
            embedder,
            index,
            batch_size: batch_size.max(1),
        }
    }

    /// Create the index if it is absent, sized by a probe embedding
    #[inline]
    pub async fn ensure_index(&self) -> Result<()> {
        if self.index.exists().await? {
            debug!("Vector index already exists");
            return Ok(());
        }

        let embedder = Arc::clone(&self.embedder);
        let probe = tokio::task::spawn_blocking(move || embedder.embed(PROBE_TEXT))
            .await
            .context("Probe embedding task failed")??;

        info!("Creating vector index with dimension {}", probe.len());
        self.index.create(probe.len()).await
    }

    /// Embed every document. Ids are the document positions; a document
    /// whose embedding fails is logged and left out.
    #[inline]
    pub async fn embed_documents(&self, documents: Vec<Document>) -> Result<Vec<VectorRecord>> {
        let embedder = Arc::clone(&self.embedder);
        let records = tokio::task::spawn_blocking(move || embed_all(embedder.as_ref(), documents))
            .await
            .context("Embedding task failed")?;
        Ok(records)
    }

    /// Upsert candidates in fixed-size batches. Invalid candidates are
    /// skipped; a failed batch is logged and the next one proceeds.
    #[inline]
    pub async fn upload(&self, candidates: Vec<DumpedVector>) -> UploadReport {
        let mut report = UploadReport::default();
        if candidates.is_empty() {
            error!("No documents provided for embedding upload.");
            return report;
        }

        for batch in candidates.chunks(self.batch_size) {
            report.batches += 1;

            let mut vectors = Vec::with_capacity(batch.len());
            for candidate in batch {
                match candidate.clone().into_record() {
                    Some(record) => vectors.push(record),
                    None => {
                        warn!("Document is not in the correct format: {:?}", candidate.id);
                        report.skipped += 1;
                    }
                }
            }

            if vectors.is_empty() {
                error!("No valid vectors in batch for upload.");
                continue;
            }

            match self.index.upsert(&vectors).await {
                Ok(()) => {
                    info!("Batch of {} vectors uploaded.", vectors.len());
                    report.uploaded += vectors.len();
                }
                Err(e) => {
                    error!("Error during batch upsert: {}", e);
                    report.failed_batches += 1;
                }
            }
        }

        report
    }

    /// Index the documents under `docs_dir`, resuming from `dump_path` when
    /// it holds vectors from an earlier run
    #[inline]
    pub async fn run(
        &self,
        docs_dir: &Path,
        mapping_path: &Path,
        dump_path: &Path,
    ) -> Result<UploadReport> {
        self.ensure_index().await?;

        let saved = read_dump(dump_path)?;
        if !saved.is_empty() {
            info!("Uploading {} pre-saved embeddings.", saved.len());
            return Ok(self.upload(saved).await);
        }

        info!("No pre-saved vectors found. Generating new embeddings.");
        let mapping = load_link_mapping(mapping_path)?;
        let documents = collect_documents(docs_dir, &mapping)?;
        let records = self.embed_documents(documents).await?;
        write_dump(dump_path, &records)?;

        Ok(self
            .upload(records.into_iter().map(DumpedVector::from).collect())
            .await)
    }
}

fn embed_all(embedder: &dyn Embedder, documents: Vec<Document>) -> Vec<VectorRecord> {
    let bar = step_bar(documents.len(), "Embedding");
    let mut records = Vec::with_capacity(documents.len());

    for (i, document) in documents.into_iter().enumerate() {
        match embedder.embed(&document.text) {
            Ok(values) => records.push(VectorRecord {
                id: i.to_string(),
                values,
                metadata: VectorMetadata {
                    text: document.text,
                    link: document.link,
                },
            }),
            Err(e) => error!("Skipping document {} ({}): {}", i, document.link, e),
        }
        bar.inc(1);
    }

    bar.finish_and_clear();
    records
}
