// In-memory collaborators for unit tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::database::{QueryMatch, VectorIndex, VectorRecord};
use crate::llm::{ChatMessage, ChatModel, Embedder};
use crate::{RagError, Result};

/// Deterministic embedder: a text's vector counts a few marker characters.
/// Texts containing `fail_on` produce an error.
#[derive(Debug, Clone, Default)]
pub struct FakeEmbedder {
    pub fail_on: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeEmbedder {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        if self.fail_on.as_deref().is_some_and(|marker| text.contains(marker)) {
            return Err(RagError::Embedding("embedding service unavailable".to_string()));
        }

        let count = |c: char| text.chars().filter(|&x| x == c).count() as f32;
        Ok(vec![1.0 + count('a'), count('e'), count('o')])
    }
}

/// Chat model returning a fixed reply and recording every conversation
#[derive(Debug, Clone, Default)]
pub struct FakeChat {
    reply: Option<String>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl FakeChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ChatModel for FakeChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());
        self.reply
            .clone()
            .ok_or_else(|| RagError::Completion("model unavailable".to_string()))
    }
}

/// Vector index held in memory, ranking by dot product
#[derive(Debug, Default)]
pub struct MemoryIndex {
    dimension: Mutex<Option<usize>>,
    records: Mutex<BTreeMap<String, VectorRecord>>,
    upserts: Mutex<Vec<Vec<String>>>,
    fail_upsert_calls: Vec<usize>,
}

impl MemoryIndex {
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Mutex::new(Some(dimension)),
            ..Self::default()
        }
    }

    /// Make the given upsert calls (zero-based) fail
    pub fn failing_upsert_calls(mut self, calls: Vec<usize>) -> Self {
        self.fail_upsert_calls = calls;
        self
    }

    pub fn dimension(&self) -> Option<usize> {
        *self.dimension.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ids passed to each upsert call, in call order
    pub fn upsert_calls(&self) -> Vec<Vec<String>> {
        self.upserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn insert(&self, record: VectorRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id.clone(), record);
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn exists(&self) -> Result<bool> {
        Ok(self.dimension().is_some())
    }

    async fn create(&self, dimension: usize) -> Result<()> {
        *self.dimension.lock().unwrap_or_else(PoisonError::into_inner) = Some(dimension);
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let call = {
            let mut upserts = self.upserts.lock().unwrap_or_else(PoisonError::into_inner);
            upserts.push(records.iter().map(|r| r.id.clone()).collect());
            upserts.len() - 1
        };
        if self.fail_upsert_calls.contains(&call) {
            return Err(RagError::Index("upsert rejected".to_string()));
        }

        for record in records {
            self.insert(record.clone());
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut matches: Vec<QueryMatch> = records
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: record.values.iter().zip(vector).map(|(a, b)| a * b).sum(),
                metadata: record.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len())
    }
}
