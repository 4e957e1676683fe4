// LanceDB vector database module
// Handles vector storage and similarity search for document embeddings

#[cfg(test)]
mod tests;

pub mod vector_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A document embedding with the metadata returned on retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Sequence index of the document in the assembled list
    pub id: String,
    /// The embedding; its length is the index dimension
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Full document text, including the `SOURCE LINK:` prefix
    pub text: String,
    /// Source URL, or `No link found`
    pub link: String,
}

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    /// Cosine similarity, higher is closer
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// Vector storage keyed by record id
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether the index has been created
    async fn exists(&self) -> Result<bool>;

    /// Create the index for vectors of `dimension` components
    async fn create(&self, dimension: usize) -> Result<()>;

    /// Insert records, replacing any with the same id
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Return the `top_k` nearest records to `vector`, best first
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;
}
