// Database module
// Vector storage for document embeddings, backed by LanceDB

pub mod lancedb;

pub use self::lancedb::{QueryMatch, VectorIndex, VectorMetadata, VectorRecord};
pub use self::lancedb::vector_store::LanceIndex;
