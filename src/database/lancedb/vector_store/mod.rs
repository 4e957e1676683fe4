#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tracing::{debug, info};

use super::{QueryMatch, VectorIndex, VectorMetadata, VectorRecord};
use crate::{RagError, Result};

/// [`VectorIndex`] stored in a local LanceDB table
pub struct LanceIndex {
    connection: Connection,
    table_name: String,
}

impl LanceIndex {
    /// Open (or create) the database directory at `db_path`. The table itself
    /// is only created by [`VectorIndex::create`].
    #[inline]
    pub async fn connect(db_path: &Path, table_name: impl Into<String>) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            RagError::Index(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            table_name: table_name.into(),
        })
    }

    async fn open_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to open table: {}", e)))
    }

    /// Vector dimension recorded in the table schema
    async fn dimension(&self, table: &Table) -> Result<usize> {
        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Index(format!("Failed to get table schema: {}", e)))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                RagError::Index("Could not find vector column or determine dimension".to_string())
            })
    }

    fn create_record_batch(records: &[VectorRecord], dimension: usize) -> Result<RecordBatch> {
        let len = records.len();
        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * dimension);
        let mut texts = Vec::with_capacity(len);
        let mut links = Vec::with_capacity(len);

        for record in records {
            if record.values.len() != dimension {
                return Err(RagError::Index(format!(
                    "Vector {} has {} dimensions, index expects {}",
                    record.id,
                    record.values.len(),
                    dimension
                )));
            }
            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.values);
            texts.push(record.metadata.text.as_str());
            links.push(record.metadata.link.as_str());
        }

        let list_size = i32::try_from(dimension)
            .map_err(|_| RagError::Index(format!("Dimension {} is too large", dimension)))?;
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            list_size,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| RagError::Index(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(links)),
        ];

        RecordBatch::try_new(create_schema(list_size), arrays)
            .map_err(|e| RagError::Index(format!("Failed to create record batch: {}", e)))
    }
}

/// Schema with the given vector dimension
fn create_schema(dimension: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension,
            ),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("link", DataType::Utf8, false),
    ]))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Index(format!("Invalid {} column type", name)))
}

fn parse_query_batch(batch: &RecordBatch) -> Result<Vec<QueryMatch>> {
    let ids = string_column(batch, "id")?;
    let texts = string_column(batch, "text")?;
    let links = string_column(batch, "link")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let matches = (0..batch.num_rows())
        .map(|row| {
            let distance =
                distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });
            QueryMatch {
                id: ids.value(row).to_string(),
                score: 1.0 - distance,
                metadata: VectorMetadata {
                    text: texts.value(row).to_string(),
                    link: links.value(row).to_string(),
                },
            }
        })
        .collect();
    Ok(matches)
}

#[async_trait]
impl VectorIndex for LanceIndex {
    #[inline]
    async fn exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to list tables: {}", e)))?;
        Ok(table_names.contains(&self.table_name))
    }

    #[inline]
    async fn create(&self, dimension: usize) -> Result<()> {
        let list_size = i32::try_from(dimension)
            .map_err(|_| RagError::Index(format!("Dimension {} is too large", dimension)))?;
        if dimension == 0 {
            return Err(RagError::Index("Dimension must be positive".to_string()));
        }

        self.connection
            .create_empty_table(&self.table_name, create_schema(list_size))
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to create table: {}", e)))?;

        info!(
            "Created index {} with {} dimensions",
            self.table_name, dimension
        );
        Ok(())
    }

    #[inline]
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No vectors to upsert");
            return Ok(());
        }

        let table = self.open_table().await?;
        let dimension = self.dimension(&table).await?;
        let batch = Self::create_record_batch(records, dimension)?;

        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        // Rows sharing an id are replaced in the same commit as the inserts
        let mut merge = table.merge_insert(&["id"]);
        merge.when_matched_update_all(None).when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| RagError::Index(format!("Failed to upsert vectors: {}", e)))?;

        debug!("Upserted {} vectors", records.len());
        Ok(())
    }

    #[inline]
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        debug!("Searching for similar vectors with limit: {}", top_k);

        let table = self.open_table().await?;
        let mut results = table
            .vector_search(vector)
            .map_err(|e| RagError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to execute search: {}", e)))?;

        let mut matches = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Index(format!("Failed to read result stream: {}", e)))?
        {
            matches.extend(parse_query_batch(&batch)?);
        }

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!("Found {} matches", matches.len());
        Ok(matches)
    }

    #[inline]
    async fn count(&self) -> Result<usize> {
        let table = self.open_table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Index(format!("Failed to count rows: {}", e)))
    }
}
