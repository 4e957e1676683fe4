
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;
use crate::database::{VectorMetadata, VectorRecord};

/// A vector as read back from a dump file. Fields are optional so that a
/// partially written or hand-edited entry can be reported and skipped
/// instead of rejecting the whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DumpedVector {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Option<VectorMetadata>,
}

impl DumpedVector {
    /// The complete record, if every field is present and non-empty
    #[inline]
    pub fn into_record(self) -> Option<VectorRecord> {
        match (self.id, self.values, self.metadata) {
            (Some(id), Some(values), Some(metadata)) if !id.is_empty() && !values.is_empty() => {
                Some(VectorRecord {
                    id,
                    values,
                    metadata,
                })
            }
            _ => None,
        }
    }
}

impl From<VectorRecord> for DumpedVector {
    #[inline]
    fn from(record: VectorRecord) -> Self {
        Self {
            id: Some(record.id),
            values: Some(record.values),
            metadata: Some(record.metadata),
        }
    }
}

/// Read a dump file; a missing file reads as empty
#[inline]
pub fn read_dump(path: &Path) -> Result<Vec<DumpedVector>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read vector dump: {}", path.display()))?;
    let vectors: Vec<DumpedVector> = serde_json::from_str(&content)?;
    info!("Vectors loaded from {}", path.display());
    Ok(vectors)
}

/// Write vectors as a JSON array
#[inline]
pub fn write_dump(path: &Path, records: &[VectorRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let content = serde_json::to_string(records)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write vector dump: {}", path.display()))?;
    info!("Vectors saved to {}", path.display());
    Ok(())
}
