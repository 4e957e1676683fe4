
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use csv::ReaderBuilder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{RagError, Result};

/// Link recorded for documents whose key is absent from the mapping
pub const NO_LINK: &str = "No link found";

/// A document ready to be embedded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// `SOURCE LINK: <link> CONTENT: <body>`
    pub text: String,
    pub link: String,
}

impl Document {
    #[inline]
    pub fn new(link: &str, content: &str) -> Self {
        Self {
            text: format!("SOURCE LINK: {} CONTENT: {}", link, content),
            link: link.to_string(),
        }
    }
}

/// Load the key to URL mapping from the first two columns of a CSV, header
/// skipped. A missing file is logged and yields an empty mapping.
#[inline]
pub fn load_link_mapping(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        warn!("File not found: {}, documents will have no links", path.display());
        return Ok(HashMap::new());
    }

    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut mapping = HashMap::new();
    for record in reader.records() {
        let record = record?;
        match (record.get(0), record.get(1)) {
            (Some(key), Some(link)) => {
                mapping.insert(key.to_string(), link.to_string());
            }
            _ => warn!("Skipping short row in {}: {:?}", path.display(), record),
        }
    }

    debug!("Loaded {} link mappings", mapping.len());
    Ok(mapping)
}

/// Mapping key of a document file: the name up to its last `_`
#[inline]
pub fn document_key(file_name: &str) -> &str {
    file_name
        .rsplit_once('_')
        .map_or("", |(prefix, _)| prefix)
}

/// Assemble documents from every `.txt` file under `dir`, in file name order
#[inline]
pub fn collect_documents(dir: &Path, mapping: &HashMap<String, String>) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(RagError::InputNotFound(dir.to_path_buf()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            warn!("Skipping non UTF-8 file name: {:?}", entry.path());
            continue;
        };
        if !file_name.ends_with(".txt") {
            continue;
        }

        let content = match fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))
        {
            Ok(content) => content,
            Err(e) => {
                warn!("{:#}", e);
                continue;
            }
        };

        let link = mapping
            .get(document_key(file_name))
            .map_or(NO_LINK, String::as_str);
        documents.push(Document::new(link, &content));
    }

    info!("Collected {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}
