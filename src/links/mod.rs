
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Writer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{RagError, Result};

/// Category assigned to a documentation link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkCategory {
    #[serde(rename = "API")]
    Api,
    #[serde(rename = "text-based")]
    TextBased,
}

impl LinkCategory {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "API",
            Self::TextBased => "text-based",
        }
    }
}

impl fmt::Display for LinkCategory {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a link as an API reference page or a text-based guide.
///
/// A link is `API` when its URL contains `APIReference` or its description
/// contains `API`. Matching is case-sensitive.
#[inline]
pub fn classify(url: &str, description: &str) -> LinkCategory {
    if url.contains("APIReference") || description.contains("API") {
        LinkCategory::Api
    } else {
        LinkCategory::TextBased
    }
}

/// Row of a requeue / fetch list: `LINK,Type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRow {
    #[serde(rename = "LINK")]
    pub link: String,
    #[serde(rename = "Type")]
    pub category: LinkCategory,
}

/// Summary of a classification run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    pub api: usize,
    pub text_based: usize,
}

/// Read a `LINK,DESC` CSV, append (or overwrite) a `Type` column and write
/// the result. All other columns are preserved in their original order.
#[inline]
pub fn classify_links_file(input: &Path, output: &Path) -> Result<ClassifySummary> {
    if !input.exists() {
        return Err(RagError::InputNotFound(input.to_path_buf()));
    }

    let mut reader = ReaderBuilder::new().from_path(input)?;
    let mut headers = reader.headers()?.clone();

    let link_idx = column_index(&headers, "LINK", input)?;
    let desc_idx = column_index(&headers, "DESC", input)?;
    let type_idx = headers.iter().position(|h| h == "Type");
    if type_idx.is_none() {
        headers.push_field("Type");
    }

    // Read everything before the writer truncates `output`, which may be `input`
    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    drop(reader);

    let mut writer = Writer::from_path(output)?;
    writer.write_record(&headers)?;

    let mut summary = ClassifySummary::default();
    for record in records {
        let link = record.get(link_idx).unwrap_or_default();
        let desc = record.get(desc_idx).unwrap_or_default();
        let category = classify(link, desc);
        match category {
            LinkCategory::Api => summary.api += 1,
            LinkCategory::TextBased => summary.text_based += 1,
        }

        let row: StringRecord = match type_idx {
            Some(idx) => record
                .iter()
                .enumerate()
                .map(|(i, field)| if i == idx { category.as_str() } else { field })
                .collect(),
            None => {
                let mut row = record;
                row.push_field(category.as_str());
                row
            }
        };
        writer.write_record(&row)?;
    }
    writer.flush()?;

    info!(
        "Classified {} links ({} API, {} text-based) into {}",
        summary.api + summary.text_based,
        summary.api,
        summary.text_based,
        output.display()
    );
    Ok(summary)
}

/// Read a `LINK,Type` CSV and return the text-based links in file order,
/// without duplicates.
#[inline]
pub fn read_text_links(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(RagError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = ReaderBuilder::new().from_path(path)?;
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for (line, row) in reader.deserialize::<LinkRow>().enumerate() {
        match row {
            Ok(row) if row.category == LinkCategory::TextBased => {
                if seen.insert(row.link.clone()) {
                    links.push(row.link);
                } else {
                    debug!("Skipping duplicate link {}", row.link);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping row {} of {}: {}", line + 2, path.display(), e),
        }
    }

    Ok(links)
}

/// Write `LINK,Type` rows
#[inline]
pub fn write_link_rows(path: &Path, rows: &[LinkRow]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    if rows.is_empty() {
        writer.write_record(["LINK", "Type"])?;
    }
    writer.flush()?;
    Ok(())
}

fn column_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        RagError::Dataset(format!(
            "Missing required column '{}' in {}",
            name,
            path.display()
        ))
    })
}
