// QA dataset construction
// Generation appends model output to a transcript, the transcript is
// unpacked into rows, and the filters requeue or drop low-quality rows

pub mod filter;
pub mod generator;
pub mod transcript;


use std::path::Path;

use csv::{ReaderBuilder, Writer};
use serde::{Deserialize, Serialize};

use crate::{RagError, Result};

pub use filter::{clean_dataset, drop_sentinel_rows, insufficient_rows, requeue_insufficient};
pub use generator::{QaGenerator, build_qa_prompt};
pub use transcript::{parse_transcript, unpack_transcript};

/// Answer emitted when a page holds too little information for a QA pair
pub const SENTINEL: &str = "NOT ENOUGH INFORMATION";

/// One row of a QA dataset: `URL,Question,Answer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRow {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Question", default)]
    pub question: String,
    #[serde(rename = "Answer", default)]
    pub answer: String,
}

impl QaRow {
    #[inline]
    pub fn new(
        url: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Row recorded for a page without enough information
    #[inline]
    pub fn sentinel(url: impl Into<String>) -> Self {
        Self::new(url, "", SENTINEL)
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.answer == SENTINEL
    }

    /// Rows with no question or with the sentinel answer
    #[inline]
    pub fn is_insufficient(&self) -> bool {
        self.question.is_empty() || self.is_sentinel()
    }
}

/// Read a `URL,Question,Answer` CSV
#[inline]
pub fn read_qa_rows(path: &Path) -> Result<Vec<QaRow>> {
    if !path.exists() {
        return Err(RagError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = ReaderBuilder::new().from_path(path)?;
    let rows = reader
        .deserialize::<QaRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Write a `URL,Question,Answer` CSV, including the header when empty
#[inline]
pub fn write_qa_rows(path: &Path, rows: &[QaRow]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(["URL", "Question", "Answer"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
