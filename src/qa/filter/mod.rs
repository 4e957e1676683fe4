
use std::path::Path;

use tracing::info;

use super::{QaRow, read_qa_rows, write_qa_rows};
use crate::Result;
use crate::links::{LinkCategory, LinkRow, write_link_rows};

/// Rows with an empty question or the sentinel answer, projected to
/// `LINK,Type` rows for another fetch pass
#[inline]
pub fn insufficient_rows(rows: &[QaRow]) -> Vec<LinkRow> {
    rows.iter()
        .filter(|row| row.is_insufficient())
        .map(|row| LinkRow {
            link: row.url.clone(),
            category: LinkCategory::TextBased,
        })
        .collect()
}

/// Remove rows whose answer is the sentinel
#[inline]
pub fn drop_sentinel_rows(rows: Vec<QaRow>) -> Vec<QaRow> {
    rows.into_iter().filter(|row| !row.is_sentinel()).collect()
}

/// Write the links of insufficient rows of `input` to `output`
#[inline]
pub fn requeue_insufficient(input: &Path, output: &Path) -> Result<usize> {
    let rows = read_qa_rows(input)?;
    let requeue = insufficient_rows(&rows);
    write_link_rows(output, &requeue)?;

    info!(
        "Requeued {} of {} rows to {}",
        requeue.len(),
        rows.len(),
        output.display()
    );
    Ok(requeue.len())
}

/// Copy `input` to `output` without sentinel rows
#[inline]
pub fn clean_dataset(input: &Path, output: &Path) -> Result<usize> {
    let rows = read_qa_rows(input)?;
    let total = rows.len();
    let kept = drop_sentinel_rows(rows);
    write_qa_rows(output, &kept)?;

    info!(
        "Kept {} of {} rows in {}",
        kept.len(),
        total,
        output.display()
    );
    Ok(kept.len())
}
