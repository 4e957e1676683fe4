// Batch evaluation of the assistant against a QA dataset


use std::path::Path;

use csv::Writer;
use serde::Serialize;
use tracing::{error, info};

use crate::Result;
use crate::assistant::RetrievalAssistant;
use crate::progress::step_bar;
use crate::qa::{QaRow, read_qa_rows};

/// Output column layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvaluationLayout {
    /// `URL,Question,Answer,llm_answer`
    #[default]
    Full,
    /// `question,answer,llm_answer`
    Scoring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationRow {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
    pub llm_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoringRow {
    pub question: String,
    pub answer: String,
    pub llm_answer: String,
}

impl From<EvaluationRow> for ScoringRow {
    #[inline]
    fn from(row: EvaluationRow) -> Self {
        Self {
            question: row.question,
            answer: row.answer,
            llm_answer: row.llm_answer,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationStats {
    pub answered: usize,
    pub failed: usize,
}

/// Answer each dataset question; failures leave `llm_answer` empty
#[inline]
pub async fn evaluate_rows(
    assistant: &RetrievalAssistant,
    rows: Vec<QaRow>,
) -> (Vec<EvaluationRow>, EvaluationStats) {
    let mut stats = EvaluationStats::default();
    let mut results = Vec::with_capacity(rows.len());
    let bar = step_bar(rows.len(), "Answering");

    for row in rows {
        bar.set_message(row.question.clone());
        let llm_answer = match assistant.answer(&row.question).await {
            Ok(answer) => {
                stats.answered += 1;
                answer
            }
            Err(e) => {
                error!("Failed to answer '{}': {}", row.question, e);
                stats.failed += 1;
                String::new()
            }
        };
        results.push(EvaluationRow {
            url: row.url,
            question: row.question,
            answer: row.answer,
            llm_answer,
        });
        bar.inc(1);
    }

    bar.finish_and_clear();
    (results, stats)
}

/// Evaluate the first `limit` rows of a QA CSV and write the results
#[inline]
pub async fn run_evaluation(
    assistant: &RetrievalAssistant,
    input: &Path,
    output: &Path,
    limit: Option<usize>,
    layout: EvaluationLayout,
) -> Result<EvaluationStats> {
    let mut rows = read_qa_rows(input)?;
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    info!("Evaluating {} questions from {}", rows.len(), input.display());

    let (results, stats) = evaluate_rows(assistant, rows).await;
    write_results(output, results, layout)?;

    info!(
        "Evaluation finished: {} answered, {} failed",
        stats.answered, stats.failed
    );
    Ok(stats)
}

fn write_results(path: &Path, rows: Vec<EvaluationRow>, layout: EvaluationLayout) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    match layout {
        EvaluationLayout::Full => {
            if rows.is_empty() {
                writer.write_record(["URL", "Question", "Answer", "llm_answer"])?;
            }
            for row in rows {
                writer.serialize(row)?;
            }
        }
        EvaluationLayout::Scoring => {
            if rows.is_empty() {
                writer.write_record(["question", "answer", "llm_answer"])?;
            }
            for row in rows {
                writer.serialize(ScoringRow::from(row))?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}
