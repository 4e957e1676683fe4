
use std::sync::Arc;

use anyhow::Context;
use itertools::Itertools;
use tracing::debug;

use crate::database::VectorIndex;
use crate::llm::{ChatMessage, ChatModel, Embedder};
use crate::{RagError, Result};

/// Prompt used when no template is configured
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end. \
Pay attention to the tone of the question and use it to determine the technical familiarity of the user with the product, \
and then adjust your answer accordingly. If you do not know the answer, advise the user to seek help via the product's support channels. \
ONLY OUTPUT A ONE PARAGRAPH ANSWER.\n\n\
{context}\n\n\
Question: {question}\n\
Answer tailored to the technical familiarity of the user:";

/// A prompt with `{context}` and `{question}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    #[inline]
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in ["{context}", "{question}"] {
            if !template.contains(placeholder) {
                return Err(RagError::Config(format!(
                    "Prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self(template))
    }

    /// Substitute the placeholders. Only placeholders in the template itself
    /// are replaced, never text that arrives through the substitutions.
    #[inline]
    pub fn render(&self, context: &str, question: &str) -> String {
        self.0
            .split("{context}")
            .map(|segment| segment.replace("{question}", question))
            .join(context)
    }
}

impl Default for PromptTemplate {
    #[inline]
    fn default() -> Self {
        Self(DEFAULT_PROMPT_TEMPLATE.to_string())
    }
}

/// Answers questions from the documents nearest to them in the index
#[derive(Clone)]
pub struct RetrievalAssistant {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatModel>,
    template: PromptTemplate,
    top_k: usize,
}

impl RetrievalAssistant {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatModel>,
        template: PromptTemplate,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            template,
            top_k,
        }
    }

    /// Retrieve the top-k documents for `question` and join their texts
    #[inline]
    pub async fn context_for(&self, question: &str) -> Result<String> {
        let embedder = Arc::clone(&self.embedder);
        let query = question.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&query))
            .await
            .context("Embedding task failed")??;

        let matches = self.index.query(&vector, self.top_k).await?;
        debug!(
            "Retrieved {} matches: {:?}",
            matches.len(),
            matches.iter().map(|m| m.id.as_str()).collect::<Vec<_>>()
        );

        Ok(matches.iter().map(|m| m.metadata.text.as_str()).join(" "))
    }

    /// Answer a question; the completion is returned verbatim
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<String> {
        let context = self.context_for(question).await?;
        let prompt = self.template.render(&context, question);

        let chat = Arc::clone(&self.chat);
        tokio::task::spawn_blocking(move || chat.complete(&[ChatMessage::user(prompt)]))
            .await
            .context("Completion task failed")?
    }
}
