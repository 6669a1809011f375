//! Answer synthesis
//!
//! Builds a single system prompt from a template, the retrieved documents
//! and the user query, then asks the hosted language model for an answer.

pub mod llm;
pub mod prompt;

pub use llm::{CompletionClient, OpenAiClient};
pub use prompt::{DEFAULT_TEMPLATE, PromptTemplates};

use std::sync::Arc;
use thiserror::Error;

use crate::vector_store::QueryResult;

/// Returned when the model answers with no choices
pub const NO_RESPONSE: &str = "No response from the model.";

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Prompt template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Invalid prompt template name '{0}'")]
    InvalidTemplateName(String),

    #[error("Failed to read prompt template: {0}")]
    Io(#[from] std::io::Error),

    #[error("Completion failed: {0}")]
    Completion(String),
}

/// Turns retrieved documents into a natural-language answer
pub struct AnswerSynthesizer {
    templates: PromptTemplates,
    client: Arc<dyn CompletionClient>,
}

impl AnswerSynthesizer {
    pub fn new(templates: PromptTemplates, client: Arc<dyn CompletionClient>) -> Self {
        Self { templates, client }
    }

    pub fn templates(&self) -> &PromptTemplates {
        &self.templates
    }

    /// Render `template_name` with the results and query, then complete it
    pub async fn synthesize(
        &self,
        query: &str,
        results: &QueryResult,
        template_name: &str,
    ) -> Result<String, SynthesisError> {
        let template = self.templates.load(template_name).await?;
        let context = prompt::format_context(results);
        let system_prompt = prompt::render(&template, &context, query);

        tracing::debug!(
            template = %template_name,
            hits = results.len(),
            prompt_len = system_prompt.len(),
            "Synthesizing answer"
        );

        match self.client.complete(&system_prompt).await? {
            Some(answer) => Ok(answer.trim().to_string()),
            None => {
                tracing::warn!("Language model returned no choices");
                Ok(NO_RESPONSE.to_string())
            }
        }
    }
}
