//! Grounded answer generation.
//!
//! Renders the grounding prompt over the retrieved chunks and makes exactly
//! one call to the generation backend. The policy is expressed entirely in
//! the prompt; whether the model obeys it is not checked.

use crate::types::RetrievalResult;
use crate::rag::types::Answer;
use sage_core::{AppConfig, AppError, AppResult};
use sage_llm::{create_client_from_config, LlmClient, LlmRequest};
use sage_prompt::{build_grounding_prompt, ContextBlock, GroundingPolicy};
use std::sync::Arc;

pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    policy: GroundingPolicy,
    max_tokens: u32,
}

impl AnswerSynthesizer {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        policy: GroundingPolicy,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            policy,
            max_tokens,
        }
    }

    /// Synthesizer for the active generation provider of `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let client = create_client_from_config(config)?;
        let policy = GroundingPolicy::new(
            config.generation.domain.clone(),
            config.generation.refusal.clone(),
        );

        Ok(Self::new(
            client,
            config.model.clone(),
            policy,
            config.generation.max_tokens,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn policy(&self) -> &GroundingPolicy {
        &self.policy
    }

    /// Answer `question` from `retrieved`.
    ///
    /// `Answer::sources` lists the source of every retrieved chunk in
    /// retrieval order, duplicates included, regardless of what the model
    /// actually cited.
    pub async fn synthesize(&self, retrieved: &RetrievalResult, question: &str) -> AppResult<Answer> {
        let blocks: Vec<ContextBlock> = retrieved
            .iter()
            .map(|r| ContextBlock::new(r.chunk.source.clone(), r.chunk.text.clone()))
            .collect();

        let prompt = build_grounding_prompt(&self.policy, &blocks, question)?;

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %self.model,
            context_blocks = blocks.len(),
            prompt_len = prompt.user.len(),
            "Generating answer"
        );

        let request = LlmRequest::new(prompt.user, self.model.clone())
            .deterministic()
            .with_max_tokens(self.max_tokens);

        let response = self.client.complete(&request).await.map_err(|e| match e {
            AppError::Backend(msg) => AppError::Backend(format!("Answer generation failed: {}", msg)),
            other => other,
        })?;

        tracing::debug!(
            completion_tokens = response.usage.completion_tokens,
            "Answer generated"
        );

        Ok(Answer {
            text: response.content,
            sources: prompt.metadata.sources,
        })
    }
}
