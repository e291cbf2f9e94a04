//! Analysis engine for resume/posting comparison.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core

pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt};
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Maximum length of any text returned by the engine, in characters.
pub const MAX_ANSWER_CHARS: usize = 8000;

const MAX_TOKENS: u64 = 2048;

/// Black-box analysis calls. Potentially slow, potentially failing; never retried.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Produce a comparison report for a resume against a job posting.
    async fn compare_resume_to_job(
        &self,
        resume_text: &str,
        job_text: &str,
    ) -> Result<String, LlmError>;

    /// Answer a free-text question. `job_text` may be empty.
    async fn answer_question(
        &self,
        resume_text: &str,
        job_text: &str,
        question_text: &str,
    ) -> Result<String, LlmError>;
}

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

/// Configuration for creating an analysis engine.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// `AnalysisEngine` over any rig completion model.
pub struct LlmAnalysisEngine<M: CompletionModel> {
    compare_agent: rig::agent::Agent<M>,
    question_agent: rig::agent::Agent<M>,
    provider: &'static str,
    model_name: String,
}

impl<M: CompletionModel + 'static> LlmAnalysisEngine<M> {
    pub fn new<C>(client: &C, model: &str, provider: &'static str) -> Self
    where
        C: CompletionClient<CompletionModel = M>,
    {
        let compare_agent = client
            .agent(model)
            .preamble(prompts::COMPARE_PREAMBLE)
            .max_tokens(MAX_TOKENS)
            .build();
        let question_agent = client
            .agent(model)
            .preamble(prompts::QUESTION_PREAMBLE)
            .max_tokens(MAX_TOKENS)
            .build();
        Self {
            compare_agent,
            question_agent,
            provider,
            model_name: model.to_string(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn run(&self, agent: &rig::agent::Agent<M>, prompt: String) -> Result<String, LlmError> {
        let started = std::time::Instant::now();
        let reply = agent
            .prompt(prompt)
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            provider = self.provider,
            model = %self.model_name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis call completed"
        );

        let reply = cap_length(reply.trim(), MAX_ANSWER_CHARS);
        if reply.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: self.provider.to_string(),
            });
        }
        Ok(reply)
    }
}

#[async_trait]
impl<M: CompletionModel + 'static> AnalysisEngine for LlmAnalysisEngine<M> {
    async fn compare_resume_to_job(
        &self,
        resume_text: &str,
        job_text: &str,
    ) -> Result<String, LlmError> {
        self.run(&self.compare_agent, prompts::compare_prompt(resume_text, job_text))
            .await
    }

    async fn answer_question(
        &self,
        resume_text: &str,
        job_text: &str,
        question_text: &str,
    ) -> Result<String, LlmError> {
        self.run(
            &self.question_agent,
            prompts::question_prompt(resume_text, job_text, question_text),
        )
        .await
    }
}

/// Create an analysis engine from configuration.
pub fn create_engine(config: &LlmConfig) -> Result<Arc<dyn AnalysisEngine>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic_engine(config),
        LlmBackend::OpenAi => create_openai_engine(config),
    }
}

fn create_anthropic_engine(config: &LlmConfig) -> Result<Arc<dyn AnalysisEngine>, LlmError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            }
        })?;

    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(LlmAnalysisEngine::new(
        &client,
        &config.model,
        "anthropic",
    )))
}

fn create_openai_engine(config: &LlmConfig) -> Result<Arc<dyn AnalysisEngine>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(LlmAnalysisEngine::new(&client, &config.model, "openai")))
}

/// Truncate `text` to at most `max_chars` characters.
pub fn cap_length(text: &str, max_chars: usize) -> String {
    const ELLIPSIS: &str = "...";
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let cut = text
        .char_indices()
        .nth(keep)
        .map(|(byte_offset, _)| byte_offset)
        .unwrap_or(text.len());
    format!("{}{ELLIPSIS}", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_engine_with_any_key() {
        // rig-core clients accept any string as API key at construction time.
        let config = LlmConfig {
            backend: LlmBackend::Anthropic,
            api_key: secrecy::SecretString::from("test-key"),
            model: "claude-3-5-sonnet-latest".to_string(),
        };
        assert!(create_engine(&config).is_ok());
    }

    #[tokio::test]
    async fn test_create_openai_engine() {
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o".to_string(),
        };
        assert!(create_engine(&config).is_ok());
    }

    #[test]
    fn cap_length_keeps_short_text() {
        assert_eq!(cap_length("short", 10), "short");
    }

    #[test]
    fn cap_length_cuts_on_char_boundary() {
        let text = "привет мир";
        assert_eq!(cap_length(text, 9), "привет...");
    }

    #[test]
    fn cap_length_never_exceeds_limit() {
        let text = "x".repeat(MAX_ANSWER_CHARS + 50);
        let capped = cap_length(&text, MAX_ANSWER_CHARS);
        assert_eq!(capped.chars().count(), MAX_ANSWER_CHARS);
        assert!(capped.ends_with("..."));

        let exact = "y".repeat(MAX_ANSWER_CHARS);
        assert_eq!(cap_length(&exact, MAX_ANSWER_CHARS), exact);
    }
}
