//! Answer generation: forward retrieved context plus the question to a
//! chat-style LLM and return its reply.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::AnswerConfig;
use crate::embedding::post_json_with_retry;

#[async_trait]
pub trait Answerer: Send + Sync {
    /// Produce an answer to `question` given the retrieved `context`.
    async fn answer(&self, context: &str, question: &str) -> Result<String>;
}

pub fn create_answerer(config: &AnswerConfig) -> Result<Box<dyn Answerer>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiAnswerer::new(config)?)),
        other => bail!("Unknown answer provider: {}", other),
    }
}

/// Chat-completion client for OpenAI-compatible `/v1/chat/completions`
/// endpoints. Requires `OPENAI_API_KEY`; the endpoint can be overridden
/// via `answer.url` to target any compatible server.
pub struct OpenAiAnswerer {
    model: String,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiAnswerer {
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            url: url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Given the context:\n{}\nAnswer the question:\n{}",
        context, question
    )
}

#[async_trait]
impl Answerer for OpenAiAnswerer {
    async fn answer(&self, context: &str, question: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": build_prompt(context, question) }
            ],
        });

        // Single attempt: a failed answer is reported to the user, who can
        // simply re-ask.
        let json = post_json_with_retry(
            &self.client,
            &format!("{}/chat/completions", self.url),
            Some(&self.api_key),
            &body,
            0,
        )
        .await?;

        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid chat response: missing message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_context_then_question() {
        let prompt = build_prompt("page one text", "what is on page one?");
        let context_pos = prompt.find("page one text").unwrap();
        let question_pos = prompt.find("what is on page one?").unwrap();
        assert!(context_pos < question_pos);
    }
}
